//! Trust tiers and the per-container trust table.

use std::collections::BTreeMap;
use std::fmt;

use crate::player::PlayerId;

/// Ordered permission tier. Every level implies the ones below it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TrustLevel {
    #[default]
    None,
    Access,
    Container,
    Build,
    Management,
}

impl TrustLevel {
    pub const ALL: [TrustLevel; 5] = [
        TrustLevel::None,
        TrustLevel::Access,
        TrustLevel::Container,
        TrustLevel::Build,
        TrustLevel::Management,
    ];

    /// Stable numeric id, used on disk.
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|level| level.to_string().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrustLevel::None => "none",
            TrustLevel::Access => "access",
            TrustLevel::Container => "container",
            TrustLevel::Build => "build",
            TrustLevel::Management => "management",
        };
        write!(f, "{name}")
    }
}

/// Public trust plus explicit grants to individual players.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrustTable {
    pub public: TrustLevel,
    pub players: BTreeMap<PlayerId, TrustLevel>,
}

impl TrustTable {
    /// The effective level of `player`: the best of the public level and their own grant.
    pub fn level_of(&self, player: &PlayerId) -> TrustLevel {
        let granted = self
            .players
            .get(player)
            .copied()
            .unwrap_or(TrustLevel::None);
        granted.max(self.public)
    }

    /// Players explicitly granted at least `level`.
    pub fn trusted_at_least(&self, level: TrustLevel) -> impl Iterator<Item = &PlayerId> {
        self.players
            .iter()
            .filter(move |(_, granted)| **granted >= level)
            .map(|(player, _)| player)
    }

    pub fn is_empty(&self) -> bool {
        self.public == TrustLevel::None && self.players.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_levels_are_ordered() {
        assert!(TrustLevel::None < TrustLevel::Access);
        assert!(TrustLevel::Access < TrustLevel::Container);
        assert!(TrustLevel::Container < TrustLevel::Build);
        assert!(TrustLevel::Build < TrustLevel::Management);
    }

    #[test]
    fn test_level_of_takes_public_floor() {
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let mut table = TrustTable {
            public: TrustLevel::Access,
            ..Default::default()
        };
        table.players.insert(alice, TrustLevel::Build);

        assert_eq!(table.level_of(&alice), TrustLevel::Build);
        assert_eq!(table.level_of(&bob), TrustLevel::Access);
    }

    #[test]
    fn test_parse_and_id() {
        assert_eq!(TrustLevel::parse("BUILD"), Some(TrustLevel::Build));
        assert_eq!(TrustLevel::parse("owner"), None);
        for level in TrustLevel::ALL {
            assert_eq!(TrustLevel::from_id(level.id()), Some(level));
        }
        assert_eq!(TrustLevel::from_id(9), None);
    }
}
