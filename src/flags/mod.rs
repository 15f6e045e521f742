//! Typed policy flags and the container that holds them.
//!
//! A [`FlagContainer`] is the base of every region and of each world's global settings: an
//! owner, a set of co-owners and the flags that were explicitly set. Flags that were never set
//! are not stored, so an empty container means "behave like the default everywhere".

pub mod trust;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use thiserror::Error;

use crate::geometry::Point;
use crate::player::{Actor, PlayerId};

pub use trust::{TrustLevel, TrustTable};

/// The kind of value a flag holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlagKind {
    Boolean,
    Trust,
    Text,
    Command,
    Filter,
    Location,
}

impl fmt::Display for FlagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlagKind::Boolean => "boolean",
            FlagKind::Trust => "trust table",
            FlagKind::Text => "text",
            FlagKind::Command => "command",
            FlagKind::Filter => "filter",
            FlagKind::Location => "location",
        };
        write!(f, "{name}")
    }
}

/// Every flag the server knows about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Flag {
    Trust,
    AllowOverlap,
    Build,
    Interact,
    Pvp,
    MobSpawning,
    Explosions,
    FireSpread,
    Greeting,
    Farewell,
    EntryCommand,
    BlockedCommands,
    Teleport,
}

impl Flag {
    pub const ALL: [Flag; 13] = [
        Flag::Trust,
        Flag::AllowOverlap,
        Flag::Build,
        Flag::Interact,
        Flag::Pvp,
        Flag::MobSpawning,
        Flag::Explosions,
        Flag::FireSpread,
        Flag::Greeting,
        Flag::Farewell,
        Flag::EntryCommand,
        Flag::BlockedCommands,
        Flag::Teleport,
    ];

    /// Stable name, used by commands and on disk.
    pub fn name(self) -> &'static str {
        match self {
            Flag::Trust => "trust",
            Flag::AllowOverlap => "allow-overlap",
            Flag::Build => "build",
            Flag::Interact => "interact",
            Flag::Pvp => "pvp",
            Flag::MobSpawning => "mob-spawning",
            Flag::Explosions => "explosions",
            Flag::FireSpread => "fire-spread",
            Flag::Greeting => "greeting",
            Flag::Farewell => "farewell",
            Flag::EntryCommand => "entry-command",
            Flag::BlockedCommands => "blocked-commands",
            Flag::Teleport => "teleport",
        }
    }

    pub fn from_name(name: &str) -> Option<Flag> {
        Self::ALL.into_iter().find(|flag| flag.name() == name)
    }

    pub fn kind(self) -> FlagKind {
        match self {
            Flag::Trust => FlagKind::Trust,
            Flag::AllowOverlap
            | Flag::Build
            | Flag::Interact
            | Flag::Pvp
            | Flag::MobSpawning
            | Flag::Explosions
            | Flag::FireSpread => FlagKind::Boolean,
            Flag::Greeting | Flag::Farewell => FlagKind::Text,
            Flag::EntryCommand => FlagKind::Command,
            Flag::BlockedCommands => FlagKind::Filter,
            Flag::Teleport => FlagKind::Location,
        }
    }

    /// The value in effect when nobody set the flag.
    pub fn default_value(self) -> FlagValue {
        match self.kind() {
            FlagKind::Boolean => FlagValue::Boolean(true),
            FlagKind::Trust => FlagValue::Trust(TrustTable::default()),
            FlagKind::Text => FlagValue::Text(String::new()),
            FlagKind::Command => FlagValue::Command(String::new()),
            FlagKind::Filter => FlagValue::Filter(BTreeSet::new()),
            FlagKind::Location => FlagValue::Location(None),
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A position in a named world.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub world: String,
    pub point: Point,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlagValue {
    Boolean(bool),
    Trust(TrustTable),
    Text(String),
    Command(String),
    Filter(BTreeSet<String>),
    Location(Option<Location>),
}

impl FlagValue {
    pub fn kind(&self) -> FlagKind {
        match self {
            FlagValue::Boolean(_) => FlagKind::Boolean,
            FlagValue::Trust(_) => FlagKind::Trust,
            FlagValue::Text(_) => FlagKind::Text,
            FlagValue::Command(_) => FlagKind::Command,
            FlagValue::Filter(_) => FlagKind::Filter,
            FlagValue::Location(_) => FlagKind::Location,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlagError {
    #[error("The flag '{flag}' takes a {expected} value, not a {found} value")]
    WrongKind {
        flag: Flag,
        expected: FlagKind,
        found: FlagKind,
    },
}

/// Who owns a container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Owner {
    /// Administrator-owned, exempt from the claim-block economy.
    #[default]
    Admin,
    Player(PlayerId),
}

impl Owner {
    pub fn player(&self) -> Option<PlayerId> {
        match self {
            Owner::Admin => None,
            Owner::Player(id) => Some(*id),
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::Admin => write!(f, "admin"),
            Owner::Player(id) => write!(f, "{id}"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlagContainer {
    owner: Owner,
    co_owners: BTreeSet<PlayerId>,
    flags: BTreeMap<Flag, FlagValue>,
}

impl FlagContainer {
    pub fn new(owner: Owner) -> Self {
        Self {
            owner,
            ..Default::default()
        }
    }

    pub fn owner(&self) -> Owner {
        self.owner
    }

    pub fn set_owner(&mut self, owner: Owner) {
        if let Owner::Player(id) = owner {
            self.co_owners.remove(&id);
        }
        self.owner = owner;
    }

    pub fn is_admin(&self) -> bool {
        self.owner == Owner::Admin
    }

    pub fn co_owners(&self) -> &BTreeSet<PlayerId> {
        &self.co_owners
    }

    pub fn is_co_owner(&self, player: &PlayerId) -> bool {
        self.co_owners.contains(player)
    }

    /// Returns false if the player was already a co-owner or is the owner.
    pub fn add_co_owner(&mut self, player: PlayerId) -> bool {
        if self.owner == Owner::Player(player) {
            return false;
        }
        self.co_owners.insert(player)
    }

    pub fn remove_co_owner(&mut self, player: &PlayerId) -> bool {
        self.co_owners.remove(player)
    }

    /// Effective ownership: the owner, a co-owner, an operator on an admin container, or
    /// anyone currently ignoring claims.
    pub fn is_owner(&self, actor: &Actor) -> bool {
        if actor.ignoring_claims {
            return true;
        }
        match self.owner {
            Owner::Admin => actor.operator,
            Owner::Player(id) => id == actor.id || self.co_owners.contains(&actor.id),
        }
    }

    /// Whether no flag is explicitly set.
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn get(&self, flag: Flag) -> Option<&FlagValue> {
        self.flags.get(&flag)
    }

    pub fn is_set(&self, flag: Flag) -> bool {
        self.flags.contains_key(&flag)
    }

    /// The explicit value, or the flag's default.
    pub fn resolve(&self, flag: Flag) -> FlagValue {
        self.flags
            .get(&flag)
            .cloned()
            .unwrap_or_else(|| flag.default_value())
    }

    /// Resolves a boolean flag. Non-boolean flags read as false.
    pub fn is_allowed(&self, flag: Flag) -> bool {
        matches!(self.resolve(flag), FlagValue::Boolean(true))
    }

    pub fn set(&mut self, flag: Flag, value: FlagValue) -> Result<(), FlagError> {
        if value.kind() != flag.kind() {
            return Err(FlagError::WrongKind {
                flag,
                expected: flag.kind(),
                found: value.kind(),
            });
        }
        self.flags.insert(flag, value);
        Ok(())
    }

    pub fn clear(&mut self, flag: Flag) -> Option<FlagValue> {
        self.flags.remove(&flag)
    }

    /// Explicitly set flags, in key order.
    pub fn iter(&self) -> impl Iterator<Item = (Flag, &FlagValue)> {
        self.flags.iter().map(|(flag, value)| (*flag, value))
    }

    /// Replaces every flag with the ones of `other`. Ownership is untouched.
    pub fn copy_flags_from(&mut self, other: &FlagContainer) {
        self.flags = other.flags.clone();
    }

    /// Copies every flag of `other` that is not set here.
    pub fn inherit(&mut self, other: &FlagContainer) {
        for (flag, value) in &other.flags {
            self.flags.entry(*flag).or_insert_with(|| value.clone());
        }
    }

    pub fn trust_table(&self) -> TrustTable {
        match self.flags.get(&Flag::Trust) {
            Some(FlagValue::Trust(table)) => table.clone(),
            _ => TrustTable::default(),
        }
    }

    fn update_trust<R>(&mut self, apply: impl FnOnce(&mut TrustTable) -> R) -> R {
        let mut table = self.trust_table();
        let result = apply(&mut table);
        self.flags.insert(Flag::Trust, FlagValue::Trust(table));
        result
    }

    /// Owners get [`TrustLevel::Management`]; everybody else gets what the trust table grants.
    pub fn trust_level(&self, actor: &Actor) -> TrustLevel {
        if self.is_owner(actor) {
            return TrustLevel::Management;
        }
        self.trust_table().level_of(&actor.id)
    }

    pub fn has_trust(&self, actor: &Actor, level: TrustLevel) -> bool {
        self.trust_level(actor) >= level
    }

    pub fn trust(&mut self, player: PlayerId, level: TrustLevel) {
        self.update_trust(|table| {
            if level == TrustLevel::None {
                table.players.remove(&player);
            } else {
                table.players.insert(player, level);
            }
        });
    }

    pub fn untrust(&mut self, player: &PlayerId) -> bool {
        self.update_trust(|table| table.players.remove(player).is_some())
    }

    pub fn trust_public(&mut self, level: TrustLevel) {
        self.update_trust(|table| table.public = level);
    }

    /// Drops every grant, leaving an explicit no-trust table.
    pub fn reset_trust(&mut self) {
        self.flags
            .insert(Flag::Trust, FlagValue::Trust(TrustTable::default()));
    }

    /// Adds an entry to a filter flag. Returns false if it was already present.
    pub fn filter_add(&mut self, flag: Flag, entry: &str) -> Result<bool, FlagError> {
        self.with_filter(flag, |filter| filter.insert(entry.to_lowercase()))
    }

    pub fn filter_remove(&mut self, flag: Flag, entry: &str) -> Result<bool, FlagError> {
        self.with_filter(flag, |filter| filter.remove(&entry.to_lowercase()))
    }

    fn with_filter<F>(&mut self, flag: Flag, apply: F) -> Result<bool, FlagError>
    where
        F: FnOnce(&mut BTreeSet<String>) -> bool,
    {
        if flag.kind() != FlagKind::Filter {
            return Err(FlagError::WrongKind {
                flag,
                expected: flag.kind(),
                found: FlagKind::Filter,
            });
        }
        let value = self.flags.entry(flag).or_insert_with(|| flag.default_value());
        match value {
            FlagValue::Filter(filter) => Ok(apply(filter)),
            other => Err(FlagError::WrongKind {
                flag,
                expected: FlagKind::Filter,
                found: other.kind(),
            }),
        }
    }

    /// Players that keep a claim alive: owner, co-owners and anyone trusted with containers or
    /// more.
    pub fn active_members(&self) -> BTreeSet<PlayerId> {
        let mut members: BTreeSet<PlayerId> = self.co_owners.clone();
        if let Some(owner) = self.owner.player() {
            members.insert(owner);
        }
        members.extend(
            self.trust_table()
                .trusted_at_least(TrustLevel::Container)
                .copied(),
        );
        members
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn player() -> Actor {
        Actor::player(Uuid::new_v4())
    }

    #[test]
    fn test_defaults_are_not_stored() {
        let container = FlagContainer::new(Owner::Admin);
        assert!(container.is_empty());
        assert_eq!(container.resolve(Flag::Pvp), FlagValue::Boolean(true));
        assert!(container.is_empty());
    }

    #[test]
    fn test_set_rejects_wrong_kind() {
        let mut container = FlagContainer::default();
        let err = container
            .set(Flag::Pvp, FlagValue::Text("no".into()))
            .unwrap_err();
        assert_eq!(
            err,
            FlagError::WrongKind {
                flag: Flag::Pvp,
                expected: FlagKind::Boolean,
                found: FlagKind::Text
            }
        );
        assert!(container.is_empty());
    }

    #[test]
    fn test_is_owner_rules() {
        let owner = player();
        let co_owner = player();
        let stranger = player();
        let mut container = FlagContainer::new(Owner::Player(owner.id));
        container.add_co_owner(co_owner.id);

        assert!(container.is_owner(&owner));
        assert!(container.is_owner(&co_owner));
        assert!(!container.is_owner(&stranger));
        assert!(container.is_owner(&Actor {
            ignoring_claims: true,
            ..stranger
        }));
        // Operators only own admin containers.
        assert!(!container.is_owner(&Actor::operator(stranger.id)));
        assert!(FlagContainer::new(Owner::Admin).is_owner(&Actor::operator(stranger.id)));
    }

    #[test]
    fn test_trust_augment_and_reduce() {
        let owner = player();
        let guest = player();
        let mut container = FlagContainer::new(Owner::Player(owner.id));

        assert_eq!(container.trust_level(&guest), TrustLevel::None);
        container.trust(guest.id, TrustLevel::Build);
        assert!(container.has_trust(&guest, TrustLevel::Container));
        assert!(!container.has_trust(&guest, TrustLevel::Management));
        assert_eq!(container.trust_level(&owner), TrustLevel::Management);

        assert!(container.untrust(&guest.id));
        container.trust_public(TrustLevel::Access);
        assert_eq!(container.trust_level(&guest), TrustLevel::Access);

        container.reset_trust();
        assert_eq!(container.trust_level(&guest), TrustLevel::None);
        assert!(container.is_set(Flag::Trust));
    }

    #[test]
    fn test_filter_entries() {
        let mut container = FlagContainer::default();
        assert_eq!(container.filter_add(Flag::BlockedCommands, "Home"), Ok(true));
        assert_eq!(container.filter_add(Flag::BlockedCommands, "home"), Ok(false));
        assert_eq!(container.filter_remove(Flag::BlockedCommands, "HOME"), Ok(true));
        assert!(container.filter_add(Flag::Pvp, "home").is_err());
    }

    #[test]
    fn test_set_owner_drops_matching_co_owner() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut container = FlagContainer::new(Owner::Player(a));
        container.add_co_owner(b);
        container.set_owner(Owner::Player(b));
        assert!(container.co_owners().is_empty());
        assert!(!container.add_co_owner(b));
    }

    #[test]
    fn test_active_members() {
        let owner = Uuid::new_v4();
        let builder = Uuid::new_v4();
        let visitor = Uuid::new_v4();
        let mut container = FlagContainer::new(Owner::Player(owner));
        container.trust(builder, TrustLevel::Build);
        container.trust(visitor, TrustLevel::Access);

        let members = container.active_members();
        assert!(members.contains(&owner));
        assert!(members.contains(&builder));
        assert!(!members.contains(&visitor));
    }
}
