//! Flag writes. A write on a region is replayed on every child sharing its priority, which is
//! how those children keep mirroring their parent.

use super::{ClaimState, DataManager};
use crate::error::ClaimError;
use crate::flags::{Flag, FlagContainer, FlagValue, TrustLevel};
use crate::player::PlayerId;
use crate::region::RegionId;

impl ClaimState {
    fn write_flags<R>(
        &mut self,
        world: &str,
        id: RegionId,
        apply: impl Fn(&mut FlagContainer) -> Result<R, ClaimError>,
    ) -> Result<R, ClaimError> {
        let world = self.world_mut(world)?;
        let region = world.region_mut(id).ok_or(ClaimError::UnknownRegion)?;
        let result = apply(region.flags_mut())?;

        let priority = region.priority();
        let children = region.children().to_vec();
        for child in children {
            if let Some(child) = world.region_mut(child) {
                if child.priority() == priority {
                    apply(child.flags_mut())?;
                }
            }
        }
        Ok(result)
    }

    fn write_global<R>(
        &mut self,
        world: &str,
        apply: impl FnOnce(&mut FlagContainer) -> Result<R, ClaimError>,
    ) -> Result<R, ClaimError> {
        apply(self.world_or_create(world).global_mut())
    }
}

impl DataManager {
    pub fn set_flag(
        &self,
        world: &str,
        id: RegionId,
        flag: Flag,
        value: FlagValue,
    ) -> Result<(), ClaimError> {
        self.state().write_flags(world, id, |flags| {
            flags.set(flag, value.clone()).map_err(ClaimError::from)
        })
    }

    /// Returns the value that was set, if any.
    pub fn clear_flag(
        &self,
        world: &str,
        id: RegionId,
        flag: Flag,
    ) -> Result<Option<FlagValue>, ClaimError> {
        self.state()
            .write_flags(world, id, |flags| Ok(flags.clear(flag)))
    }

    /// Grants `level` to a player. [`TrustLevel::None`] removes the grant.
    pub fn trust(
        &self,
        world: &str,
        id: RegionId,
        player: PlayerId,
        level: TrustLevel,
    ) -> Result<(), ClaimError> {
        self.state().write_flags(world, id, |flags| {
            flags.trust(player, level);
            Ok(())
        })
    }

    pub fn untrust(&self, world: &str, id: RegionId, player: PlayerId) -> Result<bool, ClaimError> {
        self.state()
            .write_flags(world, id, |flags| Ok(flags.untrust(&player)))
    }

    pub fn trust_public(
        &self,
        world: &str,
        id: RegionId,
        level: TrustLevel,
    ) -> Result<(), ClaimError> {
        self.state().write_flags(world, id, |flags| {
            flags.trust_public(level);
            Ok(())
        })
    }

    /// Adds an entry to a filter flag such as [`Flag::BlockedCommands`].
    pub fn filter_add(
        &self,
        world: &str,
        id: RegionId,
        flag: Flag,
        entry: &str,
    ) -> Result<bool, ClaimError> {
        self.state().write_flags(world, id, |flags| {
            flags.filter_add(flag, entry).map_err(ClaimError::from)
        })
    }

    pub fn filter_remove(
        &self,
        world: &str,
        id: RegionId,
        flag: Flag,
        entry: &str,
    ) -> Result<bool, ClaimError> {
        self.state().write_flags(world, id, |flags| {
            flags.filter_remove(flag, entry).map_err(ClaimError::from)
        })
    }

    /// Sets a flag for the whole world. Regions that set it themselves still win.
    pub fn set_global_flag(
        &self,
        world: &str,
        flag: Flag,
        value: FlagValue,
    ) -> Result<(), ClaimError> {
        self.state()
            .write_global(world, |flags| flags.set(flag, value).map_err(ClaimError::from))
    }

    pub fn clear_global_flag(&self, world: &str, flag: Flag) -> Option<FlagValue> {
        self.state()
            .write_global(world, |flags| Ok(flags.clear(flag)))
            .ok()
            .flatten()
    }

    pub fn global_flags(&self, world: &str) -> Option<FlagContainer> {
        self.state()
            .world(world)
            .ok()
            .map(|world| world.global().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::flags::{FlagError, FlagKind};
    use crate::geometry::Point;
    use crate::player::Actor;
    use crate::region::PendingRegion;
    use uuid::Uuid;

    fn manager_with_spawn() -> (DataManager, RegionId) {
        let manager = DataManager::new(Settings::default());
        let pending = manager.create_admin_region("world", Point::new(0, 0, 0), Point::new(30, 0, 30), None);
        let spawn = manager
            .register_region(pending, "spawn", 5, None, false, None)
            .unwrap();
        (manager, spawn)
    }

    fn child(manager: &DataManager, name: &str, priority: i32, corner: i32) -> RegionId {
        let pending = PendingRegion::new(
            "world",
            crate::geometry::Bounds::from_corners(
                Point::new(corner, 0, corner),
                Point::new(corner + 4, 100, corner + 4),
            ),
        );
        manager
            .register_region(pending, name, priority, Some("spawn"), false, None)
            .unwrap()
    }

    #[test]
    fn test_writes_mirror_to_equal_priority_children() {
        let (manager, spawn) = manager_with_spawn();
        let mirror = child(&manager, "mirror", 5, 1);
        let own = child(&manager, "own", 6, 10);

        manager
            .set_flag("world", spawn, Flag::Greeting, FlagValue::Text("hi".into()))
            .unwrap();
        assert_eq!(
            manager.region("world", mirror).unwrap().flags().get(Flag::Greeting),
            Some(&FlagValue::Text("hi".into()))
        );
        assert!(!manager.region("world", own).unwrap().flags().is_set(Flag::Greeting));

        manager.clear_flag("world", spawn, Flag::Greeting).unwrap();
        assert!(!manager.region("world", mirror).unwrap().flags().is_set(Flag::Greeting));
    }

    #[test]
    fn test_wrong_kind_is_refused() {
        let (manager, spawn) = manager_with_spawn();
        assert_eq!(
            manager.set_flag("world", spawn, Flag::Pvp, FlagValue::Text("no".into())),
            Err(ClaimError::Flag(FlagError::WrongKind {
                flag: Flag::Pvp,
                expected: FlagKind::Boolean,
                found: FlagKind::Text,
            }))
        );
    }

    #[test]
    fn test_trust_and_untrust() {
        let (manager, spawn) = manager_with_spawn();
        let mirror = child(&manager, "mirror", 5, 1);
        let friend = Uuid::new_v4();

        manager.trust("world", spawn, friend, TrustLevel::Build).unwrap();
        let level = manager
            .trust_level_at("world", Point::new(2, 50, 2), &Actor::player(friend));
        assert_eq!(level, TrustLevel::Build);
        assert_eq!(
            manager.region("world", mirror).unwrap().flags().trust_table().level_of(&friend),
            TrustLevel::Build
        );

        assert_eq!(manager.untrust("world", spawn, friend), Ok(true));
        assert_eq!(manager.untrust("world", spawn, friend), Ok(false));
    }

    #[test]
    fn test_filters() {
        let (manager, spawn) = manager_with_spawn();
        assert_eq!(manager.filter_add("world", spawn, Flag::BlockedCommands, "Home"), Ok(true));
        assert_eq!(manager.filter_add("world", spawn, Flag::BlockedCommands, "home"), Ok(false));
        assert_eq!(manager.filter_remove("world", spawn, Flag::BlockedCommands, "HOME"), Ok(true));
        assert!(manager.filter_add("world", spawn, Flag::Pvp, "x").is_err());
    }

    #[test]
    fn test_global_flags() {
        let manager = DataManager::new(Settings::default());
        assert!(manager.global_flags("world").is_none());

        manager
            .set_global_flag("world", Flag::Pvp, FlagValue::Boolean(false))
            .unwrap();
        assert!(!manager.global_flags("world").unwrap().is_allowed(Flag::Pvp));
        assert_eq!(
            manager.clear_global_flag("world", Flag::Pvp),
            Some(FlagValue::Boolean(false))
        );
        assert_eq!(manager.clear_global_flag("world", Flag::Pvp), None);
    }
}
