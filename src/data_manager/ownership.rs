//! Transfers, deletions, co-owners and claim expiry.

use chrono::{DateTime, Duration, Utc};
use log::info;

use super::{check_balance, ClaimState, DataManager};
use crate::error::ClaimError;
use crate::flags::Owner;
use crate::player::{Actor, PlayerId};
use crate::region::{Region, RegionId};

impl ClaimState {
    /// Hands a top-level player claim and its subdivisions to `new_owner`, who pays for the
    /// area while the old owner is refunded. `free` skips the balance check, so the new
    /// balance may go negative.
    pub(super) fn transfer(
        &mut self,
        world: &str,
        id: RegionId,
        new_owner: PlayerId,
        keep_trust: bool,
        free: bool,
    ) -> Result<Option<PlayerId>, ClaimError> {
        let world_data = self.world(world)?;
        let region = world_data.region(id).ok_or(ClaimError::UnknownRegion)?;
        if region.is_admin() {
            return Err(ClaimError::AdminTransfer);
        }
        if region.has_parent() {
            return Err(ClaimError::SubdivisionTransfer);
        }
        if region.owner() == Owner::Player(new_owner) {
            return Err(ClaimError::AlreadyOwner);
        }

        let area = region.area();
        if !free {
            check_balance(self.balance(&new_owner), area)?;
        }
        let old_owner = region.owner().player();
        let mut family = world_data.descendants(id);
        family.insert(0, id);

        let world_data = self.world_mut(world)?;
        for member in family {
            if let Some(region) = world_data.region_mut(member) {
                if !keep_trust {
                    region.flags_mut().reset_trust();
                }
                region.flags_mut().set_owner(Owner::Player(new_owner));
            }
        }

        self.credit(new_owner, -area);
        if let Some(old_owner) = old_owner {
            self.credit(old_owner, area);
        }
        Ok(old_owner)
    }

    pub(super) fn delete_region(
        &mut self,
        world: &str,
        id: RegionId,
        recursive: bool,
    ) -> Result<Vec<RegionId>, ClaimError> {
        let region = self
            .world(world)?
            .region(id)
            .ok_or(ClaimError::UnknownRegion)?;
        if !region.children().is_empty() && !recursive {
            return Err(ClaimError::HasSubdivisions);
        }

        let mut deleted = Vec::new();
        for child in region.children().to_vec() {
            deleted.extend(self.delete_region(world, child, true)?);
        }

        let world_data = self.world_mut(world)?;
        world_data.unindex(id);
        let Some(region) = world_data.take(id) else {
            return Ok(deleted);
        };
        if let Some(parent) = region.parent().and_then(|parent| world_data.region_mut(parent)) {
            parent.children_mut().retain(|child| *child != id);
        }
        if let (Owner::Player(owner), false) = (region.owner(), region.has_parent()) {
            self.credit(owner, region.area());
        }
        deleted.push(id);
        Ok(deleted)
    }

    /// Deletes, with their subdivisions, every top-level region matching `predicate`.
    pub(super) fn delete_matching(
        &mut self,
        world: &str,
        predicate: &dyn Fn(&Region) -> bool,
    ) -> Result<usize, ClaimError> {
        let world_data = self.world(world)?;
        let matching: Vec<RegionId> = world_data
            .top_level()
            .iter()
            .filter(|id| world_data.region(**id).is_some_and(predicate))
            .copied()
            .collect();

        let mut count = 0;
        for id in matching {
            count += self.delete_region(world, id, true)?.len();
        }
        Ok(count)
    }

    pub(super) fn co_owner(
        &mut self,
        world: &str,
        id: RegionId,
        player: PlayerId,
        add: bool,
    ) -> Result<bool, ClaimError> {
        let world_data = self.world_mut(world)?;
        let region = world_data.region(id).ok_or(ClaimError::UnknownRegion)?;
        if region.has_parent() {
            return Err(ClaimError::SubdivisionTransfer);
        }

        let mut family = world_data.descendants(id);
        family.insert(0, id);
        let mut changed = false;
        for member in family {
            if let Some(region) = world_data.region_mut(member) {
                let flags = region.flags_mut();
                let applied = if add {
                    flags.add_co_owner(player)
                } else {
                    flags.remove_co_owner(&player)
                };
                changed |= member == id && applied;
            }
        }
        Ok(changed)
    }

    fn last_login(&self, player: &PlayerId) -> Option<DateTime<Utc>> {
        match self.sessions.get(player) {
            Some(session) => session.data.last_login,
            None => self.players.get(player).and_then(|data| data.last_login),
        }
    }

    pub(super) fn is_expired(
        &self,
        world: &str,
        id: RegionId,
        now: DateTime<Utc>,
    ) -> Result<bool, ClaimError> {
        let region = self.world(world)?.region(id).ok_or(ClaimError::UnknownRegion)?;
        if region.is_admin() || self.settings.expiration_days <= 0 {
            return Ok(false);
        }

        let members = region.flags().active_members();
        if members.iter().any(|member| self.sessions.contains_key(member)) {
            return Ok(false);
        }
        let newest = members.iter().filter_map(|member| self.last_login(member)).max();
        Ok(match newest {
            Some(last) => now - last > Duration::days(self.settings.expiration_days),
            None => true,
        })
    }

    pub(super) fn steal_claim(
        &mut self,
        world: &str,
        id: RegionId,
        claimant: PlayerId,
        now: DateTime<Utc>,
    ) -> Result<Option<PlayerId>, ClaimError> {
        if !self.is_expired(world, id, now)? {
            return Err(ClaimError::NotExpired);
        }
        let previous = self.transfer(world, id, claimant, false, false)?;
        if let Some(region) = self.world_mut(world)?.region_mut(id) {
            region.set_recently_stolen(true);
        }
        Ok(previous)
    }
}

impl DataManager {
    /// Gives a claim to another player. Operators skip the balance check. Trust is wiped on the
    /// claim and its subdivisions unless `keep_trust` is set.
    pub fn transfer(
        &self,
        world: &str,
        id: RegionId,
        new_owner: PlayerId,
        actor: &Actor,
        keep_trust: bool,
    ) -> Result<(), ClaimError> {
        let result = self
            .state()
            .transfer(world, id, new_owner, keep_trust, actor.operator);
        let name = self.display_name(&new_owner);
        self.report(Some(actor), &result, |_| {
            format!("Transferred {id} in '{world}' to {name}")
        });
        if let Ok(previous) = &result {
            self.tell(*previous, &format!("Your claim {id} in '{world}' now belongs to {name}"));
            self.tell(Some(new_owner), &format!("You now own claim {id} in '{world}'"));
        }
        result.map(|_| ())
    }

    /// Deletes a region. With `recursive` its subdivisions go with it, otherwise a region that
    /// has any is refused. Returns every deleted id, children first.
    pub fn delete_region(
        &self,
        world: &str,
        id: RegionId,
        recursive: bool,
        actor: Option<&Actor>,
    ) -> Result<Vec<RegionId>, ClaimError> {
        let result = self.state().delete_region(world, id, recursive);
        self.report(actor, &result, |deleted| {
            format!("Deleted {} region(s) in '{world}'", deleted.len())
        });
        result
    }

    /// Deletes every top-level region of a world matching `predicate`, subdivisions included.
    /// Returns how many regions were removed.
    pub fn delete_matching(
        &self,
        world: &str,
        predicate: impl Fn(&Region) -> bool,
    ) -> Result<usize, ClaimError> {
        let result = self.state().delete_matching(world, &predicate);
        if let Ok(count) = result {
            info!("Bulk deleted {count} region(s) in '{world}'");
        }
        result
    }

    /// Deletes every top-level claim owned by `player` in every world.
    pub fn delete_all_claims(&self, player: PlayerId) -> usize {
        let worlds = self.world_names();
        worlds
            .iter()
            .filter_map(|world| {
                self.delete_matching(world, |region| region.owner() == Owner::Player(player))
                    .ok()
            })
            .sum()
    }

    pub fn add_co_owner(
        &self,
        world: &str,
        id: RegionId,
        player: PlayerId,
    ) -> Result<bool, ClaimError> {
        self.state().co_owner(world, id, player, true)
    }

    pub fn remove_co_owner(
        &self,
        world: &str,
        id: RegionId,
        player: PlayerId,
    ) -> Result<bool, ClaimError> {
        self.state().co_owner(world, id, player, false)
    }

    /// Whether every member of a claim has been away longer than the expiry period.
    pub fn is_expired(
        &self,
        world: &str,
        id: RegionId,
        now: DateTime<Utc>,
    ) -> Result<bool, ClaimError> {
        self.state().is_expired(world, id, now)
    }

    /// Takes over an expired claim. The claimant pays for it like any transfer.
    pub fn steal_claim(
        &self,
        world: &str,
        id: RegionId,
        claimant: &Actor,
    ) -> Result<(), ClaimError> {
        let result = self
            .state()
            .steal_claim(world, id, claimant.id, Utc::now());
        self.report(Some(claimant), &result, |_| {
            format!("You took over the abandoned claim {id} in '{world}'")
        });
        result.map(|_| ())
    }

    fn display_name(&self, player: &PlayerId) -> String {
        self.resolver
            .resolve_name(player)
            .unwrap_or_else(|| player.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::flags::{Flag, FlagValue, TrustLevel};
    use crate::geometry::Point;
    use uuid::Uuid;

    fn manager() -> DataManager {
        DataManager::new(Settings::default())
    }

    fn player(manager: &DataManager, blocks: i64) -> Actor {
        let actor = Actor::player(Uuid::new_v4());
        manager.adjust_claim_blocks(actor.id, blocks - manager.claim_blocks(actor.id));
        actor
    }

    fn claim(manager: &DataManager, owner: &Actor) -> RegionId {
        manager
            .create_claim("world", Point::new(0, 0, 0), Point::new(9, 0, 9), owner)
            .unwrap()
    }

    #[test]
    fn test_transfer_moves_blocks_and_resets_trust() {
        let manager = manager();
        let owner = player(&manager, 500);
        let heir = player(&manager, 500);
        let friend = Uuid::new_v4();
        let id = claim(&manager, &owner);
        let sub = manager
            .create_subdivision("world", id, Point::new(1, 0, 1), Point::new(4, 0, 4), &owner)
            .unwrap();
        manager.trust("world", id, friend, TrustLevel::Build).unwrap();
        manager.trust("world", sub, friend, TrustLevel::Build).unwrap();

        manager.transfer("world", id, heir.id, &owner, false).unwrap();

        assert_eq!(manager.claim_blocks(owner.id), 500);
        assert_eq!(manager.claim_blocks(heir.id), 400);
        for region in [id, sub] {
            let region = manager.region("world", region).unwrap();
            assert_eq!(region.owner(), Owner::Player(heir.id));
            assert_eq!(region.flags().trust_table().level_of(&friend), TrustLevel::None);
        }
    }

    #[test]
    fn test_transfer_can_keep_trust() {
        let manager = manager();
        let owner = player(&manager, 500);
        let heir = player(&manager, 500);
        let friend = Uuid::new_v4();
        let id = claim(&manager, &owner);
        manager.trust("world", id, friend, TrustLevel::Access).unwrap();

        manager.transfer("world", id, heir.id, &owner, true).unwrap();
        let region = manager.region("world", id).unwrap();
        assert_eq!(region.flags().trust_table().level_of(&friend), TrustLevel::Access);
    }

    #[test]
    fn test_transfer_refusals() {
        let manager = manager();
        let owner = player(&manager, 500);
        let poor = player(&manager, 10);
        let id = claim(&manager, &owner);

        assert_eq!(
            manager.transfer("world", id, poor.id, &owner, false),
            Err(ClaimError::InsufficientClaimBlocks { needed: 90 })
        );
        assert_eq!(
            manager.transfer("world", id, owner.id, &owner, false),
            Err(ClaimError::AlreadyOwner)
        );

        let operator = Actor::operator(Uuid::new_v4());
        let area = manager.region("world", id).unwrap().area();
        let total = manager.claim_blocks(poor.id) + manager.claim_blocks(owner.id);
        manager.transfer("world", id, poor.id, &operator, false).unwrap();
        assert_eq!(manager.claim_blocks(poor.id), 10 - area);
        assert_eq!(manager.claim_blocks(owner.id), 500);
        assert_eq!(
            manager.claim_blocks(poor.id) + manager.claim_blocks(owner.id),
            total
        );

        let pending = manager.create_admin_region("world", Point::new(50, 0, 50), Point::new(60, 0, 60), None);
        let spawn = manager
            .register_region(pending, "spawn", 0, None, false, None)
            .unwrap();
        assert_eq!(
            manager.transfer("world", spawn, poor.id, &operator, false),
            Err(ClaimError::AdminTransfer)
        );
    }

    #[test]
    fn test_delete_requires_recursive_for_children() {
        let manager = manager();
        let owner = player(&manager, 500);
        let id = claim(&manager, &owner);
        let sub = manager
            .create_subdivision("world", id, Point::new(1, 0, 1), Point::new(4, 0, 4), &owner)
            .unwrap();

        assert_eq!(
            manager.delete_region("world", id, false, None),
            Err(ClaimError::HasSubdivisions)
        );
        assert_eq!(manager.delete_region("world", id, true, None), Ok(vec![sub, id]));
        assert_eq!(manager.claim_blocks(owner.id), 500);
        assert!(manager.regions_at("world", Point::new(2, 0, 2)).is_empty());
    }

    #[test]
    fn test_delete_subdivision_unlinks_parent() {
        let manager = manager();
        let owner = player(&manager, 500);
        let id = claim(&manager, &owner);
        let sub = manager
            .create_subdivision("world", id, Point::new(1, 0, 1), Point::new(4, 0, 4), &owner)
            .unwrap();

        manager.delete_region("world", sub, false, None).unwrap();
        assert!(manager.children_of("world", id).is_empty());
        assert_eq!(manager.claim_blocks(owner.id), 400);
    }

    #[test]
    fn test_delete_matching() {
        let manager = manager();
        let owner = player(&manager, 1000);
        let other = player(&manager, 1000);
        claim(&manager, &owner);
        manager
            .create_claim("world", Point::new(20, 0, 20), Point::new(29, 0, 29), &owner)
            .unwrap();
        manager
            .create_claim("world", Point::new(40, 0, 40), Point::new(49, 0, 49), &other)
            .unwrap();

        assert_eq!(manager.delete_all_claims(owner.id), 2);
        assert_eq!(manager.top_level_regions("world").len(), 1);
        assert_eq!(manager.claim_blocks(owner.id), 1000);
    }

    #[test]
    fn test_co_owners_cascade() {
        let manager = manager();
        let owner = player(&manager, 500);
        let helper = Uuid::new_v4();
        let id = claim(&manager, &owner);
        let sub = manager
            .create_subdivision("world", id, Point::new(1, 0, 1), Point::new(4, 0, 4), &owner)
            .unwrap();

        assert_eq!(manager.add_co_owner("world", id, helper), Ok(true));
        assert_eq!(manager.add_co_owner("world", id, helper), Ok(false));
        assert!(manager.region("world", sub).unwrap().flags().is_co_owner(&helper));
        assert_eq!(
            manager.add_co_owner("world", sub, helper),
            Err(ClaimError::SubdivisionTransfer)
        );
        assert_eq!(manager.remove_co_owner("world", id, helper), Ok(true));
    }

    #[test]
    fn test_expiry_and_steal() {
        let manager = manager();
        let owner = player(&manager, 500);
        let thief = player(&manager, 500);
        let id = claim(&manager, &owner);
        let now = Utc::now();

        manager.player_join(owner.id);
        assert_eq!(manager.is_expired("world", id, now + Duration::days(90)), Ok(false));
        manager.player_quit(owner.id);
        assert_eq!(manager.is_expired("world", id, now + Duration::days(30)), Ok(false));
        assert_eq!(manager.is_expired("world", id, now + Duration::days(90)), Ok(true));

        assert_eq!(
            manager.steal_claim("world", id, &thief),
            Err(ClaimError::NotExpired)
        );
        {
            let mut state = manager.state();
            let data = state.ledger_mut(owner.id);
            data.last_login = Some(now - Duration::days(61));
        }
        manager.steal_claim("world", id, &thief).unwrap();

        let region = manager.region("world", id).unwrap();
        assert_eq!(region.owner(), Owner::Player(thief.id));
        assert!(region.recently_stolen());
        assert_eq!(manager.claim_blocks(thief.id), 400);
    }

    #[test]
    fn test_never_seen_members_expire() {
        let manager = manager();
        let owner = player(&manager, 500);
        let id = claim(&manager, &owner);
        assert_eq!(manager.is_expired("world", id, Utc::now()), Ok(true));

        let spawn = manager.create_admin_region("world", Point::new(50, 0, 50), Point::new(60, 0, 60), None);
        let spawn = manager
            .register_region(spawn, "spawn", 0, None, false, None)
            .unwrap();
        assert_eq!(manager.is_expired("world", spawn, Utc::now()), Ok(false));
    }

    #[test]
    fn test_trusted_container_member_keeps_claim_alive() {
        let manager = manager();
        let owner = player(&manager, 500);
        let friend = Uuid::new_v4();
        let id = claim(&manager, &owner);
        manager
            .set_flag("world", id, Flag::Pvp, FlagValue::Boolean(false))
            .unwrap();
        manager.trust("world", id, friend, TrustLevel::Container).unwrap();

        manager.player_join(friend);
        assert_eq!(manager.is_expired("world", id, Utc::now()), Ok(false));
    }
}
