//! Player claims: creation, subdivisions and every kind of resize.

use log::info;

use super::{
    check_area, check_balance, check_collisions, check_sibling_collisions, check_sides, payer,
    ClaimState, DataManager,
};
use crate::error::ClaimError;
use crate::events::ClaimEvent;
use crate::flags::{Flag, FlagContainer, FlagValue, Owner};
use crate::geometry::{Bounds, Direction, Point};
use crate::player::Actor;
use crate::region::{Region, RegionId, MAX_PRIORITY};

impl ClaimState {
    pub(super) fn create_claim(
        &mut self,
        world: &str,
        a: Point,
        b: Point,
        owner: &Actor,
    ) -> Result<RegionId, ClaimError> {
        self.world_or_create(world);
        let balance = self.balance(&owner.id);
        let settings = &self.settings;
        let world_data = self.world(world)?;
        let (bottom, top) = world_data.dimension().claim_height(settings);
        let bounds = Bounds::from_corners_with_height(a, b, bottom, top);

        check_collisions(world_data, &bounds, None, &[])?;
        check_sides(settings, &bounds)?;
        check_balance(balance, bounds.area())?;
        check_area(bounds.area(), settings.min_claim_area)?;

        self.veto(&ClaimEvent::Creating {
            world: world_data.name(),
            bounds,
            owner: Owner::Player(owner.id),
            parent: None,
        })?;

        let mut container = FlagContainer::new(Owner::Player(owner.id));
        container.reset_trust();
        container.set(Flag::AllowOverlap, FlagValue::Boolean(false))?;

        let world_data = self.world_mut(world)?;
        let id = world_data.allocate_id();
        world_data.insert(Region::new(id, world, bounds, container));
        world_data.index(id);
        self.credit(owner.id, -bounds.area());
        Ok(id)
    }

    pub(super) fn create_subdivision(
        &mut self,
        world: &str,
        parent_id: RegionId,
        a: Point,
        b: Point,
    ) -> Result<RegionId, ClaimError> {
        let world_data = self.world(world)?;
        let parent = world_data.region(parent_id).ok_or(ClaimError::UnknownRegion)?;
        if parent.has_parent() {
            return Err(ClaimError::NestedSubdivision);
        }

        let parent_bounds = parent.bounds();
        let bounds = Bounds::from_corners_with_height(a, b, parent_bounds.min.y, parent_bounds.max.y);
        if !parent_bounds.contains_bounds(&bounds) {
            return Err(ClaimError::OutsideParent(parent_id));
        }

        let priority = parent.priority().saturating_add(1).min(MAX_PRIORITY);
        let mut container = FlagContainer::new(parent.owner());
        if priority == parent.priority() {
            container.copy_flags_from(parent.flags());
        }
        if !container.is_set(Flag::AllowOverlap) {
            container.set(Flag::AllowOverlap, FlagValue::Boolean(false))?;
        }

        if !container.is_allowed(Flag::AllowOverlap) {
            check_sibling_collisions(world_data, &bounds, None, parent_id)?;
        }
        check_sides(&self.settings, &bounds)?;
        if !parent.is_admin() {
            check_area(bounds.area(), self.settings.min_subdivision_area)?;
        }

        self.veto(&ClaimEvent::Creating {
            world: world_data.name(),
            bounds,
            owner: parent.owner(),
            parent: Some(parent_id),
        })?;

        let world_data = self.world_mut(world)?;
        let id = world_data.allocate_id();
        let mut region = Region::new(id, world, bounds, container);
        region.set_parent(Some(parent_id));
        region.set_priority(priority);
        world_data.insert(region);
        if let Some(parent) = world_data.region_mut(parent_id) {
            parent.children_mut().push(id);
        }
        world_data.index(id);
        Ok(id)
    }

    /// Validates `candidate` as the new box of `id` and commits it. A region whose box does not
    /// change is left alone.
    pub(super) fn resize(
        &mut self,
        world: &str,
        id: RegionId,
        candidate: Bounds,
        actor: &Actor,
    ) -> Result<Bounds, ClaimError> {
        let world_data = self.world(world)?;
        let region = world_data.region(id).ok_or(ClaimError::UnknownRegion)?;
        let old = region.bounds();
        if candidate == old {
            return Ok(old);
        }

        if !region.allows_overlap() {
            match region.parent() {
                Some(parent_id) => {
                    check_sibling_collisions(world_data, &candidate, Some(id), parent_id)?
                }
                None => {
                    let descendants = world_data.descendants(id);
                    check_collisions(world_data, &candidate, Some(id), &descendants)?;
                }
            }
        }
        check_sides(&self.settings, &candidate)?;

        let mut charge = None;
        if !region.is_admin() {
            if region.has_parent() {
                check_area(candidate.area(), self.settings.min_subdivision_area)?;
            } else {
                let co_owner = Some(actor.id).filter(|id| region.flags().is_co_owner(id));
                let delta = candidate.area() - old.area();
                if let Some(payer) = payer(region.owner(), co_owner) {
                    check_balance(self.balance(&payer), delta)?;
                    charge = Some((payer, delta));
                }
                check_area(candidate.area(), self.settings.min_claim_area)?;
            }
        }

        if let Some(parent_id) = region.parent() {
            let inside = world_data
                .region(parent_id)
                .is_some_and(|parent| parent.bounds().contains_bounds(&candidate));
            if !inside {
                return Err(ClaimError::OutsideParent(parent_id));
            }
        }
        let outside: Vec<RegionId> = region
            .children()
            .iter()
            .copied()
            .filter(|child| {
                world_data
                    .region(*child)
                    .is_some_and(|child| !candidate.contains_bounds(&child.bounds()))
            })
            .collect();
        if !outside.is_empty() {
            return Err(ClaimError::ChildrenOutside(outside));
        }

        self.veto(&ClaimEvent::Resizing {
            world: world_data.name(),
            region: id,
            from: old,
            to: candidate,
        })?;

        self.world_mut(world)?.move_region(id, candidate);
        if let Some((payer, delta)) = charge {
            self.credit(payer, -delta);
        }
        Ok(candidate)
    }

    /// Resolves a candidate box from the region's current one.
    fn candidate(
        &self,
        world: &str,
        id: RegionId,
        shape: impl FnOnce(Bounds) -> Bounds,
    ) -> Result<Bounds, ClaimError> {
        let region = self.world(world)?.region(id).ok_or(ClaimError::UnknownRegion)?;
        Ok(shape(region.bounds()))
    }
}

impl DataManager {
    /// Claims the column between two corners for `owner`, paying its area in claim blocks.
    pub fn create_claim(
        &self,
        world: &str,
        a: Point,
        b: Point,
        owner: &Actor,
    ) -> Result<RegionId, ClaimError> {
        let result = self.state().create_claim(world, a, b, owner);
        self.report(Some(owner), &result, |id| {
            format!("Created claim {id} in '{world}', {} claim blocks left", self.claim_blocks(owner.id))
        });
        result
    }

    /// Carves a subdivision out of a claim. It spans the parent's vertical range and costs no
    /// claim blocks.
    pub fn create_subdivision(
        &self,
        world: &str,
        parent: RegionId,
        a: Point,
        b: Point,
        actor: &Actor,
    ) -> Result<RegionId, ClaimError> {
        let result = self.state().create_subdivision(world, parent, a, b);
        self.report(Some(actor), &result, |id| {
            format!("Created subdivision {id} of {parent} in '{world}'")
        });
        result
    }

    /// Drags the nearest corner of a region to `to`. The vertical range is kept.
    pub fn move_vertex(
        &self,
        world: &str,
        id: RegionId,
        to: Point,
        actor: &Actor,
    ) -> Result<Bounds, ClaimError> {
        let result = {
            let mut state = self.state();
            state
                .candidate(world, id, |bounds| {
                    bounds.with_vertex_moved(Point::new(to.x, bounds.max.y, to.z))
                })
                .and_then(|candidate| state.resize(world, id, candidate, actor))
        };
        self.report_resize(world, id, actor, &result);
        result
    }

    /// Pushes one face of a region by `amount` blocks, pulling it in when negative.
    pub fn expand(
        &self,
        world: &str,
        id: RegionId,
        direction: Direction,
        amount: i32,
        actor: &Actor,
    ) -> Result<Bounds, ClaimError> {
        let result = {
            let mut state = self.state();
            state
                .candidate(world, id, |bounds| bounds.expanded(direction, amount))
                .and_then(|candidate| state.resize(world, id, candidate, actor))
        };
        self.report_resize(world, id, actor, &result);
        result
    }

    /// Replaces the box of a region outright.
    pub fn resize(
        &self,
        world: &str,
        id: RegionId,
        bounds: Bounds,
        actor: &Actor,
    ) -> Result<Bounds, ClaimError> {
        let result = self.state().resize(world, id, bounds, actor);
        self.report_resize(world, id, actor, &result);
        result
    }

    fn report_resize(
        &self,
        world: &str,
        id: RegionId,
        actor: &Actor,
        result: &Result<Bounds, ClaimError>,
    ) {
        if result.is_ok() {
            info!("Region {id} in '{world}' resized by {}", actor.id);
        }
        self.report(Some(actor), result, |bounds| {
            format!(
                "Resized {id} to {bounds} ({} blocks), {} claim blocks left",
                bounds.area(),
                self.claim_blocks(actor.id)
            )
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use uuid::Uuid;

    fn manager() -> DataManager {
        DataManager::new(Settings::default())
    }

    fn rich_player(manager: &DataManager, blocks: i64) -> Actor {
        let actor = Actor::player(Uuid::new_v4());
        manager.adjust_claim_blocks(actor.id, blocks - manager.claim_blocks(actor.id));
        actor
    }

    #[test]
    fn test_create_claim_debits_and_indexes() {
        let manager = manager();
        let owner = rich_player(&manager, 500);
        let id = manager
            .create_claim("world", Point::new(9, 70, 9), Point::new(0, 64, 0), &owner)
            .unwrap();

        assert_eq!(manager.claim_blocks(owner.id), 400);
        let region = manager.region("world", id).unwrap();
        assert_eq!(region.bounds().min, Point::new(0, -64, 0));
        assert_eq!(region.bounds().max, Point::new(9, 319, 9));
        assert!(!region.allows_overlap());
        assert_eq!(
            manager.highest_priority_region_at("world", Point::new(5, 10, 5)).map(|r| r.id()),
            Some(id)
        );
    }

    #[test]
    fn test_create_claim_in_nether_uses_nether_height() {
        let manager = manager();
        let owner = rich_player(&manager, 500);
        let id = manager
            .create_claim("world_nether", Point::new(0, 0, 0), Point::new(9, 0, 9), &owner)
            .unwrap();
        let bounds = manager.region("world_nether", id).unwrap().bounds();
        assert_eq!((bounds.min.y, bounds.max.y), (0, 127));
    }

    #[test]
    fn test_create_claim_refusals() {
        let manager = manager();
        let owner = rich_player(&manager, 100);

        let narrow = manager.create_claim("world", Point::new(0, 0, 0), Point::new(1, 0, 60), &owner);
        assert_eq!(narrow, Err(ClaimError::TooNarrow { min: 3 }));

        let small = manager.create_claim("world", Point::new(0, 0, 0), Point::new(4, 0, 4), &owner);
        assert_eq!(small, Err(ClaimError::TooSmall { area: 25, min: 100 }));

        let costly = manager.create_claim("world", Point::new(0, 0, 0), Point::new(10, 0, 10), &owner);
        assert_eq!(costly, Err(ClaimError::InsufficientClaimBlocks { needed: 21 }));

        assert_eq!(manager.claim_blocks(owner.id), 100);
        assert!(manager.top_level_regions("world").is_empty());
    }

    #[test]
    fn test_claims_cannot_overlap() {
        let manager = manager();
        let first = rich_player(&manager, 1000);
        let second = rich_player(&manager, 1000);
        let id = manager
            .create_claim("world", Point::new(0, 0, 0), Point::new(9, 0, 9), &first)
            .unwrap();

        let result = manager.create_claim("world", Point::new(5, 0, 5), Point::new(20, 0, 20), &second);
        assert_eq!(result, Err(ClaimError::Collision(vec![id])));
        assert_eq!(manager.claim_blocks(second.id), 1000);
    }

    #[test]
    fn test_subdivision_inherits_height_and_owner() {
        let manager = manager();
        let owner = rich_player(&manager, 1000);
        let claim = manager
            .create_claim("world", Point::new(0, 0, 0), Point::new(19, 0, 19), &owner)
            .unwrap();
        let sub = manager
            .create_subdivision("world", claim, Point::new(2, 5, 2), Point::new(6, 5, 6), &owner)
            .unwrap();

        let region = manager.region("world", sub).unwrap();
        assert_eq!(region.parent(), Some(claim));
        assert_eq!(region.priority(), 1);
        assert_eq!(region.owner(), Owner::Player(owner.id));
        assert_eq!(region.bounds().min.y, -64);
        assert_eq!(manager.children_of("world", claim), vec![sub]);
        assert!(!manager.top_level_regions("world").iter().any(|r| r.id() == sub));
        assert_eq!(manager.claim_blocks(owner.id), 600);
    }

    #[test]
    fn test_subdivision_must_fit_and_not_overlap_siblings() {
        let manager = manager();
        let owner = rich_player(&manager, 1000);
        let claim = manager
            .create_claim("world", Point::new(0, 0, 0), Point::new(19, 0, 19), &owner)
            .unwrap();

        let outside = manager.create_subdivision("world", claim, Point::new(15, 0, 15), Point::new(25, 0, 25), &owner);
        assert_eq!(outside, Err(ClaimError::OutsideParent(claim)));

        let sub = manager
            .create_subdivision("world", claim, Point::new(0, 0, 0), Point::new(5, 0, 5), &owner)
            .unwrap();
        let sibling = manager.create_subdivision("world", claim, Point::new(4, 0, 4), Point::new(9, 0, 9), &owner);
        assert_eq!(sibling, Err(ClaimError::Collision(vec![sub])));

        let nested = manager.create_subdivision("world", sub, Point::new(1, 0, 1), Point::new(4, 0, 4), &owner);
        assert_eq!(nested, Err(ClaimError::NestedSubdivision));
    }

    #[test]
    fn test_subdivision_ignores_regions_outside_its_claim() {
        let manager = manager();
        let owner = rich_player(&manager, 1000);
        let claim = manager
            .create_claim("world", Point::new(0, 0, 0), Point::new(19, 0, 19), &owner)
            .unwrap();

        // A forced admin road cutting through the claim.
        let mut road = manager.create_admin_region("world", Point::new(15, 0, -10), Point::new(17, 0, 30), None);
        road.flags
            .set(Flag::AllowOverlap, FlagValue::Boolean(false))
            .unwrap();
        manager
            .register_region(road, "road", 0, None, true, None)
            .unwrap();

        let sub = manager
            .create_subdivision("world", claim, Point::new(12, 0, 2), Point::new(18, 0, 8), &owner)
            .unwrap();
        let bounds = manager.expand("world", sub, Direction::South, 4, &owner).unwrap();
        assert_eq!(bounds.max.z, 12);
    }

    #[test]
    fn test_parent_resize_keeps_children_inside() {
        let manager = manager();
        let owner = rich_player(&manager, 1000);
        let claim = manager
            .create_claim("world", Point::new(0, 0, 0), Point::new(19, 0, 19), &owner)
            .unwrap();
        let sub = manager
            .create_subdivision("world", claim, Point::new(14, 0, 0), Point::new(19, 0, 5), &owner)
            .unwrap();
        let before = manager.region("world", claim).unwrap().bounds();

        let result = manager.expand("world", claim, Direction::East, -5, &owner);
        assert_eq!(result, Err(ClaimError::ChildrenOutside(vec![sub])));
        assert_eq!(manager.region("world", claim).unwrap().bounds(), before);
        assert_eq!(manager.claim_blocks(owner.id), 600);
    }

    #[test]
    fn test_child_resize_stays_inside_parent() {
        let manager = manager();
        let owner = rich_player(&manager, 1000);
        let claim = manager
            .create_claim("world", Point::new(0, 0, 0), Point::new(19, 0, 19), &owner)
            .unwrap();
        let sub = manager
            .create_subdivision("world", claim, Point::new(2, 0, 2), Point::new(6, 0, 6), &owner)
            .unwrap();

        let result = manager.expand("world", sub, Direction::West, 5, &owner);
        assert_eq!(result, Err(ClaimError::OutsideParent(claim)));

        let bounds = manager.expand("world", sub, Direction::West, 2, &owner).unwrap();
        assert_eq!(bounds.min.x, 0);
        assert_eq!(manager.claim_blocks(owner.id), 600);
    }

    #[test]
    fn test_move_vertex_snaps_nearest_corner() {
        let manager = manager();
        let owner = rich_player(&manager, 1000);
        let claim = manager
            .create_claim("world", Point::new(0, 0, 0), Point::new(9, 0, 9), &owner)
            .unwrap();

        let bounds = manager
            .move_vertex("world", claim, Point::new(14, 64, 11), &owner)
            .unwrap();
        assert_eq!(bounds.min, Point::new(0, -64, 0));
        assert_eq!(bounds.max, Point::new(14, 319, 11));
        assert_eq!(manager.claim_blocks(owner.id), 1000 - 15 * 12);
    }

    #[test]
    fn test_shrink_refunds() {
        let manager = manager();
        let owner = rich_player(&manager, 1000);
        let claim = manager
            .create_claim("world", Point::new(0, 0, 0), Point::new(19, 0, 9), &owner)
            .unwrap();
        assert_eq!(manager.claim_blocks(owner.id), 800);

        manager.expand("world", claim, Direction::East, -10, &owner).unwrap();
        assert_eq!(manager.claim_blocks(owner.id), 900);
    }

    #[test]
    fn test_co_owner_pays_own_blocks() {
        let manager = manager();
        let owner = rich_player(&manager, 1000);
        let co_owner = rich_player(&manager, 300);
        let claim = manager
            .create_claim("world", Point::new(0, 0, 0), Point::new(9, 0, 9), &owner)
            .unwrap();
        manager.add_co_owner("world", claim, co_owner.id).unwrap();

        manager.expand("world", claim, Direction::South, 10, &co_owner).unwrap();
        assert_eq!(manager.claim_blocks(owner.id), 900);
        assert_eq!(manager.claim_blocks(co_owner.id), 200);
    }

    #[test]
    fn test_unknown_region_and_world() {
        let manager = manager();
        let owner = rich_player(&manager, 1000);
        assert_eq!(
            manager.expand("nowhere", RegionId(1), Direction::Up, 1, &owner),
            Err(ClaimError::UnknownWorld("nowhere".into()))
        );
        manager
            .create_claim("world", Point::new(0, 0, 0), Point::new(9, 0, 9), &owner)
            .unwrap();
        assert_eq!(
            manager.expand("world", RegionId(99), Direction::Up, 1, &owner),
            Err(ClaimError::UnknownRegion)
        );
    }
}
