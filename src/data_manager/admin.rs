//! Admin regions, names, priorities and parent association.

use super::{check_collisions, check_sibling_collisions, check_sides, ClaimState, DataManager};
use crate::consts::claims::{GLOBAL_REGION_NAME, MAX_NAME_LENGTH};
use crate::error::ClaimError;
use crate::events::ClaimEvent;
use crate::flags::Flag;
use crate::geometry::{Bounds, Point};
use crate::player::Actor;
use crate::region::{PendingRegion, Region, RegionId, MAX_PRIORITY};
use crate::world::{Dimension, WorldData};

/// Names are non-empty identifiers, unique per world regardless of case.
fn validate_name(world: &WorldData, name: &str, subject: Option<RegionId>) -> Result<(), ClaimError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_NAME_LENGTH
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return Err(ClaimError::InvalidName(name.to_string()));
    }
    if name.eq_ignore_ascii_case(GLOBAL_REGION_NAME) {
        return Err(ClaimError::ReservedName(name.to_string()));
    }
    if let Some(existing) = world.region_by_name(name) {
        if Some(existing.id()) != subject {
            return Err(ClaimError::DuplicateName(name.to_string()));
        }
    }
    Ok(())
}

fn validate_priority(priority: i32) -> Result<u8, ClaimError> {
    u8::try_from(priority)
        .ok()
        .filter(|p| *p <= MAX_PRIORITY)
        .ok_or(ClaimError::PriorityOutOfRange(priority))
}

impl ClaimState {
    pub(super) fn register_region(
        &mut self,
        pending: PendingRegion,
        name: &str,
        priority: i32,
        parent_name: Option<&str>,
        force: bool,
    ) -> Result<RegionId, ClaimError> {
        let mut priority = validate_priority(priority)?;
        self.world_or_create(&pending.world);
        let world = self.world(&pending.world)?;
        validate_name(world, name, None)?;

        let mut flags = pending.flags;
        let parent = match parent_name {
            Some(parent_name) => {
                let parent = world
                    .region_by_name(parent_name)
                    .ok_or_else(|| ClaimError::UnknownRegionName(parent_name.to_string()))?;
                if parent.has_parent() {
                    return Err(ClaimError::NestedSubdivision);
                }
                if !parent.bounds().contains_bounds(&pending.bounds) {
                    return Err(ClaimError::OutsideParent(parent.id()));
                }
                priority = priority.max(parent.priority());
                if priority == parent.priority() {
                    flags.copy_flags_from(parent.flags());
                }
                flags.set_owner(parent.owner());
                Some(parent)
            }
            None => None,
        };

        if !force && !flags.is_allowed(Flag::AllowOverlap) {
            match parent {
                Some(parent) => check_sibling_collisions(world, &pending.bounds, None, parent.id())?,
                None => check_collisions(world, &pending.bounds, None, &[])?,
            }
        }
        check_sides(&self.settings, &pending.bounds)?;

        let parent_id = parent.map(Region::id);
        self.veto(&ClaimEvent::Creating {
            world: world.name(),
            bounds: pending.bounds,
            owner: flags.owner(),
            parent: parent_id,
        })?;

        let world = self.world_mut(&pending.world)?;
        let id = world.allocate_id();
        let mut region = Region::new(id, &pending.world, pending.bounds, flags);
        region.set_name(Some(name.to_string()));
        region.set_priority(priority);
        region.set_parent(parent_id);
        world.insert(region);
        if let Some(parent) = parent_id.and_then(|parent| world.region_mut(parent)) {
            parent.children_mut().push(id);
        }
        world.index(id);
        Ok(id)
    }

    pub(super) fn rename_region(
        &mut self,
        world: &str,
        id: RegionId,
        name: &str,
    ) -> Result<(), ClaimError> {
        let world = self.world_mut(world)?;
        if world.region(id).is_none() {
            return Err(ClaimError::UnknownRegion);
        }
        validate_name(world, name, Some(id))?;
        if let Some(region) = world.region_mut(id) {
            region.set_name(Some(name.to_string()));
        }
        Ok(())
    }

    pub(super) fn set_priority(
        &mut self,
        world: &str,
        id: RegionId,
        priority: i32,
    ) -> Result<(), ClaimError> {
        let priority = validate_priority(priority)?;
        let world = self.world_mut(world)?;
        let region = world.region(id).ok_or(ClaimError::UnknownRegion)?;
        if let Some(parent) = region.parent().and_then(|parent| world.region(parent)) {
            if priority < parent.priority() {
                return Err(ClaimError::PriorityBelowParent {
                    parent: parent.priority(),
                });
            }
        }

        let children = region.children().to_vec();
        if let Some(region) = world.region_mut(id) {
            region.set_priority(priority);
        }
        for child in children {
            if let Some(child) = world.region_mut(child) {
                if child.priority() < priority {
                    child.set_priority(priority);
                }
            }
        }
        Ok(())
    }

    /// Makes an existing top-level region a child of the region named `parent_name`. Unless
    /// `force` is set it may not overlap the children already there.
    pub(super) fn associate(
        &mut self,
        world: &str,
        id: RegionId,
        parent_name: &str,
        force: bool,
    ) -> Result<RegionId, ClaimError> {
        let world_data = self.world(world)?;
        let region = world_data.region(id).ok_or(ClaimError::UnknownRegion)?;
        let parent = world_data
            .region_by_name(parent_name)
            .ok_or_else(|| ClaimError::UnknownRegionName(parent_name.to_string()))?;
        if !region.children().is_empty() {
            return Err(ClaimError::HasSubdivisions);
        }
        if region.has_parent() || parent.has_parent() || parent.id() == id {
            return Err(ClaimError::NestedSubdivision);
        }
        if !parent.contains_region(region) {
            return Err(ClaimError::OutsideParent(parent.id()));
        }
        if !force && !region.allows_overlap() {
            check_sibling_collisions(world_data, &region.bounds(), Some(id), parent.id())?;
        }

        let parent_id = parent.id();
        let parent_priority = parent.priority();
        let parent_owner = parent.owner();
        let parent_flags = parent.flags().clone();
        let refund = region.owner().player().map(|owner| (owner, region.area()));

        let world_data = self.world_mut(world)?;
        world_data.detach_from_top_level(id);
        if let Some(region) = world_data.region_mut(id) {
            region.set_parent(Some(parent_id));
            let priority = region.priority().max(parent_priority);
            region.set_priority(priority);
            if priority == parent_priority {
                region.flags_mut().copy_flags_from(&parent_flags);
            }
            region.flags_mut().set_owner(parent_owner);
        }
        if let Some(parent) = world_data.region_mut(parent_id) {
            parent.children_mut().push(id);
        }

        // It no longer counts as a claim of its own.
        if let Some((owner, area)) = refund {
            self.credit(owner, area);
        }
        Ok(parent_id)
    }
}

impl DataManager {
    /// Shapes an admin region between two corners. Without explicit heights it spans the
    /// world's claim height. Nothing is stored until [`DataManager::register_region`].
    pub fn create_admin_region(
        &self,
        world: &str,
        a: Point,
        b: Point,
        height: Option<(i32, i32)>,
    ) -> PendingRegion {
        let (bottom, top) = height.unwrap_or_else(|| {
            Dimension::of(world).claim_height(&self.settings)
        });
        PendingRegion::new(world, Bounds::from_corners_with_height(a, b, bottom, top))
    }

    /// Names and stores a shaped region, optionally as the child of `parent`. `force` skips
    /// the collision check.
    pub fn register_region(
        &self,
        pending: PendingRegion,
        name: &str,
        priority: i32,
        parent: Option<&str>,
        force: bool,
        actor: Option<&Actor>,
    ) -> Result<RegionId, ClaimError> {
        let world = pending.world.clone();
        let result = self
            .state()
            .register_region(pending, name, priority, parent, force);
        self.report(actor, &result, |id| {
            format!("Registered region '{name}' ({id}) in '{world}'")
        });
        result
    }

    pub fn rename_region(
        &self,
        world: &str,
        id: RegionId,
        name: &str,
        actor: Option<&Actor>,
    ) -> Result<(), ClaimError> {
        let result = self.state().rename_region(world, id, name);
        self.report(actor, &result, |_| format!("Renamed {id} to '{name}'"));
        result
    }

    /// Changes a region's priority. Children below the new value are raised with it, their
    /// flags are not re-synchronised.
    pub fn set_priority(
        &self,
        world: &str,
        id: RegionId,
        priority: i32,
        actor: Option<&Actor>,
    ) -> Result<(), ClaimError> {
        let result = self.state().set_priority(world, id, priority);
        self.report(actor, &result, |_| format!("Priority of {id} set to {priority}"));
        result
    }

    /// Turns a top-level region into a subdivision of `parent`. `force` skips the check
    /// against the parent's other children.
    pub fn set_parent(
        &self,
        world: &str,
        id: RegionId,
        parent: &str,
        force: bool,
        actor: Option<&Actor>,
    ) -> Result<RegionId, ClaimError> {
        let result = self.state().associate(world, id, parent, force);
        self.report(actor, &result, |parent_id| {
            format!("{id} is now a subdivision of {parent_id}")
        });
        result
    }
}
