//! Read-only queries. Regions are handed out as snapshots, the lock is never held by callers.

use super::DataManager;
use crate::flags::{FlagContainer, Owner, TrustLevel};
use crate::geometry::{Bounds, Point};
use crate::player::{Actor, PlayerId};
use crate::region::{Region, RegionId};
use crate::world::WorldData;

/// The effective flags at `p`: per flag, the value of the highest-priority region that sets
/// it, then the world's global value. The highest region's owner owns the result and every
/// other owner becomes a co-owner.
///
/// Returns `None` when nothing applies at `p`.
pub fn merge_flags(world: &WorldData, p: Point) -> Option<FlagContainer> {
    let mut matching = world.lookup().regions_at(world.regions(), p);
    if matching.is_empty() {
        return (!world.global().is_empty()).then(|| world.global().clone());
    }
    matching.sort_by(|a, b| {
        b.priority()
            .cmp(&a.priority())
            .then(b.has_parent().cmp(&a.has_parent()))
    });

    let mut merged = FlagContainer::new(matching[0].owner());
    // Owners of the regions underneath the winner become co-owners.
    for region in &matching[1..] {
        if let Owner::Player(owner) = region.owner() {
            merged.add_co_owner(owner);
        }
    }
    for region in &matching {
        for co_owner in region.flags().co_owners() {
            merged.add_co_owner(*co_owner);
        }
        merged.inherit(region.flags());
    }
    merged.inherit(world.global());
    Some(merged)
}

impl DataManager {
    fn with_world<T>(&self, world: &str, query: impl FnOnce(&WorldData) -> T) -> Option<T> {
        self.state().world(world).ok().map(query)
    }

    fn snapshots<'a>(regions: impl IntoIterator<Item = &'a Region>) -> Vec<Region> {
        regions.into_iter().cloned().collect()
    }

    /// Every region containing `p`.
    pub fn regions_at(&self, world: &str, p: Point) -> Vec<Region> {
        self.with_world(world, |world| {
            Self::snapshots(world.lookup().regions_at(world.regions(), p))
        })
        .unwrap_or_default()
    }

    /// Every region whose column contains `p`.
    pub fn regions_at_ignore_y(&self, world: &str, p: Point) -> Vec<Region> {
        self.with_world(world, |world| {
            Self::snapshots(world.lookup().regions_at_ignore_y(world.regions(), p))
        })
        .unwrap_or_default()
    }

    /// Top-level regions containing `p`.
    pub fn parent_regions_at(&self, world: &str, p: Point) -> Vec<Region> {
        self.with_world(world, |world| {
            Self::snapshots(world.lookup().parent_regions_at(world.regions(), p))
        })
        .unwrap_or_default()
    }

    pub fn highest_priority_region_at(&self, world: &str, p: Point) -> Option<Region> {
        self.with_world(world, |world| {
            world
                .lookup()
                .highest_priority_at(world.regions(), p)
                .cloned()
        })
        .flatten()
    }

    pub fn highest_priority_region_at_ignore_y(&self, world: &str, p: Point) -> Option<Region> {
        self.with_world(world, |world| {
            world
                .lookup()
                .highest_priority_at_ignore_y(world.regions(), p)
                .cloned()
        })
        .flatten()
    }

    /// Regions overlapping `bounds`.
    pub fn collisions(&self, world: &str, bounds: &Bounds) -> Vec<Region> {
        self.with_world(world, |world| {
            world
                .lookup()
                .collisions(world.regions(), bounds, None)
                .into_iter()
                .filter_map(|id| world.region(id).cloned())
                .collect()
        })
        .unwrap_or_default()
    }

    /// See [`merge_flags`].
    pub fn flags_at(&self, world: &str, p: Point) -> Option<FlagContainer> {
        self.with_world(world, |world| merge_flags(world, p)).flatten()
    }

    /// Trust of `actor` at `p`. Unprotected places grant everything.
    pub fn trust_level_at(&self, world: &str, p: Point, actor: &Actor) -> TrustLevel {
        let actor = self.effective_actor(actor);
        match self.flags_at(world, p) {
            Some(flags) => flags.trust_level(&actor),
            None => TrustLevel::Management,
        }
    }

    pub fn region(&self, world: &str, id: RegionId) -> Option<Region> {
        self.with_world(world, |world| world.region(id).cloned())
            .flatten()
    }

    pub fn region_by_name(&self, world: &str, name: &str) -> Option<Region> {
        self.with_world(world, |world| world.region_by_name(name).cloned())
            .flatten()
    }

    /// Top-level regions in creation order.
    pub fn top_level_regions(&self, world: &str) -> Vec<Region> {
        self.with_world(world, |world| {
            Self::snapshots(world.top_level().iter().filter_map(|id| world.region(*id)))
        })
        .unwrap_or_default()
    }

    pub fn children_of(&self, world: &str, id: RegionId) -> Vec<RegionId> {
        self.with_world(world, |world| {
            world
                .region(id)
                .map(|region| region.children().to_vec())
                .unwrap_or_default()
        })
        .unwrap_or_default()
    }

    /// Top-level claims of `player` across every world.
    pub fn regions_owned_by(&self, player: PlayerId) -> Vec<Region> {
        let state = self.state();
        let mut owned: Vec<Region> = state
            .worlds
            .values()
            .flat_map(|world| world.top_level().iter().filter_map(|id| world.region(*id)))
            .filter(|region| region.owner() == Owner::Player(player))
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.world().cmp(b.world()).then(a.id().cmp(&b.id())));
        owned
    }

    /// How many lookup chains of `world` still reference `id`. Zero once a region is gone.
    pub fn lookup_references(&self, world: &str, id: RegionId) -> usize {
        self.with_world(world, |world| world.lookup().references(id))
            .unwrap_or(0)
    }

    pub fn world_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state().worlds.keys().cloned().collect();
        names.sort();
        names
    }
}
