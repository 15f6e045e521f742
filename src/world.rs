//! Per-world claim data: the region arena, its lookup table and the world's global flags.

use std::collections::VecDeque;

use crate::config::Settings;
use crate::flags::FlagContainer;
use crate::geometry::Bounds;
use crate::region::{Region, RegionId, RegionLookupTable, Regions};

/// Decides the default vertical range of new claims.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dimension {
    Overworld,
    Nether,
    End,
}

impl Dimension {
    /// Worlds follow the usual `<level>_nether` / `<level>_the_end` naming.
    pub fn of(world: &str) -> Self {
        if world.ends_with("_nether") {
            Dimension::Nether
        } else if world.ends_with("_the_end") {
            Dimension::End
        } else {
            Dimension::Overworld
        }
    }

    /// Inclusive `(bottom, top)` of claims created in this dimension.
    pub fn claim_height(self, settings: &Settings) -> (i32, i32) {
        match self {
            Dimension::Nether => (settings.nether_floor, settings.nether_ceiling - 1),
            Dimension::Overworld | Dimension::End => {
                (settings.overworld_floor, settings.world_height - 1)
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct WorldData {
    name: String,
    dimension: Dimension,
    regions: Regions,
    /// Regions without a parent, in creation order.
    top_level: Vec<RegionId>,
    lookup: RegionLookupTable,
    global: FlagContainer,
    next_id: u64,
}

impl WorldData {
    pub fn new(name: &str, settings: &Settings) -> Self {
        Self {
            name: name.to_string(),
            dimension: Dimension::of(name),
            regions: Regions::new(),
            top_level: Vec::new(),
            lookup: RegionLookupTable::new(settings.lookup_initial_capacity, settings.lookup_scale),
            global: FlagContainer::default(),
            next_id: 1,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn regions(&self) -> &Regions {
        &self.regions
    }

    pub fn region(&self, id: RegionId) -> Option<&Region> {
        self.regions.get(&id)
    }

    pub(crate) fn region_mut(&mut self, id: RegionId) -> Option<&mut Region> {
        self.regions.get_mut(&id)
    }

    pub fn top_level(&self) -> &[RegionId] {
        &self.top_level
    }

    pub fn lookup(&self) -> &RegionLookupTable {
        &self.lookup
    }

    pub fn global(&self) -> &FlagContainer {
        &self.global
    }

    pub(crate) fn global_mut(&mut self) -> &mut FlagContainer {
        &mut self.global
    }

    /// The id the next region will get.
    pub fn next_id(&self) -> RegionId {
        RegionId(self.next_id)
    }

    /// Makes sure ids below `next` are never handed out again.
    pub(crate) fn reserve_ids(&mut self, next: RegionId) {
        self.next_id = self.next_id.max(next.0);
    }

    pub(crate) fn allocate_id(&mut self) -> RegionId {
        let id = RegionId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Names are unique per world, compared without case.
    pub fn region_by_name(&self, name: &str) -> Option<&Region> {
        self.regions
            .values()
            .find(|region| region.name().is_some_and(|n| n.eq_ignore_ascii_case(name)))
    }

    /// Puts a region in the arena and, if it has no parent, at the end of the top-level list.
    /// Does not index it.
    pub(crate) fn insert(&mut self, region: Region) {
        let id = region.id();
        if id.0 >= self.next_id {
            self.next_id = id.0 + 1;
        }
        if !region.has_parent() && !self.top_level.contains(&id) {
            self.top_level.push(id);
        }
        self.regions.insert(id, region);
    }

    /// Takes a region out of the arena and the top-level list. Does not unindex it.
    pub(crate) fn take(&mut self, id: RegionId) -> Option<Region> {
        self.top_level.retain(|top| *top != id);
        self.regions.remove(&id)
    }

    pub(crate) fn detach_from_top_level(&mut self, id: RegionId) {
        self.top_level.retain(|top| *top != id);
    }

    pub(crate) fn index(&mut self, id: RegionId) {
        self.lookup.add(id, &self.regions);
    }

    pub(crate) fn unindex(&mut self, id: RegionId) {
        if let Some(region) = self.regions.get(&id) {
            self.lookup.remove(region);
        }
    }

    /// Moves a region to `bounds` and re-indexes it.
    pub(crate) fn move_region(&mut self, id: RegionId, bounds: Bounds) {
        let Some(region) = self.regions.get_mut(&id) else {
            return;
        };
        let old = region.bounds();
        region.set_bounds(bounds);
        self.lookup.re_add(id, &old, &self.regions);
    }

    /// Rebuilds the lookup table from the arena, children included.
    pub fn rebuild_lookup(&mut self) {
        self.lookup.rebuild(&self.regions);
    }

    /// Every region below `id`, breadth first.
    pub fn descendants(&self, id: RegionId) -> Vec<RegionId> {
        let mut found = Vec::new();
        let mut queue: VecDeque<RegionId> = VecDeque::from([id]);
        while let Some(next) = queue.pop_front() {
            if let Some(region) = self.regions.get(&next) {
                for child in region.children() {
                    found.push(*child);
                    queue.push_back(*child);
                }
            }
        }
        found
    }

    /// Every region above `id`, nearest first.
    pub fn ancestors(&self, id: RegionId) -> Vec<RegionId> {
        let mut found = Vec::new();
        let mut next = self.regions.get(&id).and_then(Region::parent);
        while let Some(parent) = next {
            if found.contains(&parent) {
                break;
            }
            found.push(parent);
            next = self.regions.get(&parent).and_then(Region::parent);
        }
        found
    }

    /// Whether `a` and `b` sit on the same branch of the hierarchy.
    pub fn are_related(&self, a: RegionId, b: RegionId) -> bool {
        self.ancestors(a).contains(&b) || self.ancestors(b).contains(&a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn world() -> WorldData {
        WorldData::new("world", &Settings::default())
    }

    fn region(world: &mut WorldData, parent: Option<RegionId>) -> RegionId {
        let id = world.allocate_id();
        let bounds = Bounds::from_corners(Point::new(0, 0, 0), Point::new(9, 9, 9));
        let mut region = Region::new(id, "world", bounds, FlagContainer::default());
        region.set_parent(parent);
        world.insert(region);
        if let Some(parent) = parent {
            world.region_mut(parent).unwrap().children_mut().push(id);
        }
        world.index(id);
        id
    }

    #[test]
    fn test_dimension_of() {
        assert_eq!(Dimension::of("world"), Dimension::Overworld);
        assert_eq!(Dimension::of("world_nether"), Dimension::Nether);
        assert_eq!(Dimension::of("world_the_end"), Dimension::End);
        let settings = Settings::default();
        assert_eq!(Dimension::Nether.claim_height(&settings), (0, 127));
        assert_eq!(Dimension::Overworld.claim_height(&settings), (-64, 319));
    }

    #[test]
    fn test_children_stay_off_top_level() {
        let mut world = world();
        let parent = region(&mut world, None);
        let child = region(&mut world, Some(parent));

        assert_eq!(world.top_level(), &[parent]);
        assert_eq!(world.descendants(parent), vec![child]);
        assert_eq!(world.ancestors(child), vec![parent]);
        assert!(world.are_related(parent, child));
    }

    #[test]
    fn test_rebuild_lookup_includes_children() {
        let mut world = world();
        let parent = region(&mut world, None);
        let child = region(&mut world, Some(parent));
        world.rebuild_lookup();

        let found = world
            .lookup()
            .regions_at(world.regions(), Point::new(1, 1, 1))
            .len();
        assert_eq!(found, 2);
        assert_eq!(world.lookup().references(child), 1);
    }

    #[test]
    fn test_region_by_name_ignores_case() {
        let mut world = world();
        let id = region(&mut world, None);
        world.region_mut(id).unwrap().set_name(Some("Spawn".into()));
        assert_eq!(world.region_by_name("spawn").map(Region::id), Some(id));
        assert!(world.region_by_name("market").is_none());
    }
}
