//! Regions: flag containers with a box, a priority and an optional parent.

pub mod lookup;

use std::collections::HashMap;
use std::fmt;

use crate::flags::{Flag, FlagContainer, Owner};
use crate::geometry::{Bounds, Point};

pub use lookup::RegionLookupTable;

pub const MAX_PRIORITY: u8 = 127;

/// Every region of a world, top-level and nested, addressed by id.
pub type Regions = HashMap<RegionId, Region>;

/// Index of a region inside its world. Never reused within a world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegionId(pub u64);

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Region {
    id: RegionId,
    world: String,
    name: Option<String>,
    priority: u8,
    bounds: Bounds,
    parent: Option<RegionId>,
    children: Vec<RegionId>,
    recently_stolen: bool,
    container: FlagContainer,
}

impl Region {
    pub(crate) fn new(id: RegionId, world: &str, bounds: Bounds, container: FlagContainer) -> Self {
        Self {
            id,
            world: world.to_string(),
            name: None,
            priority: 0,
            bounds,
            parent: None,
            children: Vec::new(),
            recently_stolen: false,
            container,
        }
    }

    pub fn id(&self) -> RegionId {
        self.id
    }

    pub fn world(&self) -> &str {
        &self.world
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub(crate) fn set_priority(&mut self, priority: u8) {
        self.priority = priority.min(MAX_PRIORITY);
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub(crate) fn set_bounds(&mut self, bounds: Bounds) {
        self.bounds = bounds;
    }

    pub fn parent(&self) -> Option<RegionId> {
        self.parent
    }

    pub fn has_parent(&self) -> bool {
        self.parent.is_some()
    }

    pub(crate) fn set_parent(&mut self, parent: Option<RegionId>) {
        self.parent = parent;
    }

    pub fn children(&self) -> &[RegionId] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<RegionId> {
        &mut self.children
    }

    pub fn recently_stolen(&self) -> bool {
        self.recently_stolen
    }

    pub(crate) fn set_recently_stolen(&mut self, stolen: bool) {
        self.recently_stolen = stolen;
    }

    pub fn flags(&self) -> &FlagContainer {
        &self.container
    }

    pub(crate) fn flags_mut(&mut self) -> &mut FlagContainer {
        &mut self.container
    }

    pub fn owner(&self) -> Owner {
        self.container.owner()
    }

    pub fn is_admin(&self) -> bool {
        self.container.is_admin()
    }

    pub fn allows_overlap(&self) -> bool {
        self.container.is_allowed(Flag::AllowOverlap)
    }

    pub fn area(&self) -> i64 {
        self.bounds.area()
    }

    pub fn contains(&self, p: Point) -> bool {
        self.bounds.contains(p)
    }

    pub fn contains_ignore_y(&self, p: Point) -> bool {
        self.bounds.contains_ignore_y(p)
    }

    pub fn contains_region(&self, other: &Region) -> bool {
        self.bounds.contains_bounds(&other.bounds)
    }

    pub fn overlaps(&self, other: &Region) -> bool {
        self.bounds.overlaps(&other.bounds)
    }

    /// Whether `self` wins over `other` at a shared point: higher priority first, then a
    /// subdivision over a top-level region.
    pub fn outranks(&self, other: &Region) -> bool {
        self.priority > other.priority
            || (self.priority == other.priority && self.has_parent() && !other.has_parent())
    }

    /// A readable label for messages: the name if there is one, the id otherwise.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.id.to_string(),
        }
    }
}

/// An admin region that has been shaped but not registered yet. The caller can adjust its
/// flags and bounds before handing it to `DataManager::register_region`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingRegion {
    pub world: String,
    pub bounds: Bounds,
    pub flags: FlagContainer,
}

impl PendingRegion {
    pub fn new(world: &str, bounds: Bounds) -> Self {
        Self {
            world: world.to_string(),
            bounds,
            flags: FlagContainer::new(Owner::Admin),
        }
    }

    /// Replaces the vertical range.
    pub fn with_height(mut self, min_y: i32, max_y: i32) -> Self {
        self.bounds.min.y = min_y.min(max_y);
        self.bounds.max.y = min_y.max(max_y);
        self
    }
}
