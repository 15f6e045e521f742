//! A scaled 2D spatial hash over the regions of one world.
//!
//! The world is cut into square cells of `2^scale` blocks on the x and z axes. A region is
//! referenced once in the chain of every cell its box touches. Cells are hashed into a fixed
//! number of chains, so a chain is only a coarse filter: every query re-checks the real,
//! unscaled bounds of the candidates it finds.
//!
//! The table stores ids only. Bounds, priorities and parents are read from the world's
//! [`Regions`] at query time, which is why a resize must go through [`RegionLookupTable::re_add`]
//! with the bounds the region had *before* the change.

use std::collections::BTreeSet;

use log::debug;

use super::{Region, RegionId, Regions};
use crate::geometry::{Bounds, Point};

/// Chains are grown once they hold more than this many references per chain on average.
const LOAD_FACTOR: f64 = 0.75;
/// Growth factor applied to the chain count when inflating.
const GROWTH_FACTOR: f64 = 1.35;

#[derive(Clone, Debug)]
pub struct RegionLookupTable {
    buckets: Vec<Vec<RegionId>>,
    /// Total number of references over all chains.
    size: usize,
    scale: u32,
}

impl RegionLookupTable {
    pub fn new(capacity: usize, scale: u32) -> Self {
        Self {
            buckets: vec![Vec::new(); capacity.max(1)],
            size: 0,
            scale: scale.min(31),
        }
    }

    /// Number of references held, a region spanning several cells counts several times.
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Number of chains.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Combines the scaled coordinates into a 64 bit key, drops the sign bit and folds it into
    /// the chain count. Negative coordinates land on valid chains too.
    fn bucket_index(&self, cell_x: i32, cell_z: i32) -> usize {
        let key = ((cell_x as i64) << 32) | (cell_z as i64 & 0xFFFF_FFFF);
        ((key & i64::MAX) % self.buckets.len() as i64) as usize
    }

    fn cells(&self, bounds: &Bounds) -> impl Iterator<Item = (i32, i32)> {
        let (min_x, max_x) = (bounds.min.x >> self.scale, bounds.max.x >> self.scale);
        let (min_z, max_z) = (bounds.min.z >> self.scale, bounds.max.z >> self.scale);
        (min_x..=max_x).flat_map(move |x| (min_z..=max_z).map(move |z| (x, z)))
    }

    fn bucket_at(&self, p: Point) -> &[RegionId] {
        let index = self.bucket_index(p.x >> self.scale, p.z >> self.scale);
        &self.buckets[index]
    }

    fn insert(&mut self, id: RegionId, bounds: &Bounds) {
        let cells: Vec<(i32, i32)> = self.cells(bounds).collect();
        for (x, z) in cells {
            let index = self.bucket_index(x, z);
            let bucket = &mut self.buckets[index];
            if !bucket.contains(&id) {
                bucket.push(id);
                self.size += 1;
            }
        }
    }

    fn remove_bounds(&mut self, id: RegionId, bounds: &Bounds) {
        let cells: Vec<(i32, i32)> = self.cells(bounds).collect();
        for (x, z) in cells {
            let index = self.bucket_index(x, z);
            let bucket = &mut self.buckets[index];
            if let Some(position) = bucket.iter().position(|entry| *entry == id) {
                bucket.swap_remove(position);
                self.size -= 1;
            }
        }
    }

    /// References `id` in every cell of its current bounds, growing the table if it got too
    /// crowded. Ids missing from `regions` are ignored.
    pub fn add(&mut self, id: RegionId, regions: &Regions) {
        let Some(region) = regions.get(&id) else {
            debug!("Ignoring lookup insert of unknown region {id}");
            return;
        };
        self.insert(id, &region.bounds());
        while self.size as f64 > self.buckets.len() as f64 * LOAD_FACTOR {
            self.inflate(regions);
        }
    }

    /// Drops every reference to `region`, using its current bounds.
    pub fn remove(&mut self, region: &Region) {
        self.remove_bounds(region.id(), &region.bounds());
    }

    /// Re-indexes a region whose bounds already changed. `old_bounds` must be the bounds it was
    /// indexed with.
    pub fn re_add(&mut self, id: RegionId, old_bounds: &Bounds, regions: &Regions) {
        self.remove_bounds(id, old_bounds);
        self.add(id, regions);
    }

    /// Empties the table and indexes every region of `regions`.
    pub fn rebuild(&mut self, regions: &Regions) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.size = 0;
        let mut ids: Vec<RegionId> = regions.keys().copied().collect();
        ids.sort();
        for id in ids {
            self.add(id, regions);
        }
    }

    fn inflate(&mut self, regions: &Regions) {
        let distinct: BTreeSet<RegionId> = self.buckets.iter().flatten().copied().collect();
        let old_capacity = self.buckets.len();
        let new_capacity = ((old_capacity as f64 * GROWTH_FACTOR).ceil() as usize).max(old_capacity + 1);

        self.buckets = vec![Vec::new(); new_capacity];
        self.size = 0;
        for id in distinct {
            if let Some(region) = regions.get(&id) {
                self.insert(id, &region.bounds());
            }
        }
        debug!("Inflated region lookup table from {old_capacity} to {new_capacity} chains");
    }

    /// How many chains reference `id`.
    pub fn references(&self, id: RegionId) -> usize {
        self.buckets
            .iter()
            .filter(|bucket| bucket.contains(&id))
            .count()
    }

    /// Every region whose box contains `p`.
    pub fn regions_at<'a>(&self, regions: &'a Regions, p: Point) -> Vec<&'a Region> {
        self.bucket_at(p)
            .iter()
            .filter_map(|id| regions.get(id))
            .filter(|region| region.contains(p))
            .collect()
    }

    /// Every region whose box contains `p` on the x and z axes.
    pub fn regions_at_ignore_y<'a>(&self, regions: &'a Regions, p: Point) -> Vec<&'a Region> {
        self.bucket_at(p)
            .iter()
            .filter_map(|id| regions.get(id))
            .filter(|region| region.contains_ignore_y(p))
            .collect()
    }

    /// Top-level regions whose box contains `p`.
    pub fn parent_regions_at<'a>(&self, regions: &'a Regions, p: Point) -> Vec<&'a Region> {
        self.bucket_at(p)
            .iter()
            .filter_map(|id| regions.get(id))
            .filter(|region| !region.has_parent() && region.contains(p))
            .collect()
    }

    pub fn highest_priority_at<'a>(&self, regions: &'a Regions, p: Point) -> Option<&'a Region> {
        Self::highest(self.regions_at(regions, p))
    }

    pub fn highest_priority_at_ignore_y<'a>(
        &self,
        regions: &'a Regions,
        p: Point,
    ) -> Option<&'a Region> {
        Self::highest(self.regions_at_ignore_y(regions, p))
    }

    fn highest(candidates: Vec<&Region>) -> Option<&Region> {
        let mut best: Option<&Region> = None;
        for region in candidates {
            match best {
                Some(current) if !region.outranks(current) => {}
                _ => best = Some(region),
            }
        }
        best
    }

    /// Ids of the regions overlapping `bounds`, other than `exclude`, in id order.
    pub fn collisions(
        &self,
        regions: &Regions,
        bounds: &Bounds,
        exclude: Option<RegionId>,
    ) -> Vec<RegionId> {
        let mut found = BTreeSet::new();
        for (x, z) in self.cells(bounds) {
            for id in &self.buckets[self.bucket_index(x, z)] {
                if Some(*id) == exclude || found.contains(id) {
                    continue;
                }
                if let Some(other) = regions.get(id) {
                    if other.bounds().overlaps(bounds) {
                        found.insert(*id);
                    }
                }
            }
        }
        found.into_iter().collect()
    }
}
