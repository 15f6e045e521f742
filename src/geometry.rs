//! Integer block coordinates and the axis-aligned boxes regions are made of.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A block position in a world.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// One of the six faces of a box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Towards negative z.
    North,
    /// Towards positive z.
    South,
    /// Towards positive x.
    East,
    /// Towards negative x.
    West,
    Up,
    Down,
}

impl Direction {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "north" | "n" => Some(Direction::North),
            "south" | "s" => Some(Direction::South),
            "east" | "e" => Some(Direction::East),
            "west" | "w" => Some(Direction::West),
            "up" | "u" => Some(Direction::Up),
            "down" | "d" => Some(Direction::Down),
            _ => None,
        }
    }
}

/// An axis-aligned box with inclusive bounds. `min <= max` on every axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    /// Builds the box spanned by two opposite corners, in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            min: Point::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Same as [`Bounds::from_corners`] but the vertical range is taken from `min_y..=max_y`.
    pub fn from_corners_with_height(a: Point, b: Point, min_y: i32, max_y: i32) -> Self {
        let mut bounds = Self::from_corners(a, b);
        bounds.min.y = min_y.min(max_y);
        bounds.max.y = min_y.max(max_y);
        bounds
    }

    pub fn contains(&self, p: Point) -> bool {
        self.contains_ignore_y(p) && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn contains_ignore_y(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.z >= self.min.z && p.z <= self.max.z
    }

    /// Whether `other` lies completely inside this box.
    pub fn contains_bounds(&self, other: &Bounds) -> bool {
        self.contains(other.min) && self.contains(other.max)
    }

    /// Box-box intersection on all three axes.
    pub fn overlaps(&self, other: &Bounds) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    pub fn width(&self) -> i64 {
        self.max.x as i64 - self.min.x as i64 + 1
    }

    pub fn length(&self) -> i64 {
        self.max.z as i64 - self.min.z as i64 + 1
    }

    pub fn height(&self) -> i64 {
        self.max.y as i64 - self.min.y as i64 + 1
    }

    /// Planar area. The vertical extent never counts towards it.
    pub fn area(&self) -> i64 {
        self.width() * self.length()
    }

    /// Length of the shortest edge, in blocks.
    pub fn shortest_side(&self) -> i64 {
        self.width().min(self.length()).min(self.height())
    }

    /// Moves the nearest of min/max on each axis to `to`. A target outside the box always
    /// snaps the face on its own side, so the box only grows that way.
    pub fn with_vertex_moved(&self, to: Point) -> Bounds {
        fn snap(min: i32, max: i32, to: i32) -> (i32, i32) {
            let to_min = (to as i64 - min as i64).abs();
            let to_max = (to as i64 - max as i64).abs();
            if to_min < to_max {
                (to, max)
            } else {
                (min, to)
            }
        }

        let (min_x, max_x) = snap(self.min.x, self.max.x, to.x);
        let (min_y, max_y) = snap(self.min.y, self.max.y, to.y);
        let (min_z, max_z) = snap(self.min.z, self.max.z, to.z);
        Bounds::from_corners(
            Point::new(min_x, min_y, min_z),
            Point::new(max_x, max_y, max_z),
        )
    }

    /// Pushes one face outwards by `amount` blocks (inwards when negative).
    pub fn expanded(&self, direction: Direction, amount: i32) -> Bounds {
        let mut min = self.min;
        let mut max = self.max;
        match direction {
            Direction::North => min.z = min.z.saturating_sub(amount),
            Direction::South => max.z = max.z.saturating_add(amount),
            Direction::East => max.x = max.x.saturating_add(amount),
            Direction::West => min.x = min.x.saturating_sub(amount),
            Direction::Up => max.y = max.y.saturating_add(amount),
            Direction::Down => min.y = min.y.saturating_sub(amount),
        }
        Bounds::from_corners(min, max)
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_corners_normalizes() {
        let bounds = Bounds::from_corners(Point::new(10, 70, -5), Point::new(-3, 60, 4));
        assert_eq!(bounds.min, Point::new(-3, 60, -5));
        assert_eq!(bounds.max, Point::new(10, 70, 4));
    }

    #[test]
    fn test_area_ignores_height() {
        let low = Bounds::from_corners(Point::new(0, 0, 0), Point::new(9, 0, 9));
        let tall = Bounds::from_corners(Point::new(0, -64, 0), Point::new(9, 319, 9));
        assert_eq!(low.area(), 100);
        assert_eq!(tall.area(), 100);
    }

    #[test]
    fn test_contains_is_inclusive() {
        let bounds = Bounds::from_corners(Point::new(0, 0, 0), Point::new(4, 4, 4));
        assert!(bounds.contains(Point::new(0, 0, 0)));
        assert!(bounds.contains(Point::new(4, 4, 4)));
        assert!(!bounds.contains(Point::new(5, 4, 4)));
        assert!(!bounds.contains(Point::new(2, 5, 2)));
        assert!(bounds.contains_ignore_y(Point::new(2, 500, 2)));
    }

    #[test]
    fn test_overlaps_touching_edges() {
        let a = Bounds::from_corners(Point::new(0, 0, 0), Point::new(4, 4, 4));
        let b = Bounds::from_corners(Point::new(4, 0, 4), Point::new(8, 4, 8));
        let c = Bounds::from_corners(Point::new(5, 0, 0), Point::new(8, 4, 4));
        let above = Bounds::from_corners(Point::new(0, 5, 0), Point::new(4, 9, 4));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(!a.overlaps(&above));
    }

    #[test]
    fn test_move_vertex_snaps_nearest_face() {
        let bounds = Bounds::from_corners(Point::new(0, 0, 0), Point::new(10, 10, 10));
        let moved = bounds.with_vertex_moved(Point::new(12, 10, -2));
        assert_eq!(moved.min, Point::new(0, 0, -2));
        assert_eq!(moved.max, Point::new(12, 10, 10));
    }

    #[test]
    fn test_move_vertex_beyond_min_face_extends() {
        let bounds = Bounds::from_corners(Point::new(0, 0, 0), Point::new(10, 10, 10));
        let moved = bounds.with_vertex_moved(Point::new(-4, 10, 10));
        assert_eq!(moved.min.x, -4);
        assert_eq!(moved.max.x, 10);

        // Inside the box the nearer face wins.
        let moved = bounds.with_vertex_moved(Point::new(3, 10, 10));
        assert_eq!(moved.min.x, 3);
        assert_eq!(moved.max.x, 10);
    }

    #[test]
    fn test_expand_each_direction() {
        let bounds = Bounds::from_corners(Point::new(0, 0, 0), Point::new(9, 9, 9));
        assert_eq!(bounds.expanded(Direction::East, 5).max.x, 14);
        assert_eq!(bounds.expanded(Direction::West, 5).min.x, -5);
        assert_eq!(bounds.expanded(Direction::North, 2).min.z, -2);
        assert_eq!(bounds.expanded(Direction::South, -3).max.z, 6);
        assert_eq!(bounds.expanded(Direction::Up, 1).max.y, 10);
        assert_eq!(bounds.expanded(Direction::Down, 1).min.y, -1);
    }
}
