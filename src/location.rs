use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A cell coordinate on the map plane.
///
/// `y` runs "up" the map (the top neighbour of `(x, y)` is `(x, y + 1)`).
/// In world space the plane sits at height zero, so the cell maps to
/// `(x, 0, y)`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Location {
    x: i32,
    y: i32,
}

impl Location {
    pub const fn new(x: i32, y: i32) -> Self {
        Location { x, y }
    }

    #[inline]
    pub fn x(self) -> i32 {
        self.x
    }

    #[inline]
    pub fn y(self) -> i32 {
        self.y
    }

    /// The adjacent coordinate in the given direction. May be out of bounds.
    #[inline]
    pub fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.offset();
        Location::new(self.x + dx, self.y + dy)
    }

    /// Integer world-space position of the cell origin.
    #[inline]
    pub fn world_position(self) -> IVec3 {
        IVec3::new(self.x, 0, self.y)
    }

    /// World-space position of the cell as floats.
    #[inline]
    pub fn world_center(self) -> Vec3 {
        self.world_position().as_vec3()
    }

    pub fn manhattan_distance(self, other: Self) -> u32 {
        (self.x - other.x).unsigned_abs() + (self.y - other.y).unsigned_abs()
    }

    /// Sum of the first two world-space components of the offset.
    ///
    /// The second component is the plane height, which is always zero, so
    /// this only measures travel along x. Kept because route costs are
    /// defined in terms of it; see `DistanceMetric::Legacy`.
    pub fn legacy_distance(self, other: Self) -> u32 {
        let a = self.world_position();
        let b = other.world_position();
        (a.x - b.x).unsigned_abs() + (a.y - b.y).unsigned_abs()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// The four cardinal neighbour slots of a cell.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Top,
    Right,
    Bottom,
}

impl Direction {
    /// Neighbour slot order used everywhere a cell's neighbours are listed.
    pub const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Top,
        Direction::Right,
        Direction::Bottom,
    ];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Direction::Left => 0,
            Direction::Top => 1,
            Direction::Right => 2,
            Direction::Bottom => 3,
        }
    }

    #[inline]
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::Left => (-1, 0),
            Direction::Top => (0, 1),
            Direction::Right => (1, 0),
            Direction::Bottom => (0, -1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_follow_map_axes() {
        let loc = Location::new(3, 3);
        assert_eq!(loc.step(Direction::Left), Location::new(2, 3));
        assert_eq!(loc.step(Direction::Top), Location::new(3, 4));
        assert_eq!(loc.step(Direction::Right), Location::new(4, 3));
        assert_eq!(loc.step(Direction::Bottom), Location::new(3, 2));
    }

    #[test]
    fn legacy_distance_only_measures_x() {
        let a = Location::new(1, 1);
        let b = Location::new(4, 9);
        assert_eq!(a.legacy_distance(b), 3);
        assert_eq!(a.manhattan_distance(b), 11);
        assert_eq!(Location::new(0, 0).legacy_distance(Location::new(0, 7)), 0);
    }

    #[test]
    fn world_position_lies_on_ground_plane() {
        assert_eq!(Location::new(2, 5).world_position(), IVec3::new(2, 0, 5));
    }
}
