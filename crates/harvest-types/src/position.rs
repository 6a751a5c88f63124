//! Grid Geometry
//!
//! Immutable 2D cell coordinates and the eight compass directions between
//! neighbouring cells.
//!
//! # Example
//!
//! ```
//! use harvest_types::{Direction, Position};
//!
//! let hall = Position::new(4, 4);
//! let mine = Position::new(5, 3);
//! assert!(hall.is_adjacent(&mine));
//! assert_eq!(hall.direction_to(&mine), Some(Direction::NorthEast));
//! assert_eq!(hall.chebyshev_distance(&Position::new(9, 6)), 5);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A cell on the map.
///
/// `y` grows southward, matching the actuator's screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the cell one step away in `direction`.
    pub fn step(&self, direction: Direction) -> Self {
        let (dx, dy) = direction.offset();
        Self::new(self.x + dx, self.y + dy)
    }

    /// True if `other` is this cell or one of its eight neighbours.
    pub fn is_adjacent(&self, other: &Position) -> bool {
        self.chebyshev_distance(other) <= 1
    }

    pub fn euclidean_distance(&self, other: &Position) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        dx.hypot(dy)
    }

    pub fn chebyshev_distance(&self, other: &Position) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Direction of a neighbouring cell, or `None` when `other` is not a
    /// distinct neighbour.
    pub fn direction_to(&self, other: &Position) -> Option<Direction> {
        Direction::from_offset(other.x - self.x, other.y - self.y)
    }

    /// Cantor pairing of the coordinates. Unique for non-negative cells.
    pub fn pairing_key(&self) -> i64 {
        let x = i64::from(self.x);
        let y = i64::from(self.y);
        (x + y) * (x + y + 1) / 2 + y
    }
}

impl Hash for Position {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_i64(self.pairing_key());
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Compass direction towards a neighbouring cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// `(dx, dy)` of one step in this direction.
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::NorthEast => (1, -1),
            Direction::East => (1, 0),
            Direction::SouthEast => (1, 1),
            Direction::South => (0, 1),
            Direction::SouthWest => (-1, 1),
            Direction::West => (-1, 0),
            Direction::NorthWest => (-1, -1),
        }
    }

    pub fn from_offset(dx: i32, dy: i32) -> Option<Self> {
        Direction::ALL.into_iter().find(|d| d.offset() == (dx, dy))
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::North => "north",
            Direction::NorthEast => "northeast",
            Direction::East => "east",
            Direction::SouthEast => "southeast",
            Direction::South => "south",
            Direction::SouthWest => "southwest",
            Direction::West => "west",
            Direction::NorthWest => "northwest",
        };
        f.write_str(name)
    }
}
