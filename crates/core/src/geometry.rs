use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// A block position within a named world.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub world: String,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Location {
    pub fn new(world: impl Into<String>, x: i32, y: i32, z: i32) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }

    pub fn same_world(&self, other: &Location) -> bool {
        self.world == other.world
    }

    /// Squared euclidean distance. Infinite (None) across worlds.
    pub fn distance_squared(&self, other: &Location) -> Option<f64> {
        if !self.same_world(other) {
            return None;
        }
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        let dz = f64::from(self.z - other.z);
        Some(dx * dx + dy * dy + dz * dz)
    }

    /// Chunk coordinates (16x16 block columns).
    pub fn chunk(&self) -> (i32, i32) {
        (self.x >> 4, self.z >> 4)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{},{},{}", self.world, self.x, self.y, self.z)
    }
}

/// Direction a placed panel faces. Panels are only valid on the four
/// horizontal directions; Up/Down exist so placement input can be
/// validated rather than silently coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Facing {
    North,
    South,
    East,
    West,
    Up,
    Down,
}

impl Facing {
    pub fn is_horizontal(&self) -> bool {
        !matches!(self, Facing::Up | Facing::Down)
    }

    pub fn ordinal(&self) -> i64 {
        match self {
            Facing::North => 0,
            Facing::South => 1,
            Facing::East => 2,
            Facing::West => 3,
            Facing::Up => 4,
            Facing::Down => 5,
        }
    }

    pub fn from_ordinal(ordinal: i64) -> Result<Self, CoreError> {
        match ordinal {
            0 => Ok(Facing::North),
            1 => Ok(Facing::South),
            2 => Ok(Facing::East),
            3 => Ok(Facing::West),
            4 => Ok(Facing::Up),
            5 => Ok(Facing::Down),
            other => Err(CoreError::UnknownFacing(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_within_world() {
        let a = Location::new("world", 0, 64, 0);
        let b = Location::new("world", 3, 64, 4);
        assert_eq!(a.distance_squared(&b), Some(25.0));
    }

    #[test]
    fn distance_across_worlds_is_none() {
        let a = Location::new("world", 0, 64, 0);
        let b = Location::new("nether", 0, 64, 0);
        assert_eq!(a.distance_squared(&b), None);
    }

    #[test]
    fn chunk_boundaries() {
        assert_eq!(Location::new("w", 15, 0, 15).chunk(), (0, 0));
        assert_eq!(Location::new("w", 16, 0, 0).chunk(), (1, 0));
        assert_eq!(Location::new("w", -1, 0, -16).chunk(), (-1, -1));
    }

    #[test]
    fn facing_ordinal_round_trip() {
        for facing in [
            Facing::North,
            Facing::South,
            Facing::East,
            Facing::West,
            Facing::Up,
            Facing::Down,
        ] {
            assert_eq!(Facing::from_ordinal(facing.ordinal()).unwrap(), facing);
        }
        assert!(Facing::from_ordinal(6).is_err());
    }

    #[test]
    fn vertical_facings_rejected_for_panels() {
        assert!(Facing::East.is_horizontal());
        assert!(!Facing::Up.is_horizontal());
        assert!(!Facing::Down.is_horizontal());
    }
}
