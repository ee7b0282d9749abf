// File: kannon-common/src/models/tracking.rs

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

/// One of the two independently actuated axes of the mount.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Pan,
    Tilt,
}

impl Axis {
    pub const ALL: [Axis; 2] = [Axis::Pan, Axis::Tilt];

    /// Position of this axis in per-axis arrays.
    pub fn index(self) -> usize {
        match self {
            Axis::Pan => 0,
            Axis::Tilt => 1,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Pan => write!(f, "pan"),
            Axis::Tilt => write!(f, "tilt"),
        }
    }
}

/// Direction of travel. Positive tilt is up, positive pan is right.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn axis(self) -> Axis {
        match self {
            Direction::Up | Direction::Down => Axis::Tilt,
            Direction::Left | Direction::Right => Axis::Pan,
        }
    }

    /// +1.0 or -1.0, the sign a velocity has when moving this way.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Up | Direction::Right => 1.0,
            Direction::Down | Direction::Left => -1.0,
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// The direction a non-zero velocity on `axis` moves in.
    /// Returns `None` for a zero velocity.
    pub fn of_velocity(axis: Axis, velocity: f64) -> Option<Direction> {
        if velocity > 0.0 {
            Some(match axis {
                Axis::Pan => Direction::Right,
                Axis::Tilt => Direction::Up,
            })
        } else if velocity < 0.0 {
            Some(match axis {
                Axis::Pan => Direction::Left,
                Axis::Tilt => Direction::Down,
            })
        } else {
            None
        }
    }

    pub fn index(self) -> usize {
        match self {
            Direction::Up => 0,
            Direction::Down => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
            Direction::Left => write!(f, "left"),
            Direction::Right => write!(f, "right"),
        }
    }
}

impl FromStr for Direction {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            _ => Err(format!("Unknown direction: {}", s)),
        }
    }
}

/// Which source drives the pan/tilt velocity.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrackingMode {
    #[default]
    Manual,
    Skeletal,
    Audible,
}

impl fmt::Display for TrackingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingMode::Manual => write!(f, "manual"),
            TrackingMode::Skeletal => write!(f, "skeletal"),
            TrackingMode::Audible => write!(f, "audible"),
        }
    }
}

impl FromStr for TrackingMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manual" => Ok(TrackingMode::Manual),
            "skeletal" => Ok(TrackingMode::Skeletal),
            "audible" => Ok(TrackingMode::Audible),
            _ => Err(format!("Unknown tracking mode: {}", s)),
        }
    }
}

/// Selects which of the (up to six) tracked bodies skeletal mode follows.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash, Default, PartialOrd, Ord)]
pub enum SkeletalTargetId {
    #[default]
    A,
    B,
    C,
    D,
    E,
    F,
}

impl SkeletalTargetId {
    pub const ALL: [SkeletalTargetId; 6] = [
        SkeletalTargetId::A,
        SkeletalTargetId::B,
        SkeletalTargetId::C,
        SkeletalTargetId::D,
        SkeletalTargetId::E,
        SkeletalTargetId::F,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// Body index in the sensor's body array.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::COUNT]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::COUNT - 1) % Self::COUNT]
    }
}

impl fmt::Display for SkeletalTargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            SkeletalTargetId::A => 'A',
            SkeletalTargetId::B => 'B',
            SkeletalTargetId::C => 'C',
            SkeletalTargetId::D => 'D',
            SkeletalTargetId::E => 'E',
            SkeletalTargetId::F => 'F',
        };
        write!(f, "{}", letter)
    }
}

impl FromStr for SkeletalTargetId {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "A" => Ok(SkeletalTargetId::A),
            "B" => Ok(SkeletalTargetId::B),
            "C" => Ok(SkeletalTargetId::C),
            "D" => Ok(SkeletalTargetId::D),
            "E" => Ok(SkeletalTargetId::E),
            "F" => Ok(SkeletalTargetId::F),
            _ => Err(format!("Unknown skeletal target: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_wraps_both_ways() {
        assert_eq!(SkeletalTargetId::F.next(), SkeletalTargetId::A);
        assert_eq!(SkeletalTargetId::A.prev(), SkeletalTargetId::F);
        assert_eq!(SkeletalTargetId::C.next(), SkeletalTargetId::D);
        assert_eq!(SkeletalTargetId::C.prev(), SkeletalTargetId::B);
    }

    #[test]
    fn test_target_from_index() {
        assert_eq!(SkeletalTargetId::from_index(4), Some(SkeletalTargetId::E));
        assert_eq!(SkeletalTargetId::from_index(6), None);
    }

    #[test]
    fn test_direction_of_velocity() {
        assert_eq!(Direction::of_velocity(Axis::Tilt, 20.0), Some(Direction::Up));
        assert_eq!(Direction::of_velocity(Axis::Pan, -0.5), Some(Direction::Left));
        assert_eq!(Direction::of_velocity(Axis::Pan, 0.0), None);
        for d in Direction::ALL {
            assert_eq!(Direction::of_velocity(d.axis(), d.sign()), Some(d));
            assert_eq!(d.opposite().opposite(), d);
        }
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!("Skeletal".parse::<TrackingMode>(), Ok(TrackingMode::Skeletal));
        assert!("sonar".parse::<TrackingMode>().is_err());
    }
}
