// File: kannon-core/src/motion/interlock.rs

use kannon_common::models::{Axis, Direction, InterlockFlags};

/// Rage-safety latches, one per direction.
///
/// A latch only ever blocks motion in its own direction. It is released by
/// the first command that moves its axis the other way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AxisInterlocks {
    latched: [bool; 4],
}

impl AxisInterlocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self, direction: Direction) -> bool {
        self.latched[direction.index()]
    }

    /// Returns `true` if the latch was not already set.
    pub fn set(&mut self, direction: Direction) -> bool {
        !std::mem::replace(&mut self.latched[direction.index()], true)
    }

    /// Returns `true` if the latch was set.
    pub fn clear(&mut self, direction: Direction) -> bool {
        std::mem::replace(&mut self.latched[direction.index()], false)
    }

    /// Filters a velocity for `axis`. Motion into a latched direction becomes
    /// zero; motion the other way releases the opposite latch, which is
    /// returned so the caller can report it.
    pub fn gate(&mut self, axis: Axis, velocity: f64) -> (f64, Option<Direction>) {
        match Direction::of_velocity(axis, velocity) {
            None => (0.0, None),
            Some(dir) if self.is_set(dir) => (0.0, None),
            Some(dir) => {
                let released = dir.opposite();
                let cleared = self.clear(released).then_some(released);
                (velocity, cleared)
            }
        }
    }

    pub fn flags(&self) -> InterlockFlags {
        InterlockFlags {
            too_far_up: self.is_set(Direction::Up),
            too_far_down: self.is_set(Direction::Down),
            too_far_left: self.is_set(Direction::Left),
            too_far_right: self.is_set(Direction::Right),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_is_idempotent() {
        let mut locks = AxisInterlocks::new();
        assert!(locks.set(Direction::Up));
        assert!(!locks.set(Direction::Up));
        assert!(locks.flags().too_far_up);
        assert!(locks.clear(Direction::Up));
        assert!(!locks.clear(Direction::Up));
    }

    #[test]
    fn test_latch_never_blocks_opposite_direction() {
        for dir in Direction::ALL {
            let mut locks = AxisInterlocks::new();
            locks.set(dir);

            let (v, cleared) = locks.gate(dir.axis(), dir.sign() * 30.0);
            assert_eq!(v, 0.0, "{dir} should be blocked");
            assert_eq!(cleared, None);

            let (v, cleared) = locks.gate(dir.axis(), dir.opposite().sign() * 30.0);
            assert_eq!(v, dir.opposite().sign() * 30.0);
            assert_eq!(cleared, Some(dir));
            assert!(!locks.is_set(dir));
        }
    }

    #[test]
    fn test_latch_on_other_axis_is_untouched() {
        let mut locks = AxisInterlocks::new();
        locks.set(Direction::Left);
        let (v, cleared) = locks.gate(Axis::Tilt, -12.0);
        assert_eq!(v, -12.0);
        assert_eq!(cleared, None);
        assert!(locks.is_set(Direction::Left));
    }
}
