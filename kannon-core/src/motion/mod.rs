// File: kannon-core/src/motion/mod.rs
//
// Turns tracking-source signals into a bounded (pan, tilt) velocity.

pub mod interlock;

use tracing::{debug, warn};
use kannon_common::models::{AudioFrame, Axis, Direction, InterlockFlags, NormalizedOffset};
use crate::config::ControlConfig;

pub use interlock::AxisInterlocks;

/// What changed on this tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MotionUpdate {
    /// Axes whose command must be (re)issued to the pan/tilt port.
    pub axes: Vec<Axis>,
    /// Latches released by motion in the opposite direction.
    pub cleared: Vec<Direction>,
    /// Latch newly set by a rage-limit event.
    pub tripped: Option<Direction>,
}

impl MotionUpdate {
    pub fn is_empty(&self) -> bool {
        self.axes.is_empty() && self.cleared.is_empty() && self.tripped.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct MotionCommandGenerator {
    speed_limit: f64,
    nudge_step: f64,
    min_audio_confidence: f64,
    velocity: [f64; 2],
    halted: [bool; 2],
    interlocks: AxisInterlocks,
}

impl MotionCommandGenerator {
    pub fn new(config: &ControlConfig) -> Self {
        Self {
            speed_limit: config.speed_limit,
            nudge_step: config.nudge_step,
            min_audio_confidence: config.min_audio_confidence,
            velocity: [0.0; 2],
            halted: [false; 2],
            interlocks: AxisInterlocks::new(),
        }
    }

    pub fn velocity(&self, axis: Axis) -> f64 {
        self.velocity[axis.index()]
    }

    pub fn interlocks(&self) -> InterlockFlags {
        self.interlocks.flags()
    }

    pub fn is_halted(&self, axis: Axis) -> bool {
        self.halted[axis.index()]
    }

    pub fn halted_axes(&self) -> Vec<Axis> {
        Axis::ALL.into_iter().filter(|a| self.is_halted(*a)).collect()
    }

    fn clamp(&self, velocity: f64) -> f64 {
        if !velocity.is_finite() {
            return 0.0;
        }
        velocity.clamp(-self.speed_limit, self.speed_limit)
    }

    /// Writes `velocity` unless the axis is halted. Returns whether the axis
    /// should be sent to hardware.
    fn store(&mut self, axis: Axis, velocity: f64) -> bool {
        if self.is_halted(axis) {
            self.velocity[axis.index()] = 0.0;
            return false;
        }
        self.velocity[axis.index()] = velocity;
        true
    }

    /// Gates through the interlocks, then stores.
    fn apply_gated(&mut self, axis: Axis, raw: f64, update: &mut MotionUpdate) {
        let (velocity, cleared) = self.interlocks.gate(axis, self.clamp(raw));
        if let Some(dir) = cleared {
            update.cleared.push(dir);
        }
        if self.store(axis, velocity) {
            update.axes.push(axis);
        }
    }

    /// Manual mode: one discrete step in `direction`. Ignored while the latch
    /// for that direction is set; otherwise releases the opposite latch.
    pub fn nudge(&mut self, direction: Direction) -> MotionUpdate {
        let mut update = MotionUpdate::default();
        if self.interlocks.is_set(direction) {
            debug!("Nudge {} suppressed by interlock", direction);
            return update;
        }
        if self.interlocks.clear(direction.opposite()) {
            update.cleared.push(direction.opposite());
        }
        let axis = direction.axis();
        let target = self.clamp(self.velocity(axis) + direction.sign() * self.nudge_step);
        if self.store(axis, target) {
            update.axes.push(axis);
        }
        update
    }

    /// Manual mode analog stick, components in [-1, 1].
    pub fn stick(&mut self, x: f64, y: f64) -> MotionUpdate {
        let mut update = MotionUpdate::default();
        self.apply_gated(Axis::Pan, x * self.speed_limit, &mut update);
        self.apply_gated(Axis::Tilt, y * self.speed_limit, &mut update);
        update
    }

    /// Skeletal mode. `None` means the selected body is not tracked, which
    /// stops both axes rather than holding the last command.
    pub fn skeletal(&mut self, offset: Option<NormalizedOffset>) -> MotionUpdate {
        match offset {
            Some(offset) => {
                let mut update = MotionUpdate::default();
                self.apply_gated(Axis::Pan, offset.x * self.speed_limit, &mut update);
                self.apply_gated(Axis::Tilt, offset.y * self.speed_limit, &mut update);
                update
            }
            None => {
                debug!("Skeletal target lost, stopping both axes");
                self.zero_all()
            }
        }
    }

    /// Audible mode: bearing drives pan only. Tilt is left as is.
    /// An unready mount or a low-confidence beam forces pan to zero.
    pub fn audible(&mut self, frame: AudioFrame, pan_tilt_ready: bool) -> MotionUpdate {
        let mut update = MotionUpdate::default();
        let velocity = if !pan_tilt_ready || frame.confidence < self.min_audio_confidence {
            0.0
        } else {
            self.clamp(frame.bearing_radians * self.speed_limit)
        };
        if self.store(Axis::Pan, velocity) {
            update.axes.push(Axis::Pan);
        }
        update
    }

    /// Hardware travel-limit line. A trigger latches the direction and stops
    /// the axis. Release of the line does not clear the latch; only motion
    /// the other way does.
    pub fn rage_limit(&mut self, direction: Direction, triggered: bool) -> MotionUpdate {
        let mut update = MotionUpdate::default();
        if !triggered {
            debug!("Rage line {} released, latch held until reversal", direction);
            return update;
        }
        if self.interlocks.set(direction) {
            warn!("Rage safety tripped: too far {}", direction);
            update.tripped = Some(direction);
        }
        let axis = direction.axis();
        if self.store(axis, 0.0) {
            update.axes.push(axis);
        }
        update
    }

    pub fn zero_all(&mut self) -> MotionUpdate {
        let mut update = MotionUpdate::default();
        for axis in Axis::ALL {
            if self.store(axis, 0.0) {
                update.axes.push(axis);
            }
        }
        update
    }

    /// Stops `axis` and refuses further commands on it until `clear_halts`.
    pub fn halt(&mut self, axis: Axis) {
        self.velocity[axis.index()] = 0.0;
        self.halted[axis.index()] = true;
    }

    pub fn clear_halts(&mut self) {
        self.halted = [false; 2];
    }
}
