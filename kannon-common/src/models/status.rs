// File: kannon-common/src/models/status.rs

use std::fmt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::models::tracking::{Axis, Direction, SkeletalTargetId, TrackingMode};

/// Fire-control arm state. The mount always powers up `Disarmed`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArmState {
    #[default]
    Disarmed,
    Armed,
}

impl ArmState {
    /// `true` while the virtual safety is on, i.e. the cannon is cold.
    pub fn virtual_safety_on(self) -> bool {
        self == ArmState::Disarmed
    }

    pub fn toggled(self) -> ArmState {
        match self {
            ArmState::Disarmed => ArmState::Armed,
            ArmState::Armed => ArmState::Disarmed,
        }
    }

    /// HUD line for the safety indicator.
    pub fn safety_text(self) -> &'static str {
        match self {
            ArmState::Disarmed => "Cannon Safety Engaged",
            ArmState::Armed => "Cannon Safety Disengaged. !!WARNING Cannon Armed!!",
        }
    }
}

impl fmt::Display for ArmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArmState::Disarmed => write!(f, "disarmed"),
            ArmState::Armed => write!(f, "armed"),
        }
    }
}

/// Result of an accepted `RequestFire`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq)]
pub enum FireOutcome {
    /// Relay asserted; deassertion is scheduled.
    Started { pulse_id: u64 },
    /// A pulse was already active; the request was dropped.
    AlreadyActive { pulse_id: u64 },
}

/// Latched rage-safety flags, one per direction.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Default)]
pub struct InterlockFlags {
    pub too_far_up: bool,
    pub too_far_down: bool,
    pub too_far_left: bool,
    pub too_far_right: bool,
}

impl InterlockFlags {
    pub fn get(&self, direction: Direction) -> bool {
        match direction {
            Direction::Up => self.too_far_up,
            Direction::Down => self.too_far_down,
            Direction::Left => self.too_far_left,
            Direction::Right => self.too_far_right,
        }
    }

    pub fn any(&self) -> bool {
        self.too_far_up || self.too_far_down || self.too_far_left || self.too_far_right
    }
}

/// Coarse system status line shown on the HUD.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq)]
pub enum SystemStatus {
    Running,
    PanTiltNotAvailable,
    RelayNotAvailable,
    AxisFaulted(Axis),
}

impl fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemStatus::Running => write!(f, "Running"),
            SystemStatus::PanTiltNotAvailable => write!(f, "Pan/Tilt controller not available"),
            SystemStatus::RelayNotAvailable => write!(f, "Firing relay not available"),
            SystemStatus::AxisFaulted(axis) => write!(f, "{} axis halted, re-initialize required", axis),
        }
    }
}

/// Snapshot polled by the HUD/telemetry collaborator once per rendered frame.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ControlStatus {
    pub pan_velocity: f64,
    pub tilt_velocity: f64,
    pub tracking_mode: TrackingMode,
    pub skeletal_target: SkeletalTargetId,
    pub arm_state: ArmState,
    pub pan_tilt_ready: bool,
    pub relay_ready: bool,
    pub firing: bool,
    pub interlocks: InterlockFlags,
    pub faulted_axes: Vec<Axis>,
    pub timestamp: DateTime<Utc>,
}

impl ControlStatus {
    pub fn actuators_ready(&self) -> bool {
        self.pan_tilt_ready && self.relay_ready
    }

    pub fn system_status(&self) -> SystemStatus {
        if !self.pan_tilt_ready {
            SystemStatus::PanTiltNotAvailable
        } else if let Some(axis) = self.faulted_axes.first() {
            SystemStatus::AxisFaulted(*axis)
        } else if !self.relay_ready {
            SystemStatus::RelayNotAvailable
        } else {
            SystemStatus::Running
        }
    }
}
