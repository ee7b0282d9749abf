// File: kannon-common/src/models/input.rs

use serde::{Deserialize, Serialize};
use crate::models::tracking::{Direction, SkeletalTargetId, TrackingMode};

/// Horizontal/vertical offset of a tracked joint from frame center,
/// roughly in [-1, 1] on each axis. Scaling is the sensor adapter's job.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct NormalizedOffset {
    pub x: f64,
    pub y: f64,
}

impl NormalizedOffset {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One skeletal report for a single body slot.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct SkeletalFrame {
    pub body_index: usize,
    /// `None` when the body in that slot is not tracked.
    pub offset: Option<NormalizedOffset>,
}

impl SkeletalFrame {
    pub fn tracked(body_index: usize, offset: NormalizedOffset) -> Self {
        Self { body_index, offset: Some(offset) }
    }

    pub fn not_tracked(body_index: usize) -> Self {
        Self { body_index, offset: None }
    }
}

/// One acoustic beam report.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct AudioFrame {
    /// Azimuth of the sound source in radians, roughly [-pi/2, pi/2].
    pub bearing_radians: f64,
    /// Beam confidence in [0, 1].
    pub confidence: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum TargetSelection {
    Letter(SkeletalTargetId),
    Next,
    Prev,
    Reset,
}

/// Every event the control core consumes, from tracking sources and from
/// discrete operator commands.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum ControlInput {
    ManualNudge(Direction),
    /// Analog stick in manual mode, each component in [-1, 1].
    ManualStick { x: f64, y: f64 },
    SkeletalFrame(SkeletalFrame),
    AudioFrame(AudioFrame),
    RageLimit { direction: Direction, triggered: bool },
    SelectMode(TrackingMode),
    SelectSkeletalTarget(TargetSelection),
    ToggleSafety,
    RequestFire,
}

impl ControlInput {
    /// Short name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            ControlInput::ManualNudge(_) => "manual_nudge",
            ControlInput::ManualStick { .. } => "manual_stick",
            ControlInput::SkeletalFrame(_) => "skeletal_frame",
            ControlInput::AudioFrame(_) => "audio_frame",
            ControlInput::RageLimit { .. } => "rage_limit",
            ControlInput::SelectMode(_) => "select_mode",
            ControlInput::SelectSkeletalTarget(_) => "select_skeletal_target",
            ControlInput::ToggleSafety => "toggle_safety",
            ControlInput::RequestFire => "request_fire",
        }
    }
}
