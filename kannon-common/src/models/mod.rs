// File: kannon-common/src/models/mod.rs
pub mod tracking;
pub mod input;
pub mod status;

pub use tracking::{Axis, Direction, SkeletalTargetId, TrackingMode};
pub use input::{AudioFrame, ControlInput, NormalizedOffset, SkeletalFrame, TargetSelection};
pub use status::{ArmState, ControlStatus, FireOutcome, InterlockFlags, SystemStatus};
