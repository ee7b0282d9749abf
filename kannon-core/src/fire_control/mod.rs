// File: kannon-core/src/fire_control/mod.rs

pub mod arming;
pub mod pulse;

pub use arming::ArmingStateMachine;
pub use pulse::{FirePulse, FirePulseSequencer};
