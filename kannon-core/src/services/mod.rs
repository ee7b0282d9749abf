// File: kannon-core/src/services/mod.rs

pub mod control_service;

pub use control_service::{ControlService, ControlState};
