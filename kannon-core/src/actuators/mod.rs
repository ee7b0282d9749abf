// File: kannon-core/src/actuators/mod.rs

use async_trait::async_trait;
use kannon_common::ActuatorError;
use kannon_common::models::Axis;

pub mod pan_tilt;
pub mod firing;
pub mod sim;

pub use pan_tilt::PanTiltController;
pub use firing::FiringController;

/// The pan/tilt output the control core drives.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PanTiltPort: Send + Sync {
    fn is_ready(&self) -> bool;

    /// Signed offset in degrees from the zero movement point. Offsets beyond
    /// the mount's travel are an error, never clamped.
    async fn set_angle_offset(&self, axis: Axis, degrees: f64) -> Result<(), ActuatorError>;

    async fn engage(&self) -> Result<(), ActuatorError>;

    async fn disengage(&self) -> Result<(), ActuatorError>;

    /// Releases a single servo; the other axis keeps holding.
    async fn disengage_axis(&self, axis: Axis) -> Result<(), ActuatorError>;
}

/// The firing valve relay.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RelayPort: Send + Sync {
    fn is_ready(&self) -> bool;

    /// `false` must reach the board even when the port is not ready.
    async fn set_relay(&self, on: bool) -> Result<(), ActuatorError>;

    fn relay_state(&self) -> Result<bool, ActuatorError>;
}

/// Reacts to a board's attach handshake. Implemented by the controllers and
/// driven by the attach watcher task.
#[async_trait]
pub trait AttachHandler: Send + Sync {
    /// Returns `true` if this call moved the port from not-ready to ready.
    async fn handle_attach(&self) -> Result<bool, ActuatorError>;

    /// Returns `true` if the port was ready before this call.
    fn handle_detach(&self) -> bool;
}
