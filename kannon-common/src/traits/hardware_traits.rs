// File: kannon-common/src/traits/hardware_traits.rs
//
// Seams for the vendor board drivers. The control core never talks to a
// board directly; it goes through the pan/tilt and firing controllers.

use async_trait::async_trait;
use tokio::sync::watch;
use crate::error::ActuatorError;

/// A multi-channel servo board.
#[async_trait]
pub trait ServoBoard: Send + Sync {
    /// Opens the connection. Attachment is reported later on `attach_events`.
    async fn open(&self) -> Result<(), ActuatorError>;

    fn is_attached(&self) -> bool;

    /// Flips to `true` when the board finishes its attach handshake and back
    /// to `false` on disconnect.
    fn attach_events(&self) -> watch::Receiver<bool>;

    /// Absolute servo position in degrees.
    async fn set_position(&self, channel: usize, degrees: f64) -> Result<(), ActuatorError>;

    async fn set_engaged(&self, channel: usize, engaged: bool) -> Result<(), ActuatorError>;
}

/// A digital output board driving the firing valve relay.
#[async_trait]
pub trait RelayBoard: Send + Sync {
    async fn open(&self) -> Result<(), ActuatorError>;

    fn is_attached(&self) -> bool;

    fn attach_events(&self) -> watch::Receiver<bool>;

    async fn set_output(&self, index: usize, on: bool) -> Result<(), ActuatorError>;

    fn output(&self, index: usize) -> Result<bool, ActuatorError>;
}
