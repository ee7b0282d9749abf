// File: kannon-core/src/actuators/firing.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use async_trait::async_trait;
use tracing::{debug, info};
use kannon_common::ActuatorError;
use kannon_common::traits::RelayBoard;
use crate::actuators::{AttachHandler, RelayPort};
use crate::config::ControlConfig;

/// Thin wrapper over the relay output that opens the firing valve.
/// Arming and pulse timing live in the control core, not here.
pub struct FiringController {
    board: Arc<dyn RelayBoard>,
    output: usize,
    ready: AtomicBool,
}

impl FiringController {
    pub fn new(board: Arc<dyn RelayBoard>, config: &ControlConfig) -> Self {
        Self {
            board,
            output: config.relay_output,
            ready: AtomicBool::new(false),
        }
    }

    pub async fn try_initialize(&self) -> Result<(), ActuatorError> {
        self.board.open().await.map_err(|e| {
            ActuatorError::Hardware(format!("An error occurred opening connection to relay board. ({})", e))
        })
    }

    fn ensure_ready(&self) -> Result<(), ActuatorError> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(ActuatorError::NotReady("firing relay not attached".into()))
        }
    }
}

#[async_trait]
impl RelayPort for FiringController {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Opening requires an attached board. Closing always goes to the board,
    /// so a pulse that outlives an attach is still ended.
    async fn set_relay(&self, on: bool) -> Result<(), ActuatorError> {
        if on {
            self.ensure_ready()?;
        }
        debug!("Relay output {} => {}", self.output, on);
        self.board.set_output(self.output, on).await
    }

    fn relay_state(&self) -> Result<bool, ActuatorError> {
        self.ensure_ready()?;
        self.board.output(self.output)
    }
}

#[async_trait]
impl AttachHandler for FiringController {
    /// Drives the output low before reporting ready.
    async fn handle_attach(&self) -> Result<bool, ActuatorError> {
        if self.is_ready() {
            return Ok(false);
        }
        self.board.set_output(self.output, false).await?;
        let transitioned = !self.ready.swap(true, Ordering::SeqCst);
        if transitioned {
            info!("Firing relay attached");
        }
        Ok(transitioned)
    }

    fn handle_detach(&self) -> bool {
        let was_ready = self.ready.swap(false, Ordering::SeqCst);
        if was_ready {
            info!("Firing relay detached");
        }
        was_ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuators::sim::SimRelayBoard;

    #[tokio::test]
    async fn test_relay_requires_attach() {
        let board = Arc::new(SimRelayBoard::new());
        let ctl = FiringController::new(board.clone(), &ControlConfig::default());

        assert!(ctl.set_relay(true).await.unwrap_err().is_not_ready());
        assert!(ctl.relay_state().is_err());

        assert!(ctl.handle_attach().await.unwrap());
        assert!(!ctl.handle_attach().await.unwrap());
        ctl.set_relay(true).await.unwrap();
        assert!(ctl.relay_state().unwrap());
        assert_eq!(board.output(0), Ok(true));

        ctl.set_relay(false).await.unwrap();
        assert!(!ctl.relay_state().unwrap());
    }

    #[tokio::test]
    async fn test_close_reaches_board_while_detached() {
        let board = Arc::new(SimRelayBoard::new());
        let ctl = FiringController::new(board.clone(), &ControlConfig::default());
        ctl.handle_attach().await.unwrap();
        ctl.set_relay(true).await.unwrap();

        assert!(ctl.handle_detach());
        ctl.set_relay(false).await.unwrap();
        assert_eq!(board.output(0), Ok(false));
    }

    #[tokio::test]
    async fn test_attach_drives_output_low() {
        let board = Arc::new(SimRelayBoard::new());
        board.set_output(0, true).await.unwrap();
        let ctl = FiringController::new(board.clone(), &ControlConfig::default());

        ctl.handle_attach().await.unwrap();
        assert_eq!(board.output(0), Ok(false));
    }

    #[tokio::test]
    async fn test_initialize_failure_is_returned() {
        let board = Arc::new(SimRelayBoard::new());
        board.fail_open("no device");
        let ctl = FiringController::new(board, &ControlConfig::default());
        assert!(matches!(ctl.try_initialize().await, Err(ActuatorError::Hardware(_))));
    }

    #[tokio::test]
    async fn test_configured_output_index() {
        let board = Arc::new(SimRelayBoard::new());
        let config = ControlConfig { relay_output: 2, ..ControlConfig::default() };
        let ctl = FiringController::new(board.clone(), &config);
        ctl.handle_attach().await.unwrap();
        ctl.set_relay(true).await.unwrap();
        assert_eq!(board.output(2), Ok(true));
        assert_eq!(board.output(0), Ok(false));
    }
}
