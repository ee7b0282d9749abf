// File: kannon-core/src/actuators/pan_tilt.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use async_trait::async_trait;
use tracing::{debug, info};
use kannon_common::ActuatorError;
use kannon_common::models::Axis;
use kannon_common::traits::ServoBoard;
use crate::actuators::{AttachHandler, PanTiltPort};
use crate::config::ControlConfig;

/// Two continuous-rotation servos on one board. A servo held at the zero
/// movement point is stationary; offsets from it set speed and direction.
pub struct PanTiltController {
    board: Arc<dyn ServoBoard>,
    zero_movement_point: f64,
    pan_channel: usize,
    tilt_channel: usize,
    ready: AtomicBool,
}

impl PanTiltController {
    pub fn new(board: Arc<dyn ServoBoard>, config: &ControlConfig) -> Self {
        Self {
            board,
            zero_movement_point: config.zero_movement_point,
            pan_channel: config.pan_channel,
            tilt_channel: config.tilt_channel,
            ready: AtomicBool::new(false),
        }
    }

    /// Opens the board. Readiness arrives later through `handle_attach`.
    pub async fn try_initialize(&self) -> Result<(), ActuatorError> {
        self.board.open().await.map_err(|e| {
            ActuatorError::Hardware(format!(
                "Could not open connection to servo controller. Is it attached? ({})",
                e
            ))
        })
    }

    fn channel(&self, axis: Axis) -> usize {
        match axis {
            Axis::Pan => self.pan_channel,
            Axis::Tilt => self.tilt_channel,
        }
    }

    fn ensure_ready(&self) -> Result<(), ActuatorError> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(ActuatorError::NotReady("pan/tilt controller not attached".into()))
        }
    }

    async fn set_engaged(&self, engaged: bool) -> Result<(), ActuatorError> {
        self.board.set_engaged(self.pan_channel, engaged).await?;
        self.board.set_engaged(self.tilt_channel, engaged).await?;
        Ok(())
    }
}

#[async_trait]
impl PanTiltPort for PanTiltController {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn set_angle_offset(&self, axis: Axis, degrees: f64) -> Result<(), ActuatorError> {
        self.ensure_ready()?;
        if !degrees.is_finite() || degrees.abs() > self.zero_movement_point {
            return Err(ActuatorError::TravelLimitExceeded {
                requested: degrees,
                limit: self.zero_movement_point,
            });
        }
        let position = self.zero_movement_point + degrees;
        debug!("{} offset {:.2} => position {:.2}", axis, degrees, position);
        self.board.set_position(self.channel(axis), position).await
    }

    async fn engage(&self) -> Result<(), ActuatorError> {
        self.ensure_ready()?;
        self.set_engaged(true).await
    }

    async fn disengage(&self) -> Result<(), ActuatorError> {
        self.ensure_ready()?;
        self.set_engaged(false).await
    }

    async fn disengage_axis(&self, axis: Axis) -> Result<(), ActuatorError> {
        self.ensure_ready()?;
        self.board.set_engaged(self.channel(axis), false).await
    }
}

#[async_trait]
impl AttachHandler for PanTiltController {
    /// Engages both servos and parks them at the zero movement point before
    /// reporting ready.
    async fn handle_attach(&self) -> Result<bool, ActuatorError> {
        if self.is_ready() {
            return Ok(false);
        }
        self.set_engaged(true).await?;
        self.board.set_position(self.pan_channel, self.zero_movement_point).await?;
        self.board.set_position(self.tilt_channel, self.zero_movement_point).await?;
        let transitioned = !self.ready.swap(true, Ordering::SeqCst);
        if transitioned {
            info!("Pan/tilt controller attached and centered");
        }
        Ok(transitioned)
    }

    fn handle_detach(&self) -> bool {
        let was_ready = self.ready.swap(false, Ordering::SeqCst);
        if was_ready {
            info!("Pan/tilt controller detached");
        }
        was_ready
    }
}
