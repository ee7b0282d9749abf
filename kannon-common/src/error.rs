// ================================================================
// File: kannon-common/src/error.rs
// ================================================================

use std::fmt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::models::tracking::Axis;

/// Errors raised at the actuator port boundary.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ActuatorError {
    #[error("Actuator not ready: {0}")]
    NotReady(String),

    #[error("Cannot specify a movement value with magnitude {requested} greater than {limit}")]
    TravelLimitExceeded { requested: f64, limit: f64 },

    #[error("Invalid board channel: {0}")]
    InvalidChannel(usize),

    #[error("Hardware error: {0}")]
    Hardware(String),
}

impl ActuatorError {
    /// `NotReady` is recoverable; every other variant means the command
    /// could not be applied and motion on that axis must be halted.
    pub fn is_not_ready(&self) -> bool {
        matches!(self, ActuatorError::NotReady(_))
    }
}

/// Why a request could not be acted on right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotReadyReason {
    Disarmed,
    RelayNotAttached,
    PanTiltNotAttached,
    AxisFaulted(Axis),
}

impl fmt::Display for NotReadyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotReadyReason::Disarmed => write!(f, "virtual safety is on"),
            NotReadyReason::RelayNotAttached => write!(f, "firing relay not attached"),
            NotReadyReason::PanTiltNotAttached => write!(f, "pan/tilt controller not attached"),
            NotReadyReason::AxisFaulted(axis) => write!(f, "{} axis halted after a fault", axis),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Actuator error: {0}")]
    Actuator(#[from] ActuatorError),

    #[error("Not ready: {0}")]
    NotReady(NotReadyReason),

    /// Motion on `axis` was stopped and the mount disengaged after `source`.
    #[error("{axis} axis halted: {source}")]
    AxisHalted {
        axis: Axis,
        #[source]
        source: ActuatorError,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

}

impl Error {
    /// Errors the caller may simply retry or ignore.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::NotReady(_) => true,
            Error::Actuator(e) => e.is_not_ready(),
            _ => false,
        }
    }
}

impl From<NotReadyReason> for Error {
    fn from(reason: NotReadyReason) -> Self {
        Error::NotReady(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(Error::NotReady(NotReadyReason::Disarmed).is_recoverable());
        assert!(Error::from(ActuatorError::NotReady("detached".into())).is_recoverable());
        assert!(!Error::Config("bad".into()).is_recoverable());
        assert!(Error::from(NotReadyReason::AxisFaulted(Axis::Tilt)).is_recoverable());

        let halted = Error::AxisHalted {
            axis: Axis::Pan,
            source: ActuatorError::TravelLimitExceeded { requested: 130.0, limit: 115.0 },
        };
        assert!(!halted.is_recoverable());
        assert!(halted.to_string().contains("pan axis halted"));
    }
}
