//! kannon-core/src/eventbus/mod.rs
//!
//! In-process event bus fanning control-core notifications out to the HUD,
//! telemetry and confirmation (beep/flash) collaborators.
//!
//! Unlike a work queue, the control loop must never wait on a subscriber:
//! a full or closed queue drops the event for that subscriber only.

use std::sync::Arc;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tracing::warn;
use kannon_common::models::{ArmState, Axis, Direction, SkeletalTargetId, TrackingMode};

/// Which actuator board an attach/detach refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortKind {
    PanTilt,
    Relay,
}

impl std::fmt::Display for PortKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortKind::PanTilt => write!(f, "pan/tilt"),
            PortKind::Relay => write!(f, "relay"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum KannonEvent {
    ModeChanged(TrackingMode),
    TargetChanged(SkeletalTargetId),
    /// Arm state changed; the confirmation collaborator beeps/flashes on this.
    SafetyToggled {
        state: ArmState,
        timestamp: DateTime<Utc>,
    },
    FireStarted { pulse_id: u64 },
    FireCompleted { pulse_id: u64 },
    FireCancelled { pulse_id: u64 },
    InterlockTripped(Direction),
    InterlockCleared(Direction),
    ActuatorAttached(PortKind),
    ActuatorDetached(PortKind),
    AxisHalted { axis: Axis, reason: String },
}

impl KannonEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            KannonEvent::ModeChanged(_) => "mode.changed",
            KannonEvent::TargetChanged(_) => "target.changed",
            KannonEvent::SafetyToggled { .. } => "safety.toggled",
            KannonEvent::FireStarted { .. } => "fire.started",
            KannonEvent::FireCompleted { .. } => "fire.completed",
            KannonEvent::FireCancelled { .. } => "fire.cancelled",
            KannonEvent::InterlockTripped(_) => "interlock.tripped",
            KannonEvent::InterlockCleared(_) => "interlock.cleared",
            KannonEvent::ActuatorAttached(_) => "actuator.attached",
            KannonEvent::ActuatorDetached(_) => "actuator.detached",
            KannonEvent::AxisHalted { .. } => "axis.halted",
        }
    }
}

/// Each subscriber gets its own bounded `mpsc` queue.
#[derive(Clone)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<mpsc::Sender<KannonEvent>>>>,
    shutdown_tx: watch::Sender<bool>,
    pub shutdown_rx: watch::Receiver<bool>,
    default_buffer: usize,
}

/// Default size for each subscriber's buffer.
const DEFAULT_BUFFER_SIZE: usize = 1024;

impl EventBus {
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer(default_buffer: usize) -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            subscribers: Arc::new(Mutex::new(vec![])),
            shutdown_tx: tx,
            shutdown_rx: rx,
            default_buffer: default_buffer.max(1),
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    pub fn subscribe(&self, buffer_size: Option<usize>) -> mpsc::Receiver<KannonEvent> {
        let size = buffer_size.unwrap_or(self.default_buffer).max(1);
        let (tx, rx) = mpsc::channel(size);
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Publish to every live subscriber without waiting. Closed subscribers
    /// are pruned; full ones miss this event.
    pub fn publish(&self, event: KannonEvent) {
        let mut subs = self.subscribers.lock();
        subs.retain(|s| match s.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event subscriber queue full, dropping {}", event.event_type());
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
