// File: kannon-core/src/test_utils/rig.rs

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use kannon_common::traits::{RelayBoard, ServoBoard};
use crate::actuators::sim::{SimRelayBoard, SimServoBoard};
use crate::actuators::{FiringController, PanTiltController};
use crate::config::ControlConfig;
use crate::eventbus::{EventBus, KannonEvent, PortKind};
use crate::services::ControlService;
use crate::tasks::attach_watcher::spawn_attach_watcher;

/// A control service wired to simulated boards, with attach watchers running.
pub struct SimRig {
    pub servo_board: Arc<SimServoBoard>,
    pub relay_board: Arc<SimRelayBoard>,
    pub pan_tilt: Arc<PanTiltController>,
    pub firing: Arc<FiringController>,
    pub event_bus: Arc<EventBus>,
    pub service: Arc<ControlService>,
    pub watchers: Vec<JoinHandle<()>>,
}

impl SimRig {
    /// Boards start detached. Must be called inside a tokio runtime.
    pub fn new(config: ControlConfig) -> Self {
        let servo_board = Arc::new(SimServoBoard::new());
        let relay_board = Arc::new(SimRelayBoard::new());
        let pan_tilt = Arc::new(PanTiltController::new(servo_board.clone(), &config));
        let firing = Arc::new(FiringController::new(relay_board.clone(), &config));
        let event_bus = Arc::new(EventBus::with_buffer(config.event_buffer));

        let watchers = vec![
            spawn_attach_watcher(
                PortKind::PanTilt,
                servo_board.attach_events(),
                pan_tilt.clone(),
                event_bus.clone(),
            ),
            spawn_attach_watcher(
                PortKind::Relay,
                relay_board.attach_events(),
                firing.clone(),
                event_bus.clone(),
            ),
        ];

        let service = Arc::new(ControlService::new(
            config,
            pan_tilt.clone(),
            firing.clone(),
            event_bus.clone(),
        ));

        Self {
            servo_board,
            relay_board,
            pan_tilt,
            firing,
            event_bus,
            service,
            watchers,
        }
    }

    /// Attaches both boards and waits until the controllers report ready.
    pub async fn attach_all(&self, events: &mut mpsc::Receiver<KannonEvent>) {
        self.servo_board.attach();
        self.relay_board.attach();
        let mut pending = 2;
        while pending > 0 {
            match events.recv().await {
                Some(KannonEvent::ActuatorAttached(_)) => pending -= 1,
                Some(_) => {}
                None => break,
            }
        }
    }

    /// Current state of the firing relay output, `None` for a bad index.
    pub fn firing_output(&self) -> Option<bool> {
        self.relay_board.output(self.service.config().relay_output).ok()
    }

    /// Receives events until one matches `pred`.
    pub async fn wait_for<F>(events: &mut mpsc::Receiver<KannonEvent>, pred: F) -> Option<KannonEvent>
    where
        F: Fn(&KannonEvent) -> bool,
    {
        while let Some(event) = events.recv().await {
            if pred(&event) {
                return Some(event);
            }
        }
        None
    }
}
