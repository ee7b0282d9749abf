// kannon-core/src/tasks/fire_pulse.rs

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};
use crate::actuators::RelayPort;
use crate::eventbus::{EventBus, KannonEvent};
use crate::services::ControlState;

/// Spawns the task that closes the relay once `duration` has elapsed.
/// Does nothing if pulse `pulse_id` was cancelled or replaced meanwhile.
pub fn spawn_fire_pulse_task(
    state: Arc<Mutex<ControlState>>,
    relay: Arc<dyn RelayPort>,
    event_bus: Arc<EventBus>,
    pulse_id: u64,
    duration: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        sleep(duration).await;
        let mut locked_state = state.lock().await;
        if !locked_state.pulse.finish(pulse_id) {
            debug!("Pulse {} no longer active, skipping deassert", pulse_id);
            return;
        }
        match relay.set_relay(false).await {
            Ok(()) => info!("Fire pulse {} complete", pulse_id),
            Err(e) => error!("Failed to close relay after pulse {}: {}", pulse_id, e),
        }
        event_bus.publish(KannonEvent::FireCompleted { pulse_id });
    })
}
