// kannon-core/src/tasks/control_loop.rs

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use kannon_common::models::ControlInput;
use crate::services::ControlService;

/// Spawns the task that feeds adapter inputs into the control service one at
/// a time. On bus shutdown or when every sender is gone, the mount is
/// stopped and any pulse is ended before the task exits.
pub fn spawn_control_loop(
    service: Arc<ControlService>,
    mut inputs: mpsc::Receiver<ControlInput>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut shutdown_rx = service.event_bus().shutdown_rx.clone();
        loop {
            tokio::select! {
                maybe_input = inputs.recv() => {
                    match maybe_input {
                        Some(input) => handle_input(&service, input).await,
                        None => {
                            info!("All input adapters closed");
                            break;
                        }
                    }
                }
                res = shutdown_rx.changed() => {
                    if res.is_err() || *shutdown_rx.borrow() {
                        info!("Control loop shutting down");
                        break;
                    }
                }
            }
        }
        if let Err(e) = service.emergency_stop().await {
            error!("Emergency stop on exit failed: {}", e);
        }
    })
}

async fn handle_input(service: &ControlService, input: ControlInput) {
    let kind = input.kind();
    if let Err(e) = service.dispatch(input).await {
        if e.is_recoverable() {
            warn!("{} rejected: {}", kind, e);
        } else {
            error!("{} failed: {}", kind, e);
        }
    }
}
