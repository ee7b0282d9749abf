// kannon-core/src/tasks/attach_watcher.rs

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use crate::actuators::AttachHandler;
use crate::eventbus::{EventBus, KannonEvent, PortKind};

/// Spawns a task that follows a board's attach line and drives `handler`
/// through the attach/detach handshake. Stops on bus shutdown or when the
/// board goes away.
pub fn spawn_attach_watcher(
    port: PortKind,
    mut attach_events: watch::Receiver<bool>,
    handler: Arc<dyn AttachHandler>,
    event_bus: Arc<EventBus>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut shutdown_rx = event_bus.shutdown_rx.clone();

        // The board may have attached before we subscribed.
        if *attach_events.borrow_and_update() {
            on_attach(port, handler.as_ref(), &event_bus).await;
        }

        loop {
            tokio::select! {
                changed = attach_events.changed() => {
                    if changed.is_err() {
                        debug!("{} attach channel closed", port);
                        break;
                    }
                    let attached = *attach_events.borrow_and_update();
                    if attached {
                        on_attach(port, handler.as_ref(), &event_bus).await;
                    } else if handler.handle_detach() {
                        warn!("{} detached", port);
                        event_bus.publish(KannonEvent::ActuatorDetached(port));
                    }
                }
                res = shutdown_rx.changed() => {
                    if res.is_err() || *shutdown_rx.borrow() {
                        debug!("{} attach watcher stopping", port);
                        break;
                    }
                }
            }
        }
    })
}

async fn on_attach(port: PortKind, handler: &dyn AttachHandler, event_bus: &EventBus) {
    match handler.handle_attach().await {
        Ok(true) => event_bus.publish(KannonEvent::ActuatorAttached(port)),
        Ok(false) => {}
        Err(e) => error!("{} attach handshake failed: {}", port, e),
    }
}
