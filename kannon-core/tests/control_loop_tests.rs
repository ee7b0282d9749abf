// kannon-core/tests/control_loop_tests.rs

use kannon_common::models::{
    ControlInput, Direction, SkeletalTargetId, TargetSelection, TrackingMode,
};
use kannon_core::eventbus::KannonEvent;
use kannon_core::tasks::control_loop::spawn_control_loop;
use kannon_core::test_utils::rig::SimRig;
use kannon_core::ControlConfig;
use tokio::sync::mpsc;

#[tokio::test]
async fn test_loop_applies_inputs_in_order_and_stops_on_close() -> anyhow::Result<()> {
    let rig = SimRig::new(ControlConfig::default());
    let mut events = rig.event_bus.subscribe(None);
    rig.attach_all(&mut events).await;

    let (tx, rx) = mpsc::channel(16);
    let handle = spawn_control_loop(rig.service.clone(), rx);

    tx.send(ControlInput::ManualNudge(Direction::Right)).await?;
    tx.send(ControlInput::ManualNudge(Direction::Right)).await?;
    // Disarmed fire is logged and skipped; the loop keeps going.
    tx.send(ControlInput::RequestFire).await?;
    tx.send(ControlInput::SelectMode(TrackingMode::Skeletal)).await?;
    tx.send(ControlInput::SelectSkeletalTarget(TargetSelection::Prev)).await?;
    drop(tx);
    handle.await?;

    let status = rig.service.status().await;
    assert_eq!(status.tracking_mode, TrackingMode::Skeletal);
    assert_eq!(status.skeletal_target, SkeletalTargetId::F);
    // Exit runs an emergency stop.
    assert_eq!(status.pan_velocity, 0.0);
    assert!(!rig.servo_board.is_engaged(0));

    let mut saw_target = false;
    while let Ok(event) = events.try_recv() {
        if event == KannonEvent::TargetChanged(SkeletalTargetId::F) {
            saw_target = true;
        }
    }
    assert!(saw_target);
    assert!(rig.relay_board.history().iter().all(|(_, _, on)| !on));
    Ok(())
}

#[tokio::test]
async fn test_loop_exits_on_shutdown() -> anyhow::Result<()> {
    let rig = SimRig::new(ControlConfig::default());
    let (_tx, rx) = mpsc::channel::<ControlInput>(4);
    let handle = spawn_control_loop(rig.service.clone(), rx);

    rig.event_bus.shutdown();
    handle.await?;
    for watcher in rig.watchers {
        watcher.await?;
    }
    Ok(())
}
