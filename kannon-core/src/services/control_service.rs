// File: kannon-core/src/services/control_service.rs

use std::sync::Arc;
use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use kannon_common::{ActuatorError, Error, NotReadyReason};
use kannon_common::models::{
    ArmState, AudioFrame, Axis, ControlInput, ControlStatus, Direction, FireOutcome,
    SkeletalFrame, SkeletalTargetId, TargetSelection, TrackingMode,
};
use crate::actuators::{PanTiltPort, RelayPort};
use crate::config::ControlConfig;
use crate::eventbus::{EventBus, KannonEvent};
use crate::fire_control::{ArmingStateMachine, FirePulseSequencer};
use crate::motion::{MotionCommandGenerator, MotionUpdate};
use crate::tasks::fire_pulse::spawn_fire_pulse_task;
use crate::tracking::TrackingModeMachine;

/// Everything the control core mutates. Only ever touched while holding
/// the service's mutex.
pub struct ControlState {
    pub(crate) tracking: TrackingModeMachine,
    pub(crate) motion: MotionCommandGenerator,
    pub(crate) arming: ArmingStateMachine,
    pub(crate) pulse: FirePulseSequencer,
}

impl ControlState {
    pub fn new(config: &ControlConfig) -> Self {
        Self {
            tracking: TrackingModeMachine::new(),
            motion: MotionCommandGenerator::new(config),
            arming: ArmingStateMachine::new(config.safety_dwell()),
            pulse: FirePulseSequencer::new(),
        }
    }
}

/// The control core. Every entry point takes the state lock once, so at
/// most one mutation is in flight no matter which thread delivers the event.
pub struct ControlService {
    state: Arc<Mutex<ControlState>>,
    pan_tilt: Arc<dyn PanTiltPort>,
    relay: Arc<dyn RelayPort>,
    event_bus: Arc<EventBus>,
    config: ControlConfig,
}

impl ControlService {
    pub fn new(
        config: ControlConfig,
        pan_tilt: Arc<dyn PanTiltPort>,
        relay: Arc<dyn RelayPort>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        debug!("ControlService::new() called");
        Self {
            state: Arc::new(Mutex::new(ControlState::new(&config))),
            pan_tilt,
            relay,
            event_bus,
            config,
        }
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Routes one input to its handler.
    pub async fn dispatch(&self, input: ControlInput) -> Result<(), Error> {
        match input {
            ControlInput::ManualNudge(direction) => self.manual_nudge(direction).await,
            ControlInput::ManualStick { x, y } => self.manual_stick(x, y).await,
            ControlInput::SkeletalFrame(frame) => self.skeletal_frame(frame).await,
            ControlInput::AudioFrame(frame) => self.audio_frame(frame).await,
            ControlInput::RageLimit { direction, triggered } => {
                self.rage_limit(direction, triggered).await
            }
            ControlInput::SelectMode(mode) => {
                self.select_mode(mode).await;
                Ok(())
            }
            ControlInput::SelectSkeletalTarget(selection) => {
                self.select_target(selection).await;
                Ok(())
            }
            ControlInput::ToggleSafety => {
                self.toggle_safety().await;
                Ok(())
            }
            ControlInput::RequestFire => {
                let outcome = self.request_fire().await?;
                debug!("Fire request => {:?}", outcome);
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------
    // Tracking mode
    // ------------------------------------------------------------------

    pub async fn select_mode(&self, mode: TrackingMode) {
        let mut state = self.state.lock().await;
        if state.tracking.select_mode(mode) {
            self.event_bus.publish(KannonEvent::ModeChanged(mode));
        }
    }

    pub async fn select_target(&self, selection: TargetSelection) -> Option<SkeletalTargetId> {
        let mut state = self.state.lock().await;
        let before = state.tracking.target();
        let after = state.tracking.select_target(selection)?;
        if after != before {
            self.event_bus.publish(KannonEvent::TargetChanged(after));
        }
        Some(after)
    }

    // ------------------------------------------------------------------
    // Motion
    // ------------------------------------------------------------------

    pub async fn manual_nudge(&self, direction: Direction) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        if state.tracking.mode() != TrackingMode::Manual {
            debug!("Ignoring nudge {} in {} mode", direction, state.tracking.mode());
            return Ok(());
        }
        let axis = direction.axis();
        if state.motion.is_halted(axis) {
            return Err(Error::NotReady(NotReadyReason::AxisFaulted(axis)));
        }
        let update = state.motion.nudge(direction);
        self.apply_motion(&mut state, update).await
    }

    pub async fn manual_stick(&self, x: f64, y: f64) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        if state.tracking.mode() != TrackingMode::Manual {
            return Ok(());
        }
        let update = state.motion.stick(x, y);
        self.apply_motion(&mut state, update).await?;
        // The healthy axis still moves; a halted one is reported back.
        for (axis, value) in [(Axis::Pan, x), (Axis::Tilt, y)] {
            if value != 0.0 && state.motion.is_halted(axis) {
                return Err(Error::NotReady(NotReadyReason::AxisFaulted(axis)));
            }
        }
        Ok(())
    }

    /// A report for any body other than the selected one counts as the
    /// selected body not being tracked.
    pub async fn skeletal_frame(&self, frame: SkeletalFrame) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        if state.tracking.mode() != TrackingMode::Skeletal {
            return Ok(());
        }
        let target = state.tracking.target();
        let offset = if SkeletalTargetId::from_index(frame.body_index) == Some(target) {
            frame.offset
        } else {
            debug!(
                "Skeletal frame for body {} while tracking {}, treating as lost",
                frame.body_index, target
            );
            None
        };
        let update = state.motion.skeletal(offset);
        self.apply_motion(&mut state, update).await
    }

    pub async fn audio_frame(&self, frame: AudioFrame) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        if state.tracking.mode() != TrackingMode::Audible {
            return Ok(());
        }
        let update = state.motion.audible(frame, self.pan_tilt.is_ready());
        self.apply_motion(&mut state, update).await
    }

    /// Hardware travel-limit line. Applies in every tracking mode.
    pub async fn rage_limit(&self, direction: Direction, triggered: bool) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        let update = state.motion.rage_limit(direction, triggered);
        self.apply_motion(&mut state, update).await
    }

    /// Publishes interlock changes and sends the touched axes to the mount.
    async fn apply_motion(&self, state: &mut ControlState, update: MotionUpdate) -> Result<(), Error> {
        if let Some(dir) = update.tripped {
            self.event_bus.publish(KannonEvent::InterlockTripped(dir));
        }
        for dir in &update.cleared {
            info!("Interlock too far {} released", dir);
            self.event_bus.publish(KannonEvent::InterlockCleared(*dir));
        }
        if update.axes.is_empty() {
            return Ok(());
        }
        if !self.pan_tilt.is_ready() {
            debug!("Pan/tilt not ready, command kept for display only");
            return Ok(());
        }

        for axis in update.axes {
            let velocity = state.motion.velocity(axis);
            match self.pan_tilt.set_angle_offset(axis, velocity).await {
                Ok(()) => {}
                Err(e) if e.is_not_ready() => {
                    warn!("Pan/tilt dropped mid-command, discarding this tick: {}", e);
                    return Ok(());
                }
                Err(e) => return Err(self.halt_axis(state, axis, e).await),
            }
        }
        Ok(())
    }

    /// Stops `axis`, releases its servo and latches the axis until
    /// `reinitialize`. The other axis keeps running. Returns the error to
    /// hand back to the caller.
    async fn halt_axis(&self, state: &mut ControlState, axis: Axis, cause: ActuatorError) -> Error {
        error!("Halting {} axis: {}", axis, cause);
        state.motion.halt(axis);
        if let Err(e) = self.pan_tilt.set_angle_offset(axis, 0.0).await {
            error!("Failed to zero {} axis during halt: {}", axis, e);
        }
        if let Err(e) = self.pan_tilt.disengage_axis(axis).await {
            error!("Failed to disengage {} axis during halt: {}", axis, e);
        }
        self.event_bus.publish(KannonEvent::AxisHalted {
            axis,
            reason: cause.to_string(),
        });
        Error::AxisHalted { axis, source: cause }
    }

    /// Re-engages the servos, parks both at center, then clears halted axes.
    /// On failure the halts stay in place.
    pub async fn reinitialize(&self) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        if !self.pan_tilt.is_ready() {
            return Err(Error::NotReady(NotReadyReason::PanTiltNotAttached));
        }
        state.motion.zero_all();
        self.pan_tilt.engage().await?;
        for axis in Axis::ALL {
            self.pan_tilt.set_angle_offset(axis, 0.0).await?;
        }
        state.motion.clear_halts();
        info!("Pan/tilt re-initialized");
        Ok(())
    }

    /// Zeroes both axes, disengages and ends any fire pulse. Both axes stay
    /// halted until `reinitialize`. Keeps going past individual failures and
    /// reports the first one.
    pub async fn emergency_stop(&self) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        warn!("Emergency stop");
        self.cancel_pulse(&mut state).await;
        state.motion.zero_all();
        for axis in Axis::ALL {
            state.motion.halt(axis);
        }
        if !self.pan_tilt.is_ready() {
            return Ok(());
        }
        let mut first_err: Option<ActuatorError> = None;
        for axis in Axis::ALL {
            if let Err(e) = self.pan_tilt.set_angle_offset(axis, 0.0).await {
                error!("Emergency stop could not zero {} axis: {}", axis, e);
                first_err.get_or_insert(e);
            }
        }
        if let Err(e) = self.pan_tilt.disengage().await {
            error!("Emergency stop could not disengage: {}", e);
            first_err.get_or_insert(e);
        }
        match first_err {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    // ------------------------------------------------------------------
    // Fire control
    // ------------------------------------------------------------------

    /// Returns the new arm state, or `None` when the toggle was debounced.
    /// Disarming also ends a pulse in flight.
    pub async fn toggle_safety(&self) -> Option<ArmState> {
        let mut state = self.state.lock().await;
        let new_state = state.arming.toggle(Instant::now())?;
        self.event_bus.publish(KannonEvent::SafetyToggled {
            state: new_state,
            timestamp: Utc::now(),
        });
        if new_state == ArmState::Disarmed {
            self.cancel_pulse(&mut state).await;
        }
        Some(new_state)
    }

    /// Opens the valve for the configured pulse. A request while a pulse is
    /// already active is dropped; the running pulse is neither restarted nor
    /// extended.
    pub async fn request_fire(&self) -> Result<FireOutcome, Error> {
        let mut state = self.state.lock().await;
        if !state.arming.is_armed() {
            debug!("Fire request rejected, safety on");
            return Err(Error::NotReady(NotReadyReason::Disarmed));
        }
        if !self.relay.is_ready() {
            warn!("Fire request rejected, relay not attached");
            return Err(Error::NotReady(NotReadyReason::RelayNotAttached));
        }

        let duration = self.config.fire_pulse();
        let Some(pulse_id) = state.pulse.begin(Instant::now(), duration) else {
            let active = state.pulse.active_id().unwrap_or_default();
            debug!("Fire request dropped, pulse {} still active", active);
            return Ok(FireOutcome::AlreadyActive { pulse_id: active });
        };

        if let Err(e) = self.relay.set_relay(true).await {
            state.pulse.finish(pulse_id);
            if let Err(e2) = self.relay.set_relay(false).await {
                error!("Relay cleanup after failed fire also failed: {}", e2);
            }
            return Err(e.into());
        }

        let handle = spawn_fire_pulse_task(
            self.state.clone(),
            self.relay.clone(),
            self.event_bus.clone(),
            pulse_id,
            duration,
        );
        state.pulse.set_deassert_task(handle.abort_handle());
        info!("Fire pulse {} started for {:?}", pulse_id, duration);
        self.event_bus.publish(KannonEvent::FireStarted { pulse_id });
        Ok(FireOutcome::Started { pulse_id })
    }

    /// Ends the active pulse now. Returns its id if one was active.
    pub async fn cancel_fire(&self) -> Option<u64> {
        let mut state = self.state.lock().await;
        self.cancel_pulse(&mut state).await
    }

    async fn cancel_pulse(&self, state: &mut ControlState) -> Option<u64> {
        let pulse_id = state.pulse.cancel()?;
        if let Err(e) = self.relay.set_relay(false).await {
            error!("Failed to close relay when cancelling pulse {}: {}", pulse_id, e);
        }
        info!("Fire pulse {} cancelled", pulse_id);
        self.event_bus.publish(KannonEvent::FireCancelled { pulse_id });
        Some(pulse_id)
    }

    // ------------------------------------------------------------------
    // Status
    // ------------------------------------------------------------------

    pub async fn status(&self) -> ControlStatus {
        let state = self.state.lock().await;
        ControlStatus {
            pan_velocity: state.motion.velocity(Axis::Pan),
            tilt_velocity: state.motion.velocity(Axis::Tilt),
            tracking_mode: state.tracking.mode(),
            skeletal_target: state.tracking.target(),
            arm_state: state.arming.state(),
            pan_tilt_ready: self.pan_tilt.is_ready(),
            relay_ready: self.relay.is_ready(),
            firing: state.pulse.is_active(),
            interlocks: state.motion.interlocks(),
            faulted_axes: state.motion.halted_axes(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use crate::actuators::{MockPanTiltPort, MockRelayPort};

    fn ready_pan_tilt() -> MockPanTiltPort {
        let mut mock = MockPanTiltPort::new();
        mock.expect_is_ready().return_const(true);
        mock
    }

    fn ready_relay() -> MockRelayPort {
        let mut mock = MockRelayPort::new();
        mock.expect_is_ready().return_const(true);
        mock
    }

    fn service(pan_tilt: MockPanTiltPort, relay: MockRelayPort) -> ControlService {
        ControlService::new(
            ControlConfig::default(),
            Arc::new(pan_tilt),
            Arc::new(relay),
            Arc::new(EventBus::new()),
        )
    }

    #[tokio::test]
    async fn test_nudge_sends_clamped_offsets() {
        let mut pan_tilt = ready_pan_tilt();
        pan_tilt
            .expect_set_angle_offset()
            .with(eq(Axis::Tilt), eq(20.0))
            .times(1)
            .returning(|_, _| Ok(()));
        pan_tilt
            .expect_set_angle_offset()
            .with(eq(Axis::Tilt), eq(40.0))
            .times(1)
            .returning(|_, _| Ok(()));
        pan_tilt
            .expect_set_angle_offset()
            .with(eq(Axis::Tilt), eq(60.0))
            .times(2)
            .returning(|_, _| Ok(()));

        let svc = service(pan_tilt, ready_relay());
        for _ in 0..4 {
            svc.manual_nudge(Direction::Up).await.unwrap();
        }
        assert_eq!(svc.status().await.tilt_velocity, 60.0);
    }

    #[tokio::test]
    async fn test_not_ready_mount_gets_no_calls() {
        let mut pan_tilt = MockPanTiltPort::new();
        pan_tilt.expect_is_ready().return_const(false);
        pan_tilt.expect_set_angle_offset().never();

        let svc = service(pan_tilt, ready_relay());
        svc.manual_nudge(Direction::Left).await.unwrap();

        let status = svc.status().await;
        assert_eq!(status.pan_velocity, -20.0);
        assert!(!status.pan_tilt_ready);
    }

    #[tokio::test]
    async fn test_hardware_error_halts_axis_and_disengages() {
        let mut pan_tilt = ready_pan_tilt();
        pan_tilt
            .expect_set_angle_offset()
            .with(eq(Axis::Pan), eq(20.0))
            .times(1)
            .returning(|_, _| Err(ActuatorError::Hardware("servo stalled".into())));
        pan_tilt
            .expect_set_angle_offset()
            .with(eq(Axis::Pan), eq(0.0))
            .times(1)
            .returning(|_, _| Ok(()));
        pan_tilt
            .expect_disengage_axis()
            .with(eq(Axis::Pan))
            .times(1)
            .returning(|_| Ok(()));
        pan_tilt.expect_disengage().never();

        let svc = service(pan_tilt, ready_relay());
        let err = svc.manual_nudge(Direction::Right).await.unwrap_err();
        assert!(matches!(err, Error::AxisHalted { axis: Axis::Pan, .. }));

        // Halted axis takes no further commands.
        let err = svc.manual_nudge(Direction::Right).await.unwrap_err();
        assert!(matches!(err, Error::NotReady(NotReadyReason::AxisFaulted(Axis::Pan))));
        let status = svc.status().await;
        assert_eq!(status.pan_velocity, 0.0);
        assert_eq!(status.faulted_axes, vec![Axis::Pan]);
    }

    #[tokio::test]
    async fn test_mid_flight_not_ready_discards_without_halt() {
        let mut pan_tilt = ready_pan_tilt();
        pan_tilt
            .expect_set_angle_offset()
            .times(1)
            .returning(|_, _| Err(ActuatorError::NotReady("unplugged".into())));
        pan_tilt.expect_disengage().never();
        pan_tilt.expect_disengage_axis().never();

        let svc = service(pan_tilt, ready_relay());
        svc.rage_limit(Direction::Up, true).await.unwrap();

        let status = svc.status().await;
        assert!(status.faulted_axes.is_empty());
        assert!(status.interlocks.too_far_up);
    }

    #[tokio::test]
    async fn test_fire_rejected_while_disarmed() {
        let mut relay = ready_relay();
        relay.expect_set_relay().never();

        let svc = service(ready_pan_tilt(), relay);
        let err = svc.request_fire().await.unwrap_err();
        assert!(matches!(err, Error::NotReady(NotReadyReason::Disarmed)));
    }

    #[tokio::test]
    async fn test_fire_rejected_when_relay_unattached() {
        let mut relay = MockRelayPort::new();
        relay.expect_is_ready().return_const(false);
        relay.expect_set_relay().never();

        let svc = service(ready_pan_tilt(), relay);
        assert_eq!(svc.toggle_safety().await, Some(ArmState::Armed));
        let err = svc.request_fire().await.unwrap_err();
        assert!(matches!(err, Error::NotReady(NotReadyReason::RelayNotAttached)));
        assert!(err.is_recoverable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fire_pulse_opens_then_closes() {
        let mut relay = ready_relay();
        let mut seq = mockall::Sequence::new();
        relay
            .expect_set_relay()
            .with(eq(true))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        relay
            .expect_set_relay()
            .with(eq(false))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let svc = service(ready_pan_tilt(), relay);
        let mut events = svc.event_bus().subscribe(None);
        svc.toggle_safety().await;

        let outcome = svc.request_fire().await.unwrap();
        assert_eq!(outcome, FireOutcome::Started { pulse_id: 1 });
        assert_eq!(svc.request_fire().await.unwrap(), FireOutcome::AlreadyActive { pulse_id: 1 });
        assert!(svc.status().await.firing);

        loop {
            match events.recv().await {
                Some(KannonEvent::FireCompleted { pulse_id }) => {
                    assert_eq!(pulse_id, 1);
                    break;
                }
                Some(_) => continue,
                None => panic!("bus closed"),
            }
        }
        assert!(!svc.status().await.firing);
    }

    #[tokio::test]
    async fn test_failed_assert_leaves_no_pulse() {
        let mut relay = ready_relay();
        relay
            .expect_set_relay()
            .with(eq(true))
            .times(1)
            .returning(|_| Err(ActuatorError::Hardware("coil open".into())));
        relay
            .expect_set_relay()
            .with(eq(false))
            .times(1)
            .returning(|_| Ok(()));

        let svc = service(ready_pan_tilt(), relay);
        svc.toggle_safety().await;
        assert!(matches!(svc.request_fire().await, Err(Error::Actuator(_))));
        assert!(!svc.status().await.firing);
    }

    #[tokio::test]
    async fn test_mode_gates_sources() {
        let mut pan_tilt = ready_pan_tilt();
        pan_tilt.expect_set_angle_offset().never();

        let svc = service(pan_tilt, ready_relay());
        svc.skeletal_frame(SkeletalFrame::not_tracked(0)).await.unwrap();
        svc.audio_frame(AudioFrame { bearing_radians: 0.4, confidence: 1.0 }).await.unwrap();
        svc.select_mode(TrackingMode::Audible).await;
        svc.manual_nudge(Direction::Up).await.unwrap();

        let status = svc.status().await;
        assert_eq!(status.tracking_mode, TrackingMode::Audible);
        assert_eq!(status.tilt_velocity, 0.0);
        assert_eq!(status.pan_velocity, 0.0);
    }
}
