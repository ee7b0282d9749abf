// File: kannon-core/src/fire_control/arming.rs

use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};
use kannon_common::models::ArmState;

/// Virtual safety with a minimum dwell between toggles.
///
/// Always starts `Disarmed`; there is no constructor that takes a prior state.
#[derive(Debug, Clone)]
pub struct ArmingStateMachine {
    state: ArmState,
    last_toggle: Option<Instant>,
    dwell: Duration,
}

impl ArmingStateMachine {
    pub fn new(dwell: Duration) -> Self {
        Self {
            state: ArmState::Disarmed,
            last_toggle: None,
            dwell,
        }
    }

    pub fn state(&self) -> ArmState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        self.state == ArmState::Armed
    }

    pub fn last_toggle(&self) -> Option<Instant> {
        self.last_toggle
    }

    /// Flips the safety if at least `dwell` has passed since the last
    /// accepted toggle. A toggle that comes too soon is dropped silently and
    /// `None` is returned.
    pub fn toggle(&mut self, now: Instant) -> Option<ArmState> {
        if let Some(last) = self.last_toggle {
            let since = now.saturating_duration_since(last);
            if since < self.dwell {
                debug!("Safety toggle ignored, {:?} since last toggle", since);
                return None;
            }
        }
        self.state = self.state.toggled();
        self.last_toggle = Some(now);
        info!("Safety toggled => {}", self.state);
        Some(self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DWELL: Duration = Duration::from_secs(5);

    #[test]
    fn test_powers_up_disarmed() {
        let m = ArmingStateMachine::new(DWELL);
        assert_eq!(m.state(), ArmState::Disarmed);
        assert!(m.last_toggle().is_none());
    }

    #[test]
    fn test_first_toggle_is_immediate() {
        let mut m = ArmingStateMachine::new(DWELL);
        assert_eq!(m.toggle(Instant::now()), Some(ArmState::Armed));
        assert!(m.is_armed());
    }

    #[test]
    fn test_double_toggle_within_dwell_changes_once() {
        let t0 = Instant::now();
        let mut m = ArmingStateMachine::new(DWELL);
        assert_eq!(m.toggle(t0), Some(ArmState::Armed));
        assert_eq!(m.toggle(t0 + Duration::from_millis(4999)), None);
        assert_eq!(m.state(), ArmState::Armed);
    }

    #[test]
    fn test_toggle_schedule() {
        let t0 = Instant::now();
        let mut m = ArmingStateMachine::new(DWELL);
        assert_eq!(m.toggle(t0), Some(ArmState::Armed));
        assert_eq!(m.toggle(t0 + Duration::from_secs(2)), None);
        assert_eq!(m.toggle(t0 + Duration::from_secs(6)), Some(ArmState::Disarmed));
    }

    #[test]
    fn test_rejected_toggle_does_not_restart_dwell() {
        let t0 = Instant::now();
        let mut m = ArmingStateMachine::new(DWELL);
        m.toggle(t0);
        assert_eq!(m.toggle(t0 + Duration::from_secs(4)), None);
        assert_eq!(m.toggle(t0 + Duration::from_secs(5)), Some(ArmState::Disarmed));
    }
}
