// File: kannon-core/src/fire_control/pulse.rs

use std::time::Duration;
use tokio::task::AbortHandle;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FirePulse {
    #[default]
    Idle,
    Active {
        id: u64,
        started: Instant,
        duration: Duration,
    },
}

/// Bookkeeping for the single fire pulse that may be in flight.
///
/// The relay itself is driven by the control service; this type only tracks
/// which pulse is active and the handle of the task that will end it.
#[derive(Debug, Default)]
pub struct FirePulseSequencer {
    pulse: FirePulse,
    next_id: u64,
    deassert_task: Option<AbortHandle>,
}

impl FirePulseSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pulse(&self) -> FirePulse {
        self.pulse
    }

    pub fn is_active(&self) -> bool {
        matches!(self.pulse, FirePulse::Active { .. })
    }

    pub fn active_id(&self) -> Option<u64> {
        match self.pulse {
            FirePulse::Active { id, .. } => Some(id),
            FirePulse::Idle => None,
        }
    }

    /// Marks a new pulse active and returns its id, or `None` if one is
    /// already active. An active pulse is never replaced or extended.
    pub fn begin(&mut self, now: Instant, duration: Duration) -> Option<u64> {
        if self.is_active() {
            return None;
        }
        self.next_id += 1;
        let id = self.next_id;
        self.pulse = FirePulse::Active { id, started: now, duration };
        Some(id)
    }

    pub fn set_deassert_task(&mut self, handle: AbortHandle) {
        self.deassert_task = Some(handle);
    }

    /// Ends pulse `id`. Returns `false` if that pulse is no longer the active
    /// one, so a late task never ends a newer pulse.
    pub fn finish(&mut self, id: u64) -> bool {
        if self.active_id() != Some(id) {
            return false;
        }
        self.pulse = FirePulse::Idle;
        self.deassert_task = None;
        true
    }

    /// Ends the active pulse early, aborting its scheduled deassertion.
    pub fn cancel(&mut self) -> Option<u64> {
        let id = self.active_id()?;
        if let Some(handle) = self.deassert_task.take() {
            handle.abort();
        }
        self.pulse = FirePulse::Idle;
        Some(id)
    }
}
