// File: kannon-core/src/tracking/mod.rs

use tracing::{debug, info};
use kannon_common::models::{SkeletalTargetId, TargetSelection, TrackingMode};

/// Holds the active tracking mode and the skeletal target selection.
///
/// Mode selection is unconditional. Target selection only applies while in
/// skeletal mode and wraps within the six body slots.
#[derive(Debug, Clone, Default)]
pub struct TrackingModeMachine {
    mode: TrackingMode,
    target: SkeletalTargetId,
}

impl TrackingModeMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> TrackingMode {
        self.mode
    }

    pub fn target(&self) -> SkeletalTargetId {
        self.target
    }

    /// Returns `true` if the mode actually changed.
    pub fn select_mode(&mut self, mode: TrackingMode) -> bool {
        if self.mode == mode {
            return false;
        }
        info!("Tracking mode {} => {}", self.mode, mode);
        self.mode = mode;
        true
    }

    /// Applies a target selection. Returns the new target, or `None` when the
    /// event was ignored because skeletal tracking is not active.
    pub fn select_target(&mut self, selection: TargetSelection) -> Option<SkeletalTargetId> {
        if self.mode != TrackingMode::Skeletal {
            debug!("Ignoring target selection {:?} in {} mode", selection, self.mode);
            return None;
        }
        self.target = match selection {
            TargetSelection::Letter(id) => id,
            TargetSelection::Next => self.target.next(),
            TargetSelection::Prev => self.target.prev(),
            TargetSelection::Reset => SkeletalTargetId::A,
        };
        debug!("Skeletal target => {}", self.target);
        Some(self.target)
    }
}
