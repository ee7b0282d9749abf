// File: kannon-core/src/config.rs

use std::fs;
use std::path::Path;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use tracing::info;
use kannon_common::Error;

/// Tunables for the control core. Every field has a default matching the
/// stock mount (HS-322HD servos centered at 115 degrees).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Largest velocity magnitude the generator will ever command.
    pub speed_limit: f64,
    /// Velocity change per manual nudge.
    pub nudge_step: f64,
    /// Servo center position; also the largest offset the port accepts.
    pub zero_movement_point: f64,
    /// Minimum interval between two arm/disarm toggles.
    pub safety_dwell_ms: u64,
    /// How long the firing valve stays open per shot.
    pub fire_pulse_ms: u64,
    /// Audio frames below this confidence count as a lost target.
    pub min_audio_confidence: f64,
    pub pan_channel: usize,
    pub tilt_channel: usize,
    pub relay_output: usize,
    /// Per-subscriber event queue length.
    pub event_buffer: usize,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            speed_limit: 60.0,
            nudge_step: 20.0,
            zero_movement_point: 115.0,
            safety_dwell_ms: 5000,
            fire_pulse_ms: 300,
            min_audio_confidence: 0.0,
            pan_channel: 0,
            tilt_channel: 1,
            relay_output: 0,
            event_buffer: 1024,
        }
    }
}

impl ControlConfig {
    /// Reads a JSON config file. Missing fields fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let config = Self::from_json(&raw)?;
        info!("Loaded control config from {}", path.display());
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self, Error> {
        let de = &mut serde_json::Deserializer::from_str(raw);
        let config: ControlConfig = serde_path_to_error::deserialize(de)
            .map_err(|e| Error::Config(format!("{} at '{}'", e.inner(), e.path())))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the mount could never honor. A speed limit above the
    /// zero movement point would command travel past the servo's range.
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.speed_limit > 0.0) {
            return Err(Error::Config(format!("speed_limit must be positive, got {}", self.speed_limit)));
        }
        if !(self.nudge_step > 0.0) {
            return Err(Error::Config(format!("nudge_step must be positive, got {}", self.nudge_step)));
        }
        if !(self.zero_movement_point > 0.0) {
            return Err(Error::Config(format!(
                "zero_movement_point must be positive, got {}",
                self.zero_movement_point
            )));
        }
        if self.speed_limit > self.zero_movement_point {
            return Err(Error::Config(format!(
                "speed_limit {} exceeds zero_movement_point {}",
                self.speed_limit, self.zero_movement_point
            )));
        }
        if self.safety_dwell_ms == 0 {
            return Err(Error::Config("safety_dwell_ms must be non-zero".into()));
        }
        if self.fire_pulse_ms == 0 {
            return Err(Error::Config("fire_pulse_ms must be non-zero".into()));
        }
        if self.pan_channel == self.tilt_channel {
            return Err(Error::Config(format!(
                "pan and tilt share servo channel {}",
                self.pan_channel
            )));
        }
        if self.event_buffer == 0 {
            return Err(Error::Config("event_buffer must be non-zero".into()));
        }
        Ok(())
    }

    pub fn safety_dwell(&self) -> Duration {
        Duration::from_millis(self.safety_dwell_ms)
    }

    pub fn fire_pulse(&self) -> Duration {
        Duration::from_millis(self.fire_pulse_ms)
    }
}
