// File: kannon-core/src/actuators/sim.rs
//
// In-memory boards for the demo binary and tests. They record every write
// and let the caller drive attach/detach and inject faults.

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::trace;
use kannon_common::ActuatorError;
use kannon_common::traits::{RelayBoard, ServoBoard};

const SERVO_CHANNELS: usize = 8;
const RELAY_OUTPUTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServoWrite {
    pub channel: usize,
    pub degrees: f64,
}

#[derive(Default)]
struct ServoInner {
    positions: [Option<f64>; SERVO_CHANNELS],
    engaged: [bool; SERVO_CHANNELS],
    writes: Vec<ServoWrite>,
    open_error: Option<String>,
    fault: Option<String>,
}

pub struct SimServoBoard {
    attached: watch::Sender<bool>,
    inner: Mutex<ServoInner>,
}

impl SimServoBoard {
    pub fn new() -> Self {
        let (attached, _) = watch::channel(false);
        Self {
            attached,
            inner: Mutex::new(ServoInner::default()),
        }
    }

    /// Completes the attach handshake. Only notifies on a real transition.
    pub fn attach(&self) {
        self.attached.send_if_modified(|a| !std::mem::replace(a, true));
    }

    pub fn detach(&self) {
        self.attached.send_if_modified(|a| std::mem::replace(a, false));
    }

    pub fn position(&self, channel: usize) -> Option<f64> {
        self.inner.lock().positions.get(channel).copied().flatten()
    }

    pub fn is_engaged(&self, channel: usize) -> bool {
        self.inner.lock().engaged.get(channel).copied().unwrap_or(false)
    }

    pub fn writes(&self) -> Vec<ServoWrite> {
        self.inner.lock().writes.clone()
    }

    pub fn write_count(&self) -> usize {
        self.inner.lock().writes.len()
    }

    pub fn fail_open(&self, reason: &str) {
        self.inner.lock().open_error = Some(reason.to_string());
    }

    /// Makes the next `set_position` call fail with a hardware error.
    pub fn inject_fault(&self, reason: &str) {
        self.inner.lock().fault = Some(reason.to_string());
    }
}

impl Default for SimServoBoard {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServoBoard for SimServoBoard {
    async fn open(&self) -> Result<(), ActuatorError> {
        match self.inner.lock().open_error.clone() {
            Some(reason) => Err(ActuatorError::Hardware(reason)),
            None => Ok(()),
        }
    }

    fn is_attached(&self) -> bool {
        *self.attached.borrow()
    }

    fn attach_events(&self) -> watch::Receiver<bool> {
        self.attached.subscribe()
    }

    async fn set_position(&self, channel: usize, degrees: f64) -> Result<(), ActuatorError> {
        if channel >= SERVO_CHANNELS {
            return Err(ActuatorError::InvalidChannel(channel));
        }
        let mut inner = self.inner.lock();
        if let Some(reason) = inner.fault.take() {
            return Err(ActuatorError::Hardware(reason));
        }
        trace!("sim servo {} => {:.2}", channel, degrees);
        inner.positions[channel] = Some(degrees);
        inner.writes.push(ServoWrite { channel, degrees });
        Ok(())
    }

    async fn set_engaged(&self, channel: usize, engaged: bool) -> Result<(), ActuatorError> {
        if channel >= SERVO_CHANNELS {
            return Err(ActuatorError::InvalidChannel(channel));
        }
        self.inner.lock().engaged[channel] = engaged;
        Ok(())
    }
}

#[derive(Default)]
struct RelayInner {
    outputs: [bool; RELAY_OUTPUTS],
    history: Vec<(Instant, usize, bool)>,
    open_error: Option<String>,
    fault: Option<String>,
}

pub struct SimRelayBoard {
    attached: watch::Sender<bool>,
    inner: Mutex<RelayInner>,
}

impl SimRelayBoard {
    pub fn new() -> Self {
        let (attached, _) = watch::channel(false);
        Self {
            attached,
            inner: Mutex::new(RelayInner::default()),
        }
    }

    pub fn attach(&self) {
        self.attached.send_if_modified(|a| !std::mem::replace(a, true));
    }

    pub fn detach(&self) {
        self.attached.send_if_modified(|a| std::mem::replace(a, false));
    }

    /// Every output write as `(when, index, value)`.
    pub fn history(&self) -> Vec<(Instant, usize, bool)> {
        self.inner.lock().history.clone()
    }

    pub fn fail_open(&self, reason: &str) {
        self.inner.lock().open_error = Some(reason.to_string());
    }

    pub fn inject_fault(&self, reason: &str) {
        self.inner.lock().fault = Some(reason.to_string());
    }
}

impl Default for SimRelayBoard {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RelayBoard for SimRelayBoard {
    async fn open(&self) -> Result<(), ActuatorError> {
        match self.inner.lock().open_error.clone() {
            Some(reason) => Err(ActuatorError::Hardware(reason)),
            None => Ok(()),
        }
    }

    fn is_attached(&self) -> bool {
        *self.attached.borrow()
    }

    fn attach_events(&self) -> watch::Receiver<bool> {
        self.attached.subscribe()
    }

    async fn set_output(&self, index: usize, on: bool) -> Result<(), ActuatorError> {
        if index >= RELAY_OUTPUTS {
            return Err(ActuatorError::InvalidChannel(index));
        }
        let mut inner = self.inner.lock();
        if let Some(reason) = inner.fault.take() {
            return Err(ActuatorError::Hardware(reason));
        }
        inner.outputs[index] = on;
        inner.history.push((Instant::now(), index, on));
        Ok(())
    }

    fn output(&self, index: usize) -> Result<bool, ActuatorError> {
        self.inner
            .lock()
            .outputs
            .get(index)
            .copied()
            .ok_or(ActuatorError::InvalidChannel(index))
    }
}
