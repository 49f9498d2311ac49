// src/test_support.rs

//! In-memory device and multiplexer used by the unit tests.

use crate::common::{
    error::{OsError, EAGAIN},
    hal_traits::{MonotonicClock, Multiplexer, Readiness, SensorDevice},
    input::{RawEvent, RECORD_SIZE},
    timing::WaitTimeout,
};
use crate::config::SLOT_COUNT;
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// Errno-carrying error returned by the mocks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct MockError(pub i32);

impl OsError for MockError {
    fn errno(&self) -> i32 {
        self.0
    }
}

/// An attribute write as recorded by [`MockDevice`].
pub fn write(name: &str, value: &str) -> (String, String) {
    (name.to_string(), value.to_string())
}

#[derive(Debug, Default)]
struct DeviceState {
    stream: VecDeque<u8>,
    writes: Vec<(String, String)>,
    fail_read: Option<MockError>,
    fail_write: Option<MockError>,
    now: i64,
}

/// Scripted sensor device. Clones share state, so a test keeps one handle
/// while the driver owns another.
#[derive(Debug, Clone, Default)]
pub struct MockDevice {
    state: Arc<Mutex<DeviceState>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap()
    }

    pub fn push_records(&self, records: &[RawEvent]) {
        let mut state = self.state();
        for record in records {
            state.stream.extend(record.encode());
        }
    }

    pub fn push_bytes(&self, bytes: &[u8]) {
        self.state().stream.extend(bytes.iter().copied());
    }

    /// Whole records still waiting on the stream.
    pub fn pending_records(&self) -> usize {
        self.state().stream.len() / RECORD_SIZE
    }

    pub fn has_data(&self) -> bool {
        !self.state().stream.is_empty()
    }

    pub fn writes(&self) -> Vec<(String, String)> {
        self.state().writes.clone()
    }

    pub fn fail_next_read(&self, err: MockError) {
        self.state().fail_read = Some(err);
    }

    /// The next attribute write fails and is not recorded.
    pub fn fail_next_write(&self, err: MockError) {
        self.state().fail_write = Some(err);
    }

    pub fn set_now(&self, ns: i64) {
        self.state().now = ns;
    }
}

impl SensorDevice for MockDevice {
    type Error = MockError;

    fn read_raw(&mut self, buf: &mut [u8]) -> nb::Result<usize, Self::Error> {
        let mut state = self.state();
        if let Some(err) = state.fail_read.take() {
            return Err(nb::Error::Other(err));
        }
        if state.stream.is_empty() {
            return Err(nb::Error::WouldBlock);
        }
        let n = buf.len().min(state.stream.len());
        for (dst, src) in buf.iter_mut().zip(state.stream.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }

    fn write_attribute(&mut self, name: &str, value: &str) -> Result<(), Self::Error> {
        let mut state = self.state();
        if let Some(err) = state.fail_write.take() {
            return Err(err);
        }
        state.writes.push(write(name, value));
        Ok(())
    }
}

impl MonotonicClock for MockDevice {
    fn now_ns(&self) -> i64 {
        self.state().now
    }
}

#[derive(Debug, Default)]
struct MuxState {
    wake_bytes: VecDeque<u8>,
    waits: Vec<WaitTimeout>,
    fail_wait: Option<MockError>,
}

/// Multiplexer over a set of [`MockDevice`]s. A slot is readable while its
/// device has bytes queued.
#[derive(Debug, Clone)]
pub struct MockMux {
    devices: [MockDevice; SLOT_COUNT],
    state: Arc<(Mutex<MuxState>, Condvar)>,
}

impl MockMux {
    pub fn new(devices: &[MockDevice; SLOT_COUNT]) -> Self {
        MockMux {
            devices: devices.clone(),
            state: Arc::new((Mutex::new(MuxState::default()), Condvar::new())),
        }
    }

    /// Timeouts passed to `wait`, oldest first.
    pub fn waits(&self) -> Vec<WaitTimeout> {
        self.state.0.lock().unwrap().waits.clone()
    }

    pub fn fail_next_wait(&self, err: MockError) {
        self.state.0.lock().unwrap().fail_wait = Some(err);
    }

    /// Queues a raw byte on the wake channel.
    pub fn inject_wake_byte(&self, byte: u8) {
        let (lock, cvar) = &*self.state;
        lock.lock().unwrap().wake_bytes.push_back(byte);
        cvar.notify_all();
    }

    pub fn pending_wake_bytes(&self) -> usize {
        self.state.0.lock().unwrap().wake_bytes.len()
    }

    fn readiness(&self, state: &MuxState) -> Readiness {
        let mut ready = Readiness::default();
        for (slot, device) in ready.slots.iter_mut().zip(self.devices.iter()) {
            *slot = device.has_data();
        }
        ready.wake = !state.wake_bytes.is_empty();
        ready
    }
}

impl Multiplexer for MockMux {
    type Error = MockError;

    fn wait(&self, timeout: WaitTimeout) -> Result<Readiness, Self::Error> {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock().unwrap();
        state.waits.push(timeout);
        if let Some(err) = state.fail_wait.take() {
            return Err(err);
        }

        loop {
            let ready = self.readiness(&state);
            if timeout == WaitTimeout::Immediate || ready.count() > 0 {
                return Ok(ready);
            }
            // Devices do not notify; re-check periodically.
            state = cvar.wait_timeout(state, Duration::from_millis(2)).unwrap().0;
        }
    }

    fn wake(&self) -> Result<(), Self::Error> {
        self.inject_wake_byte(b'W');
        Ok(())
    }

    fn drain_wake(&self) -> Result<u8, Self::Error> {
        self.state
            .0
            .lock()
            .unwrap()
            .wake_bytes
            .pop_front()
            .ok_or(MockError(EAGAIN))
    }
}
