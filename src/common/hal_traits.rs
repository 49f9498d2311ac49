// src/common/hal_traits.rs

use super::error::OsError;
use super::timing::WaitTimeout;
use crate::config::SLOT_COUNT;

/// Abstraction for the monotonic clock used to stamp synthetic events.
pub trait MonotonicClock {
    /// Current monotonic time in nanoseconds.
    fn now_ns(&self) -> i64;
}

/// Abstraction for one physical sensor device: its input-event stream and its
/// sysfs control attributes.
pub trait SensorDevice {
    /// Associated error type for device access errors.
    type Error: OsError;

    /// Attempts to read raw record bytes from the device's event stream.
    ///
    /// Returns `Ok(n)` with the number of bytes read, or `Err(nb::Error::WouldBlock)`
    /// if nothing is available yet. Other errors are returned as `Err(nb::Error::Other(Self::Error))`.
    fn read_raw(&mut self, buf: &mut [u8]) -> nb::Result<usize, Self::Error>;

    /// Writes a short ASCII value to the named control attribute of the device
    /// (e.g. `"1"` to `enable`).
    fn write_attribute(&mut self, name: &str, value: &str) -> Result<(), Self::Error>;
}

/// Readiness reported by one multiplexed wait.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct Readiness {
    /// Per driver slot: the device stream has data to read.
    pub slots: [bool; SLOT_COUNT],
    /// The wake channel was signalled.
    pub wake: bool,
}

impl Readiness {
    /// Number of ready descriptors, wake channel included.
    pub fn count(&self) -> usize {
        self.slots.iter().filter(|r| **r).count() + usize::from(self.wake)
    }
}

/// Abstraction for the blocking wait across all device streams plus the wake channel.
///
/// Every method takes `&self`: `wake` is called from a control context while
/// another context is blocked in `wait`.
pub trait Multiplexer {
    /// Associated error type for wait/wake errors.
    type Error: OsError;

    /// Waits until at least one device stream or the wake channel is ready, or
    /// returns immediately for [`WaitTimeout::Immediate`].
    fn wait(&self, timeout: WaitTimeout) -> Result<Readiness, Self::Error>;

    /// Signals the wake channel with one byte.
    fn wake(&self) -> Result<(), Self::Error>;

    /// Consumes one byte from the wake channel and returns it.
    fn drain_wake(&self) -> Result<u8, Self::Error>;
}
