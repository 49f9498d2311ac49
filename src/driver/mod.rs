// src/driver/mod.rs

// Declare the modules within the driver directory.
pub mod channel;
pub mod multi;
pub mod reader;
pub mod single;

pub use multi::MultiChannelDriver;
pub use reader::InputReader;
pub use single::SingleChannelDriver;

use crate::common::{
    error::{OsError, SensorError},
    event::SensorEvent,
    hal_traits::{MonotonicClock, SensorDevice},
    handle::SensorHandle,
};
use crate::config::{DeviceConfig, DriverProfile};
use arrayvec::ArrayString;
use core::fmt::Write;

/// Contract shared by every physical-device driver.
pub trait SensorDriver {
    /// Associated error type of the underlying device.
    type Error: OsError;

    /// Turns the logical sensor `handle` on or off. Idempotent; on failure the
    /// driver state is left unchanged.
    fn set_enable(&mut self, handle: SensorHandle, enabled: bool) -> Result<(), SensorError<Self::Error>>;

    /// Requests a sampling period in nanoseconds. No-op for disabled or
    /// non-configurable channels.
    fn set_delay(&mut self, handle: SensorHandle, ns: i64) -> Result<(), SensorError<Self::Error>>;

    /// A completed event is waiting to be returned without reading the device.
    fn has_pending_events(&self) -> bool;

    /// Drains completed events into `out`, returning how many were written.
    fn read_events(&mut self, out: &mut [SensorEvent]) -> Result<usize, SensorError<Self::Error>>;

    /// Receives a sample produced by another driver. Ignored by default.
    fn feed_sample(&mut self, _sample: &SensorEvent) {}
}

/// The driver bound to one slot, selected from the slot's profile.
#[derive(Debug)]
pub enum Driver<IF> {
    Single(SingleChannelDriver<IF>),
    Multi(MultiChannelDriver<IF>),
}

impl<IF> Driver<IF>
where
    IF: SensorDevice + MonotonicClock,
{
    pub fn new(io: IF, device: &DeviceConfig) -> Self {
        match device.profile {
            DriverProfile::Single(profile) => {
                Driver::Single(SingleChannelDriver::new(io, device.input_name, device.attributes, profile))
            }
            DriverProfile::Multi(profiles) => {
                Driver::Multi(MultiChannelDriver::new(io, device.input_name, device.attributes, profiles))
            }
        }
    }

    /// Whether `handle` is currently on. A single-channel driver answers
    /// for its one channel whatever handle is asked, matching how it
    /// accepts coupled handles in `set_enable`.
    pub fn is_enabled(&self, handle: SensorHandle) -> bool {
        match self {
            Driver::Single(d) => d.is_enabled(),
            Driver::Multi(d) => d.is_enabled(handle),
        }
    }
}

impl<IF> SensorDriver for Driver<IF>
where
    IF: SensorDevice + MonotonicClock,
{
    type Error = IF::Error;

    fn set_enable(&mut self, handle: SensorHandle, enabled: bool) -> Result<(), SensorError<Self::Error>> {
        match self {
            Driver::Single(d) => d.set_enable(handle, enabled),
            Driver::Multi(d) => d.set_enable(handle, enabled),
        }
    }

    fn set_delay(&mut self, handle: SensorHandle, ns: i64) -> Result<(), SensorError<Self::Error>> {
        match self {
            Driver::Single(d) => d.set_delay(handle, ns),
            Driver::Multi(d) => d.set_delay(handle, ns),
        }
    }

    fn has_pending_events(&self) -> bool {
        match self {
            Driver::Single(d) => d.has_pending_events(),
            Driver::Multi(d) => d.has_pending_events(),
        }
    }

    fn read_events(&mut self, out: &mut [SensorEvent]) -> Result<usize, SensorError<Self::Error>> {
        match self {
            Driver::Single(d) => d.read_events(out),
            Driver::Multi(d) => d.read_events(out),
        }
    }

    fn feed_sample(&mut self, sample: &SensorEvent) {
        match self {
            Driver::Single(d) => d.feed_sample(sample),
            Driver::Multi(d) => d.feed_sample(sample),
        }
    }
}

// --- Helpers shared by the driver variants ---

/// Value written to an enable attribute.
#[inline]
pub(crate) const fn enable_value(enabled: bool) -> &'static str {
    if enabled {
        "1"
    } else {
        "0"
    }
}

/// Formats an integer attribute value without allocating.
pub(crate) fn format_value(value: i64) -> ArrayString<20> {
    let mut buf = ArrayString::new();
    // i64::MIN is 20 characters, so this cannot overflow.
    let _ = write!(buf, "{}", value);
    buf
}

/// Fills `reader`, tolerating an empty stream while records from a
/// truncated call are still buffered.
pub(crate) fn fill_reader<D: SensorDevice, const N: usize>(
    reader: &mut InputReader<N>,
    device: &mut D,
) -> Result<(), SensorError<D::Error>> {
    match reader.fill(device) {
        Ok(_) => Ok(()),
        Err(SensorError::WouldBlock) if !reader.is_empty() => Ok(()),
        Err(e) => Err(e),
    }
}
