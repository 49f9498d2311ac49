// src/common/timing.rs

use core::time::Duration;

// === Kernel time conversion ===

pub const NANOS_PER_SEC: i64 = 1_000_000_000;
pub const NANOS_PER_MILLI: i64 = 1_000_000;
pub const NANOS_PER_MICRO: i64 = 1_000;

/// Converts a kernel `timeval` into nanoseconds.
#[inline]
pub const fn timeval_to_ns(sec: i64, usec: i64) -> i64 {
    sec * NANOS_PER_SEC + usec * NANOS_PER_MICRO
}

// === Sampling rate ===

/// Unit a device's poll-rate attribute is expressed in.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RateUnit {
    /// e.g. `pollrate_ms` on the LIS3DH and L3G4200D.
    Millis,
    /// e.g. `als_poll_delay` on the APDS-9900.
    Micros,
}

impl RateUnit {
    /// Converts a sampling period to the device's native unit, truncating.
    #[inline]
    pub const fn from_nanos(self, ns: i64) -> i64 {
        match self {
            RateUnit::Millis => ns / NANOS_PER_MILLI,
            RateUnit::Micros => ns / NANOS_PER_MICRO,
        }
    }
}

// === Waiting ===

/// How long a multiplexed wait may block.
///
/// There is no finite timeout: the poll loop either checks opportunistically
/// or sleeps until something happens.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum WaitTimeout {
    /// Return immediately with whatever is ready.
    Immediate,
    /// Block until a descriptor or the wake channel becomes ready.
    Indefinite,
}

impl WaitTimeout {
    /// Timeout argument for `poll(2)`.
    #[inline]
    pub const fn as_poll_millis(self) -> i32 {
        match self {
            WaitTimeout::Immediate => 0,
            WaitTimeout::Indefinite => -1,
        }
    }

    /// `None` means forever.
    pub const fn as_duration(self) -> Option<Duration> {
        match self {
            WaitTimeout::Immediate => Some(Duration::ZERO),
            WaitTimeout::Indefinite => None,
        }
    }
}
