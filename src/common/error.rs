// src/common/error.rs

use super::handle::SensorHandle;

/// Linux errno values reported through the host interface.
pub const EAGAIN: i32 = 11;
pub const EINVAL: i32 = 22;
pub const EIO: i32 = 5;

/// Backend errors that can be reported to the host as an errno value.
pub trait OsError: core::fmt::Debug {
    /// Positive errno describing this error.
    fn errno(&self) -> i32;
}

impl OsError for () {
    fn errno(&self) -> i32 {
        EIO
    }
}

#[cfg(feature = "std")]
impl OsError for std::io::Error {
    fn errno(&self) -> i32 {
        self.raw_os_error().unwrap_or(EIO)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SensorError<E = ()>
where
    E: core::fmt::Debug, // Still need Debug for the generic Io error
{
    /// Underlying I/O error from the device backend (attribute write, stream read, wait).
    #[error("I/O error: {0:?}")]
    Io(E),

    /// The device stream has nothing to read right now.
    #[error("No data available")]
    WouldBlock,

    /// Output buffer was empty.
    #[error("Invalid argument: output buffer has no room")]
    InvalidArgument,

    /// Handle is not routed to any driver, or not served by the addressed driver.
    #[error("Invalid sensor handle: {0}")]
    InvalidHandle(SensorHandle),
}

impl<E: OsError> SensorError<E> {
    /// Negated errno as returned to the host.
    pub fn status(&self) -> i32 {
        match self {
            SensorError::Io(e) => -e.errno(),
            SensorError::WouldBlock => -EAGAIN,
            SensorError::InvalidArgument | SensorError::InvalidHandle(_) => -EINVAL,
        }
    }
}

// Allow mapping from underlying backend error so `?` works on device calls
impl<E: core::fmt::Debug> From<E> for SensorError<E> {
    fn from(e: E) -> Self {
        SensorError::Io(e)
    }
}

/// Problems found while validating a [`HubConfig`](crate::config::HubConfig).
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Two routes claim the same handle.
    #[error("Handle {0} is routed more than once")]
    DuplicateRoute(SensorHandle),

    /// A listed sensor has no route to a driver slot.
    #[error("Sensor {0} is listed but not routed")]
    Unrouted(SensorHandle),

    /// A route points at a slot whose driver has no channel for the handle.
    #[error("Handle {0} is routed to a driver without a matching channel")]
    MissingChannel(SensorHandle),

    /// A route couples a slot whose driver cannot follow a foreign handle.
    #[error("Handle {0} is coupled to a multi-channel driver")]
    CoupledMultiChannel(SensorHandle),

    /// A multi-channel device declares more channels than a driver can hold.
    #[error("Device declares {got} channels, at most {max} supported")]
    TooManyChannels { got: usize, max: usize },
}
