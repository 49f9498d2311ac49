// src/common/handle.rs

use core::fmt;

/// Externally addressable identity of a logical sensor.
///
/// Several handles may be served by one physical device (the gyroscope chip
/// also reports temperature), and one handle may need a second device to be
/// computed (orientation needs the accelerometer).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct SensorHandle(i32);

impl SensorHandle {
    pub const ACCELEROMETER: SensorHandle = SensorHandle(0);
    pub const MAGNETIC_FIELD: SensorHandle = SensorHandle(1);
    pub const ORIENTATION: SensorHandle = SensorHandle(2);
    pub const ROTATION_VECTOR: SensorHandle = SensorHandle(3);
    pub const PROXIMITY: SensorHandle = SensorHandle(4);
    pub const LIGHT: SensorHandle = SensorHandle(5);
    pub const GYROSCOPE: SensorHandle = SensorHandle(6);
    pub const TEMPERATURE: SensorHandle = SensorHandle(7);

    /// Wraps a raw host handle. Validity is decided by routing, not here.
    #[inline]
    pub const fn new(raw: i32) -> Self {
        SensorHandle(raw)
    }

    #[inline]
    pub const fn as_i32(&self) -> i32 {
        self.0
    }
}

impl Default for SensorHandle {
    /// An unrouted handle, used for unwritten event slots.
    fn default() -> Self {
        SensorHandle(-1)
    }
}

impl From<i32> for SensorHandle {
    fn from(value: i32) -> Self {
        SensorHandle(value)
    }
}

impl From<SensorHandle> for i32 {
    fn from(value: SensorHandle) -> Self {
        value.0
    }
}

impl fmt::Display for SensorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
