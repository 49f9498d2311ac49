// src/common/event.rs

use super::handle::SensorHandle;

/// Sensor type tags, numbered like the host's sensor type constants.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
#[repr(i32)]
pub enum SensorType {
    /// Placeholder for unwritten buffer slots.
    #[default]
    Unknown = 0,
    Accelerometer = 1,
    MagneticField = 2,
    Orientation = 3,
    Gyroscope = 4,
    Light = 5,
    Proximity = 8,
    RotationVector = 11,
    AmbientTemperature = 13,
}

impl SensorType {
    /// Tries to convert a raw host type number into a SensorType.
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(SensorType::Accelerometer),
            2 => Some(SensorType::MagneticField),
            3 => Some(SensorType::Orientation),
            4 => Some(SensorType::Gyroscope),
            5 => Some(SensorType::Light),
            8 => Some(SensorType::Proximity),
            11 => Some(SensorType::RotationVector),
            13 => Some(SensorType::AmbientTemperature),
            _ => None,
        }
    }

    /// Payload shape carried by events of this type.
    pub const fn empty_payload(self) -> Payload {
        match self {
            SensorType::Accelerometer
            | SensorType::MagneticField
            | SensorType::Orientation
            | SensorType::Gyroscope => Payload::Vector(SensorVector::ZERO),
            SensorType::RotationVector => Payload::Raw([0.0; 4]),
            SensorType::Unknown
            | SensorType::Light
            | SensorType::Proximity
            | SensorType::AmbientTemperature => Payload::Scalar(0.0),
        }
    }
}

/// Three-axis reading with an accuracy status.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct SensorVector {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub status: i8,
}

impl SensorVector {
    pub const ZERO: SensorVector = SensorVector { x: 0.0, y: 0.0, z: 0.0, status: 0 };
}

/// Event payload.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Payload {
    /// Accelerometer, magnetometer, orientation, gyroscope.
    Vector(SensorVector),
    /// Light (lux), proximity (distance), temperature.
    Scalar(f32),
    /// Uninterpreted component block (rotation vector x, y, z, w).
    Raw([f32; 4]),
}

impl Default for Payload {
    fn default() -> Self {
        Payload::Scalar(0.0)
    }
}

/// A completed, timestamped sensor reading handed to the host.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct SensorEvent {
    /// Layout version of this record, the size of the structure in bytes.
    pub version: i32,
    pub sensor: SensorHandle,
    pub kind: SensorType,
    /// Monotonic nanoseconds.
    pub timestamp: i64,
    pub payload: Payload,
}

impl SensorEvent {
    pub const VERSION: i32 = core::mem::size_of::<SensorEvent>() as i32;

    /// A zeroed event for the given logical sensor.
    pub const fn new(sensor: SensorHandle, kind: SensorType) -> Self {
        SensorEvent {
            version: Self::VERSION,
            sensor,
            kind,
            timestamp: 0,
            payload: kind.empty_payload(),
        }
    }

    pub fn vector(&self) -> Option<&SensorVector> {
        match &self.payload {
            Payload::Vector(v) => Some(v),
            _ => None,
        }
    }

    pub fn scalar(&self) -> Option<f32> {
        match self.payload {
            Payload::Scalar(s) => Some(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape_follows_type() {
        let accel = SensorEvent::new(SensorHandle::ACCELEROMETER, SensorType::Accelerometer);
        assert_eq!(accel.vector(), Some(&SensorVector::ZERO));
        assert_eq!(accel.version, SensorEvent::VERSION);

        let light = SensorEvent::new(SensorHandle::LIGHT, SensorType::Light);
        assert_eq!(light.scalar(), Some(0.0));

        let rot = SensorEvent::new(SensorHandle::ROTATION_VECTOR, SensorType::RotationVector);
        assert_eq!(rot.payload, Payload::Raw([0.0; 4]));
    }

    #[test]
    fn test_type_from_i32() {
        assert_eq!(SensorType::from_i32(13), Some(SensorType::AmbientTemperature));
        assert_eq!(SensorType::from_i32(8), Some(SensorType::Proximity));
        assert_eq!(SensorType::from_i32(6), None);
    }
}
