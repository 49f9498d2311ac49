// src/config/u8860.rs

//! Sensor set of the Huawei U8860: LIS3DH accelerometer, AK8975 compass with
//! AKM fusion outputs, L3G4200D gyroscope/thermometer and APDS-9900
//! light/proximity chip.

use super::{
    ChannelProfile, DeviceAttributes, DeviceConfig, DriverProfile, Feed, Field, FieldMap,
    HubConfig, Route, SensorDescriptor, Slot,
};
use crate::common::{
    event::SensorType,
    handle::SensorHandle,
    input::*,
    timing::RateUnit,
};

// === Conversion constants ===

pub const GRAVITY_EARTH: f32 = 9.80665;
/// 1024 LSB = 1 g
const LSG: f32 = 1024.0;
pub const MAX_RANGE_A: f32 = 2.0 * GRAVITY_EARTH;
/// Acceleration counts to m/s^2.
pub const CONVERT_A: f32 = GRAVITY_EARTH / LSG;
/// Magnetic counts to uT.
pub const CONVERT_M: f32 = 0.06;
/// Orientation Q6 to degrees.
pub const CONVERT_O: f32 = 1.0 / 64.0;
/// Rotation vector Q14 to float.
pub const CONVERT_R: f32 = 1.0 / 16384.0;
const DEG_TO_RAD: f32 = core::f32::consts::PI / 180.0;
pub const MAX_RANGE_G: f32 = 2000.0 * DEG_TO_RAD;
/// Angular velocity in millidegrees/s to rad/s.
pub const CONVERT_G: f32 = (70.0 / 1000.0) * DEG_TO_RAD;

// === Descriptor table ===

const SENSORS: [SensorDescriptor; 8] = [
    SensorDescriptor {
        name: "LIS3DH 3-axis Accelerometer",
        vendor: "ST Microelectronics",
        version: 1,
        handle: SensorHandle::ACCELEROMETER,
        kind: SensorType::Accelerometer,
        max_range: MAX_RANGE_A,
        resolution: CONVERT_A,
        power: 0.145,
        min_delay_us: 10_000,
    },
    SensorDescriptor {
        name: "AK8975 3-axis Magnetic field sensor",
        vendor: "Asahi Kasei Microdevices",
        version: 1,
        handle: SensorHandle::MAGNETIC_FIELD,
        kind: SensorType::MagneticField,
        max_range: 1228.8,
        resolution: CONVERT_M,
        power: 0.35,
        min_delay_us: 10_000,
    },
    SensorDescriptor {
        name: "AKM Orientation sensor",
        vendor: "Asahi Kasei Microdevices",
        version: 1,
        handle: SensorHandle::ORIENTATION,
        kind: SensorType::Orientation,
        max_range: 360.0,
        resolution: CONVERT_O,
        power: 1.0,
        min_delay_us: 10_000,
    },
    SensorDescriptor {
        name: "AKM Rotation vector sensor",
        vendor: "Asahi Kasei Microdevices",
        version: 1,
        handle: SensorHandle::ROTATION_VECTOR,
        kind: SensorType::RotationVector,
        max_range: 34.907,
        resolution: CONVERT_R,
        power: 1.0,
        min_delay_us: 10_000,
    },
    SensorDescriptor {
        name: "L3G4200D Gyroscope sensor",
        vendor: "ST Microelectronics",
        version: 1,
        handle: SensorHandle::GYROSCOPE,
        kind: SensorType::Gyroscope,
        max_range: MAX_RANGE_G,
        resolution: CONVERT_G,
        power: 6.1,
        min_delay_us: 2_000,
    },
    SensorDescriptor {
        name: "L3G4200D Temperature sensor",
        vendor: "ST Microelectronics",
        version: 1,
        handle: SensorHandle::TEMPERATURE,
        kind: SensorType::AmbientTemperature,
        max_range: 85.0,
        resolution: 1.0,
        power: 6.1,
        min_delay_us: 2_000,
    },
    SensorDescriptor {
        name: "APDS-9900 Light sensor",
        vendor: "Avago Technologies",
        version: 1,
        handle: SensorHandle::LIGHT,
        kind: SensorType::Light,
        max_range: 60000.0,
        resolution: 0.0125,
        power: 0.20,
        min_delay_us: 1_000,
    },
    SensorDescriptor {
        name: "APDS-9900 Proximity sensor",
        vendor: "Avago Technologies",
        version: 1,
        handle: SensorHandle::PROXIMITY,
        kind: SensorType::Proximity,
        max_range: 1.0,
        resolution: 1.0,
        power: 3.0,
        min_delay_us: 1_000,
    },
];

// === Routing ===

/// Fusion outputs need accelerometer samples.
const FUSION_NEEDS: &[Slot] = &[Slot::Accelerometer];

const ROUTES: [Route; 8] = [
    Route { handle: SensorHandle::ACCELEROMETER, slot: Slot::Accelerometer, coupled: &[] },
    Route { handle: SensorHandle::MAGNETIC_FIELD, slot: Slot::Fusion, coupled: &[] },
    Route { handle: SensorHandle::ORIENTATION, slot: Slot::Fusion, coupled: FUSION_NEEDS },
    Route { handle: SensorHandle::ROTATION_VECTOR, slot: Slot::Fusion, coupled: FUSION_NEEDS },
    Route { handle: SensorHandle::GYROSCOPE, slot: Slot::Gyroscope, coupled: &[] },
    Route { handle: SensorHandle::TEMPERATURE, slot: Slot::Gyroscope, coupled: &[] },
    Route { handle: SensorHandle::LIGHT, slot: Slot::Light, coupled: &[] },
    Route { handle: SensorHandle::PROXIMITY, slot: Slot::Proximity, coupled: &[] },
];

const FEEDS: [Feed; 1] = [Feed { source: Slot::Accelerometer, sink: Slot::Fusion }];

// === Channel profiles ===

const ACCEL: ChannelProfile = ChannelProfile {
    handle: SensorHandle::ACCELEROMETER,
    kind: SensorType::Accelerometer,
    fields: &[
        FieldMap::new(ABS_X, Field::X, CONVERT_A),
        FieldMap::new(ABS_Y, Field::Y, CONVERT_A),
        FieldMap::new(ABS_Z, Field::Z, CONVERT_A),
        FieldMap::new(ABS_WHEEL, Field::Status, 1.0),
    ],
    rate_configurable: true,
};

const FUSION: [ChannelProfile; 3] = [
    ChannelProfile {
        handle: SensorHandle::MAGNETIC_FIELD,
        kind: SensorType::MagneticField,
        fields: &[
            FieldMap::new(ABS_RY, Field::X, CONVERT_M),
            FieldMap::new(ABS_RZ, Field::Y, CONVERT_M),
            FieldMap::new(ABS_THROTTLE, Field::Z, CONVERT_M),
            FieldMap::new(ABS_RUDDER, Field::Status, 1.0),
        ],
        rate_configurable: true,
    },
    ChannelProfile {
        handle: SensorHandle::ORIENTATION,
        kind: SensorType::Orientation,
        fields: &[
            // yaw, pitch, roll
            FieldMap::new(ABS_HAT0Y, Field::X, CONVERT_O),
            FieldMap::new(ABS_HAT1X, Field::Y, CONVERT_O),
            FieldMap::new(ABS_HAT1Y, Field::Z, CONVERT_O),
        ],
        rate_configurable: true,
    },
    ChannelProfile {
        handle: SensorHandle::ROTATION_VECTOR,
        kind: SensorType::RotationVector,
        fields: &[
            FieldMap::new(ABS_TILT_X, Field::X, CONVERT_R),
            FieldMap::new(ABS_TILT_Y, Field::Y, CONVERT_R),
            FieldMap::new(ABS_TOOL_WIDTH, Field::Z, CONVERT_R),
            FieldMap::new(ABS_VOLUME, Field::W, CONVERT_R),
        ],
        rate_configurable: true,
    },
];

// Gyroscope first: it wins when both are due on the same barrier.
const GYRO: [ChannelProfile; 2] = [
    ChannelProfile {
        handle: SensorHandle::GYROSCOPE,
        kind: SensorType::Gyroscope,
        fields: &[
            FieldMap::new(ABS_X, Field::X, CONVERT_G),
            FieldMap::new(ABS_Y, Field::Y, CONVERT_G),
            FieldMap::new(ABS_Z, Field::Z, CONVERT_G),
        ],
        rate_configurable: true,
    },
    ChannelProfile {
        handle: SensorHandle::TEMPERATURE,
        kind: SensorType::AmbientTemperature,
        fields: &[FieldMap::new(ABS_MISC, Field::Scalar, 1.0)],
        // Rides on the gyroscope rate.
        rate_configurable: false,
    },
];

const LIGHT: ChannelProfile = ChannelProfile {
    handle: SensorHandle::LIGHT,
    kind: SensorType::Light,
    fields: &[FieldMap::new(ABS_MISC, Field::Scalar, 1.0)],
    rate_configurable: true,
};

const PROXIMITY: ChannelProfile = ChannelProfile {
    handle: SensorHandle::PROXIMITY,
    kind: SensorType::Proximity,
    fields: &[FieldMap::new(ABS_DISTANCE, Field::Scalar, 1.0)],
    rate_configurable: true,
};

// === Devices ===

const LIS3DH_SYSFS_PATH: &str = "/sys/bus/i2c/devices/0-0018";
const AKM8975_SYSFS_PATH: &str = "/sys/bus/i2c/devices/0-000c";
const L3G4200D_SYSFS_PATH: &str = "/sys/bus/i2c/devices/0-0068";
const APDS9900_SYSFS_PATH: &str = "/sys/bus/i2c/devices/0-0039";

pub(super) const CONFIG: HubConfig = HubConfig {
    sensors: &SENSORS,
    routes: &ROUTES,
    feeds: &FEEDS,
    devices: [
        DeviceConfig {
            input_name: "lis3dh_acc",
            sysfs_root: LIS3DH_SYSFS_PATH,
            attributes: DeviceAttributes {
                enable: "enable",
                poll_rate: "pollrate_ms",
                rate_unit: RateUnit::Millis,
                feed: None,
            },
            profile: DriverProfile::Single(&ACCEL),
        },
        DeviceConfig {
            input_name: "compass",
            sysfs_root: AKM8975_SYSFS_PATH,
            attributes: DeviceAttributes {
                enable: "enable",
                poll_rate: "delay_ms",
                rate_unit: RateUnit::Millis,
                feed: Some("accel_data"),
            },
            profile: DriverProfile::Multi(&FUSION),
        },
        DeviceConfig {
            input_name: "l3g4200d",
            sysfs_root: L3G4200D_SYSFS_PATH,
            attributes: DeviceAttributes {
                enable: "enable",
                poll_rate: "pollrate_ms",
                rate_unit: RateUnit::Millis,
                feed: None,
            },
            profile: DriverProfile::Multi(&GYRO),
        },
        DeviceConfig {
            input_name: "apds9900_als",
            sysfs_root: APDS9900_SYSFS_PATH,
            attributes: DeviceAttributes {
                enable: "enable_als_sensor",
                poll_rate: "als_poll_delay",
                rate_unit: RateUnit::Micros,
                feed: None,
            },
            profile: DriverProfile::Single(&LIGHT),
        },
        DeviceConfig {
            input_name: "apds9900_ps",
            sysfs_root: APDS9900_SYSFS_PATH,
            attributes: DeviceAttributes {
                enable: "enable_ps_sensor",
                poll_rate: "ps_poll_delay",
                rate_unit: RateUnit::Micros,
                feed: None,
            },
            profile: DriverProfile::Single(&PROXIMITY),
        },
    ],
};
