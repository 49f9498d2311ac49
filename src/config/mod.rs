// src/config/mod.rs

//! Immutable hub configuration: the sensor descriptor table, the handle
//! routing table, cross-device feeds and one device description per driver
//! slot. Built once at startup and handed to the poll context.

pub mod u8860;

use crate::common::{
    error::ConfigError,
    event::SensorType,
    handle::SensorHandle,
    timing::RateUnit,
};

/// Number of driver slots owned by a poll context.
pub const SLOT_COUNT: usize = 5;

/// Most logical channels one multi-channel driver can multiplex.
pub const MAX_CHANNELS: usize = 4;

/// A driver slot. The declaration order is the drain priority order.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(usize)]
pub enum Slot {
    Accelerometer = 0,
    Fusion = 1,
    Gyroscope = 2,
    Light = 3,
    Proximity = 4,
}

impl Slot {
    /// All slots in drain priority order.
    pub const ALL: [Slot; SLOT_COUNT] = [
        Slot::Accelerometer,
        Slot::Fusion,
        Slot::Gyroscope,
        Slot::Light,
        Slot::Proximity,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Static metadata of one logical sensor, exposed to the host unchanged.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SensorDescriptor {
    pub name: &'static str,
    pub vendor: &'static str,
    pub version: i32,
    pub handle: SensorHandle,
    pub kind: SensorType,
    pub max_range: f32,
    pub resolution: f32,
    /// Power draw in mA.
    pub power: f32,
    /// Minimum sampling period in microseconds.
    pub min_delay_us: i32,
}

/// Where a logical handle is served, and which other slots must follow its
/// enable/rate state.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Route {
    pub handle: SensorHandle,
    pub slot: Slot,
    /// Slots whose data is needed to compute this handle.
    pub coupled: &'static [Slot],
}

/// Samples produced by `source` are forwarded to the `sink` driver.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Feed {
    pub source: Slot,
    pub sink: Slot,
}

/// Event field an input code updates.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Field {
    X,
    Y,
    Z,
    /// Fourth component of a raw block (rotation vector w).
    W,
    /// Accuracy status of a vector reading, not scaled.
    Status,
    Scalar,
}

/// Maps one input code to an event field with a scale factor.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FieldMap {
    pub code: u16,
    pub field: Field,
    pub scale: f32,
}

impl FieldMap {
    pub const fn new(code: u16, field: Field, scale: f32) -> Self {
        FieldMap { code, field, scale }
    }
}

/// One logical channel carried by a device stream.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ChannelProfile {
    pub handle: SensorHandle,
    pub kind: SensorType,
    pub fields: &'static [FieldMap],
    /// Whether a rate request for this channel reaches the device.
    pub rate_configurable: bool,
}

impl ChannelProfile {
    /// Field mapping for an input code, if this channel owns it.
    pub fn field_for(&self, code: u16) -> Option<&FieldMap> {
        self.fields.iter().find(|f| f.code == code)
    }
}

/// Shape of the driver bound to a slot.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum DriverProfile {
    /// One logical sensor per stream; reports a synthetic sample on enable.
    Single(&'static ChannelProfile),
    /// Several logical sensors share one stream and one physical enable.
    Multi(&'static [ChannelProfile]),
}

impl DriverProfile {
    pub fn channels(&self) -> &'static [ChannelProfile] {
        match *self {
            DriverProfile::Single(ch) => core::slice::from_ref(ch),
            DriverProfile::Multi(chs) => chs,
        }
    }
}

/// Control attribute names of a device.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DeviceAttributes {
    pub enable: &'static str,
    pub poll_rate: &'static str,
    pub rate_unit: RateUnit,
    /// Attribute receiving forwarded samples from a feed, if any.
    pub feed: Option<&'static str>,
}

/// Everything needed to open and drive one physical device.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DeviceConfig {
    /// Input device name as reported by the kernel.
    pub input_name: &'static str,
    /// Directory holding the device's control attributes.
    pub sysfs_root: &'static str,
    pub attributes: DeviceAttributes,
    pub profile: DriverProfile,
}

/// The complete, immutable hub configuration.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct HubConfig {
    pub sensors: &'static [SensorDescriptor],
    pub routes: &'static [Route],
    pub feeds: &'static [Feed],
    /// Indexed by [`Slot::index`].
    pub devices: [DeviceConfig; SLOT_COUNT],
}

impl HubConfig {
    /// Configuration of the Huawei U8860 sensor set.
    pub const fn u8860() -> Self {
        u8860::CONFIG
    }

    #[inline]
    pub fn device(&self, slot: Slot) -> &DeviceConfig {
        &self.devices[slot.index()]
    }

    /// The route serving `handle`, if any.
    pub fn route(&self, handle: SensorHandle) -> Option<&Route> {
        self.routes.iter().find(|r| r.handle == handle)
    }

    /// Feeds whose source is `slot`.
    pub fn feeds_from(&self, slot: Slot) -> impl Iterator<Item = &Feed> {
        self.feeds.iter().filter(move |f| f.source == slot)
    }

    /// Checks the structural invariants the poll context relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, route) in self.routes.iter().enumerate() {
            if self.routes[..i].iter().any(|r| r.handle == route.handle) {
                return Err(ConfigError::DuplicateRoute(route.handle));
            }
            let served = self
                .device(route.slot)
                .profile
                .channels()
                .iter()
                .any(|ch| ch.handle == route.handle);
            if !served {
                return Err(ConfigError::MissingChannel(route.handle));
            }
            // Coupled drivers are switched with the routed handle, which only
            // a single-channel driver accepts.
            let coupled_multi = route
                .coupled
                .iter()
                .any(|slot| matches!(self.device(*slot).profile, DriverProfile::Multi(_)));
            if coupled_multi {
                return Err(ConfigError::CoupledMultiChannel(route.handle));
            }
        }

        for sensor in self.sensors {
            if self.route(sensor.handle).is_none() {
                return Err(ConfigError::Unrouted(sensor.handle));
            }
        }

        for device in &self.devices {
            let got = device.profile.channels().len();
            if got > MAX_CHANNELS {
                return Err(ConfigError::TooManyChannels { got, max: MAX_CHANNELS });
            }
        }

        Ok(())
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self::u8860()
    }
}
