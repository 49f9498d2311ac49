// src/driver/single.rs

use super::{channel::Channel, enable_value, fill_reader, format_value, InputReader, SensorDriver};
use crate::common::{
    error::SensorError,
    event::SensorEvent,
    hal_traits::{MonotonicClock, SensorDevice},
    handle::SensorHandle,
    input::{EV_ABS, EV_SYN},
};
use crate::config::{ChannelProfile, DeviceAttributes};
use log::{debug, warn};

/// Records buffered per fill for single-channel devices.
pub const READER_CAPACITY: usize = 4;

/// Driver for a device that reports exactly one logical sensor
/// (accelerometer, light, proximity).
///
/// Enabling the device queues a synthetic sample carrying the last known
/// values, so a consumer sees a reading before the hardware produces one.
#[derive(Debug)]
pub struct SingleChannelDriver<IF> {
    io: IF,
    name: &'static str,
    attributes: DeviceAttributes,
    channel: Channel,
    dirty: bool,
    first_event: bool,
    rate: Option<i64>,
    reader: InputReader<READER_CAPACITY>,
}

impl<IF> SingleChannelDriver<IF>
where
    IF: SensorDevice + MonotonicClock,
{
    pub fn new(
        io: IF,
        name: &'static str,
        attributes: DeviceAttributes,
        profile: &'static ChannelProfile,
    ) -> Self {
        SingleChannelDriver {
            io,
            name,
            attributes,
            channel: Channel::new(profile),
            dirty: false,
            first_event: false,
            rate: None,
            reader: InputReader::new(),
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.channel.enabled
    }
}

impl<IF> SensorDriver for SingleChannelDriver<IF>
where
    IF: SensorDevice + MonotonicClock,
{
    type Error = IF::Error;

    // `handle` is only traced: coupled fusion handles enable this device too.
    fn set_enable(&mut self, handle: SensorHandle, enabled: bool) -> Result<(), SensorError<Self::Error>> {
        debug!("{}: enable {} {}", self.name, handle, enabled);

        if self.channel.enabled == enabled {
            return Ok(());
        }

        self.io.write_attribute(self.attributes.enable, enable_value(enabled))?;

        self.channel.enabled = enabled;
        self.first_event = enabled;
        Ok(())
    }

    fn set_delay(&mut self, handle: SensorHandle, ns: i64) -> Result<(), SensorError<Self::Error>> {
        debug!("{}: set_delay {} {}", self.name, handle, ns);

        if !self.channel.enabled {
            return Ok(());
        }

        let native = self.attributes.rate_unit.from_nanos(ns);
        if self.rate == Some(native) {
            return Ok(());
        }

        self.io.write_attribute(self.attributes.poll_rate, &format_value(native))?;
        self.rate = Some(native);
        Ok(())
    }

    fn has_pending_events(&self) -> bool {
        self.first_event
    }

    fn read_events(&mut self, out: &mut [SensorEvent]) -> Result<usize, SensorError<Self::Error>> {
        if out.is_empty() {
            return Err(SensorError::InvalidArgument);
        }

        if self.first_event {
            self.first_event = false;
            if !self.channel.enabled {
                return Ok(0);
            }
            out[0] = self.channel.complete(self.io.now_ns());
            return Ok(1);
        }

        fill_reader(&mut self.reader, &mut self.io)?;

        let mut count = 0;
        while count < out.len() {
            let Some(event) = self.reader.read_event().copied() else {
                break;
            };

            match event.kind {
                EV_ABS => {
                    if self.channel.update(event.code, event.value) {
                        self.dirty = true;
                    } else {
                        warn!("{}: unknown event (type={}, code={})", self.name, event.kind, event.code);
                    }
                }
                EV_SYN => {
                    let completed = self.channel.complete(event.time.as_nanos());
                    if self.dirty && self.channel.enabled {
                        out[count] = completed;
                        count += 1;
                    }
                    self.dirty = false;
                }
                _ => warn!("{}: unknown event (type={}, code={})", self.name, event.kind, event.code),
            }
            self.reader.next();
        }

        Ok(count)
    }
}
