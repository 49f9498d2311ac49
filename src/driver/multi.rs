// src/driver/multi.rs

use super::{channel::Channel, enable_value, fill_reader, format_value, InputReader, SensorDriver};
use crate::common::{
    error::SensorError,
    event::{SensorEvent, SensorVector},
    hal_traits::{MonotonicClock, SensorDevice},
    handle::SensorHandle,
    input::{EV_ABS, EV_SYN},
};
use crate::config::{ChannelProfile, DeviceAttributes, MAX_CHANNELS};
use arrayvec::ArrayString;
use core::fmt::Write;
use heapless::Vec;
use log::{debug, warn};

/// Records buffered per fill for multi-channel devices.
pub const READER_CAPACITY: usize = 8;

/// Driver for a device whose stream interleaves several logical sensors
/// (compass fusion outputs, gyroscope plus die temperature).
///
/// Updates accumulate per channel until a sync barrier. The barrier flushes
/// dirty channels in profile order; if the caller's buffer fills up part way,
/// the barrier timestamp is kept in `pending_barrier` and the flush resumes
/// on the next `read_events`.
#[derive(Debug)]
pub struct MultiChannelDriver<IF> {
    io: IF,
    name: &'static str,
    attributes: DeviceAttributes,
    channels: Vec<Channel, MAX_CHANNELS>,
    /// Bit `i` set: channel `i` has updates since its last flush.
    dirty: u32,
    pending_barrier: Option<i64>,
    rate: Option<i64>,
    /// Latest sample received through `feed_sample`.
    fed: Option<SensorVector>,
    reader: InputReader<READER_CAPACITY>,
}

impl<IF> MultiChannelDriver<IF>
where
    IF: SensorDevice + MonotonicClock,
{
    /// Profiles beyond `MAX_CHANNELS` are ignored; `HubConfig::validate`
    /// rejects such configurations.
    pub fn new(
        io: IF,
        name: &'static str,
        attributes: DeviceAttributes,
        profiles: &'static [ChannelProfile],
    ) -> Self {
        MultiChannelDriver {
            io,
            name,
            attributes,
            channels: profiles.iter().take(MAX_CHANNELS).map(Channel::new).collect(),
            dirty: 0,
            pending_barrier: None,
            rate: None,
            fed: None,
            reader: InputReader::new(),
        }
    }

    pub fn is_enabled(&self, handle: SensorHandle) -> bool {
        self.channels.iter().any(|ch| ch.profile.handle == handle && ch.enabled)
    }

    fn any_enabled(&self) -> bool {
        self.channels.iter().any(|ch| ch.enabled)
    }

    fn channel_index(&self, handle: SensorHandle) -> Result<usize, SensorError<IF::Error>> {
        self.channels
            .iter()
            .position(|ch| ch.profile.handle == handle)
            .ok_or_else(|| {
                warn!("{}: handle {} is not served by this device", self.name, handle);
                SensorError::InvalidHandle(handle)
            })
    }

    /// Flushes the pending barrier into `out[*count..]`.
    ///
    /// Returns `false` if the buffer filled up before every dirty channel was
    /// handled; the barrier then stays pending.
    fn flush(&mut self, out: &mut [SensorEvent], count: &mut usize) -> bool {
        let Some(timestamp) = self.pending_barrier else {
            return true;
        };

        for (i, channel) in self.channels.iter_mut().enumerate() {
            let bit = 1 << i;
            if self.dirty & bit == 0 {
                continue;
            }
            if channel.enabled {
                if *count == out.len() {
                    return false;
                }
                out[*count] = channel.complete(timestamp);
                *count += 1;
            }
            self.dirty &= !bit;
        }

        self.pending_barrier = None;
        true
    }

    fn apply_update(&mut self, code: u16, value: i32) -> bool {
        for (i, channel) in self.channels.iter_mut().enumerate() {
            if channel.update(code, value) {
                self.dirty |= 1 << i;
                return true;
            }
        }
        false
    }

    fn write_fed_sample(&mut self) {
        let (Some(attribute), Some(v)) = (self.attributes.feed, self.fed) else {
            return;
        };

        // Milli-m/s^2, space separated.
        let mut value = ArrayString::<48>::new();
        let _ = write!(
            value,
            "{} {} {}",
            (v.x * 1000.0) as i32,
            (v.y * 1000.0) as i32,
            (v.z * 1000.0) as i32
        );

        if let Err(e) = self.io.write_attribute(attribute, &value) {
            warn!("{}: writing {} failed: {:?}", self.name, attribute, e);
        }
    }
}

impl<IF> SensorDriver for MultiChannelDriver<IF>
where
    IF: SensorDevice + MonotonicClock,
{
    type Error = IF::Error;

    fn set_enable(&mut self, handle: SensorHandle, enabled: bool) -> Result<(), SensorError<Self::Error>> {
        let idx = self.channel_index(handle)?;
        debug!("{}: enable {} {}", self.name, handle, enabled);

        if self.channels[idx].enabled == enabled {
            return Ok(());
        }

        let others = self
            .channels
            .iter()
            .enumerate()
            .any(|(i, ch)| i != idx && ch.enabled);
        if !others {
            self.io.write_attribute(self.attributes.enable, enable_value(enabled))?;
        }

        self.channels[idx].enabled = enabled;

        // The device just came up; hand it the newest sample it missed.
        if enabled && !others {
            self.write_fed_sample();
        }
        Ok(())
    }

    fn set_delay(&mut self, handle: SensorHandle, ns: i64) -> Result<(), SensorError<Self::Error>> {
        let idx = self.channel_index(handle)?;
        debug!("{}: set_delay {} {}", self.name, handle, ns);

        let channel = &self.channels[idx];
        if !channel.enabled || !channel.profile.rate_configurable {
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
        self.pending_barrier.is_some()
    }

    fn read_events(&mut self, out: &mut [SensorEvent]) -> Result<usize, SensorError<Self::Error>> {
        if out.is_empty() {
            return Err(SensorError::InvalidArgument);
        }

        let mut count = 0;
        if !self.flush(out, &mut count) {
            return Ok(count);
        }

        if let Err(e) = fill_reader(&mut self.reader, &mut self.io) {
            return if count > 0 { Ok(count) } else { Err(e) };
        }

        while count < out.len() {
            let Some(event) = self.reader.read_event().copied() else {
                break;
            };
            self.reader.next();

            match event.kind {
                EV_ABS => {
                    if !self.apply_update(event.code, event.value) {
                        warn!("{}: unknown event (type={}, code={})", self.name, event.kind, event.code);
                    }
                }
                EV_SYN => {
                    self.pending_barrier = Some(event.time.as_nanos());
                    if !self.flush(out, &mut count) {
                        break;
                    }
                }
                _ => warn!("{}: unknown event (type={}, code={})", self.name, event.kind, event.code),
            }
        }

        Ok(count)
    }

    fn feed_sample(&mut self, sample: &SensorEvent) {
        let Some(v) = sample.vector() else {
            return;
        };
        self.fed = Some(*v);
        if self.any_enabled() {
            self.write_fed_sample();
        }
    }
}
