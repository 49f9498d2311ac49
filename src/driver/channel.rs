// src/driver/channel.rs

use crate::common::event::{Payload, SensorEvent};
use crate::config::{ChannelProfile, Field, FieldMap};

/// One logical channel of a driver: its profile, enable state and the event
/// being assembled from field updates.
#[derive(Debug, Clone)]
pub struct Channel {
    pub profile: &'static ChannelProfile,
    pub enabled: bool,
    pending: SensorEvent,
}

impl Channel {
    pub fn new(profile: &'static ChannelProfile) -> Self {
        Channel {
            profile,
            enabled: false,
            pending: SensorEvent::new(profile.handle, profile.kind),
        }
    }

    /// Applies an `EV_ABS` update. Returns `false` if the code is not one of
    /// this channel's fields.
    pub fn update(&mut self, code: u16, value: i32) -> bool {
        match self.profile.field_for(code) {
            Some(map) => {
                apply(&mut self.pending.payload, map, value);
                true
            }
            None => false,
        }
    }

    /// The accumulated event, stamped with `timestamp`.
    pub fn complete(&mut self, timestamp: i64) -> SensorEvent {
        self.pending.timestamp = timestamp;
        self.pending
    }
}

fn apply(payload: &mut Payload, map: &FieldMap, value: i32) {
    let scaled = value as f32 * map.scale;
    match (payload, map.field) {
        (Payload::Vector(v), Field::X) => v.x = scaled,
        (Payload::Vector(v), Field::Y) => v.y = scaled,
        (Payload::Vector(v), Field::Z) => v.z = scaled,
        (Payload::Vector(v), Field::Status) => v.status = value as i8,
        (Payload::Raw(r), Field::X) => r[0] = scaled,
        (Payload::Raw(r), Field::Y) => r[1] = scaled,
        (Payload::Raw(r), Field::Z) => r[2] = scaled,
        (Payload::Raw(r), Field::W) => r[3] = scaled,
        (Payload::Scalar(s), Field::Scalar) => *s = scaled,
        // Field does not exist in this payload shape; profile mismatch.
        _ => {}
    }
}
