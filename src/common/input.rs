// src/common/input.rs

//! Raw input-event records as delivered by the kernel's evdev interface.
//!
//! A record is `struct input_event { struct timeval time; u16 type; u16 code; s32 value; }`.
//! `timeval` is two C `long`s, so the record is 24 bytes on 64-bit targets and
//! 16 bytes on 32-bit ones.

use super::timing;

// === Event types ===

/// Sync barrier: all updates since the previous barrier form one sample.
pub const EV_SYN: u16 = 0x00;
/// Absolute axis update.
pub const EV_ABS: u16 = 0x03;

// === Absolute axis codes ===

pub const ABS_X: u16 = 0x00;
pub const ABS_Y: u16 = 0x01;
pub const ABS_Z: u16 = 0x02;
pub const ABS_RY: u16 = 0x04;
pub const ABS_RZ: u16 = 0x05;
pub const ABS_THROTTLE: u16 = 0x06;
pub const ABS_RUDDER: u16 = 0x07;
pub const ABS_WHEEL: u16 = 0x08;
pub const ABS_HAT0Y: u16 = 0x11;
pub const ABS_HAT1X: u16 = 0x12;
pub const ABS_HAT1Y: u16 = 0x13;
pub const ABS_DISTANCE: u16 = 0x19;
pub const ABS_TILT_X: u16 = 0x1a;
pub const ABS_TILT_Y: u16 = 0x1b;
pub const ABS_TOOL_WIDTH: u16 = 0x1c;
pub const ABS_VOLUME: u16 = 0x20;
pub const ABS_MISC: u16 = 0x28;

/// Width of a C `long` on the target.
const LONG_SIZE: usize = core::mem::size_of::<isize>();

/// Size in bytes of one encoded record.
pub const RECORD_SIZE: usize = 2 * LONG_SIZE + 8;

/// Kernel timestamp of a record.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct TimeVal {
    pub sec: i64,
    pub usec: i64,
}

impl TimeVal {
    #[inline]
    pub const fn as_nanos(&self) -> i64 {
        timing::timeval_to_ns(self.sec, self.usec)
    }
}

/// One decoded input-event record.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct RawEvent {
    pub time: TimeVal,
    pub kind: u16,
    pub code: u16,
    pub value: i32,
}

impl RawEvent {
    pub const fn new(time: TimeVal, kind: u16, code: u16, value: i32) -> Self {
        RawEvent { time, kind, code, value }
    }

    /// An absolute-axis update.
    pub const fn abs(code: u16, value: i32) -> Self {
        RawEvent::new(TimeVal { sec: 0, usec: 0 }, EV_ABS, code, value)
    }

    /// A sync barrier stamped with the given kernel time.
    pub const fn sync(time: TimeVal) -> Self {
        RawEvent::new(time, EV_SYN, 0, 0)
    }

    #[inline]
    pub const fn is_sync(&self) -> bool {
        self.kind == EV_SYN
    }

    /// Decodes one record in native byte order. `bytes` must hold `RECORD_SIZE` bytes.
    pub fn decode(bytes: &[u8; RECORD_SIZE]) -> Self {
        let sec = read_long(&bytes[..LONG_SIZE]);
        let usec = read_long(&bytes[LONG_SIZE..2 * LONG_SIZE]);
        let rest = &bytes[2 * LONG_SIZE..];
        RawEvent {
            time: TimeVal { sec, usec },
            kind: u16::from_ne_bytes([rest[0], rest[1]]),
            code: u16::from_ne_bytes([rest[2], rest[3]]),
            value: i32::from_ne_bytes([rest[4], rest[5], rest[6], rest[7]]),
        }
    }

    /// Encodes the record the way the kernel writes it.
    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut out = [0u8; RECORD_SIZE];
        out[..LONG_SIZE].copy_from_slice(&(self.time.sec as isize).to_ne_bytes());
        out[LONG_SIZE..2 * LONG_SIZE].copy_from_slice(&(self.time.usec as isize).to_ne_bytes());
        let rest = &mut out[2 * LONG_SIZE..];
        rest[0..2].copy_from_slice(&self.kind.to_ne_bytes());
        rest[2..4].copy_from_slice(&self.code.to_ne_bytes());
        rest[4..8].copy_from_slice(&self.value.to_ne_bytes());
        out
    }
}

fn read_long(bytes: &[u8]) -> i64 {
    let mut word = [0u8; LONG_SIZE];
    word.copy_from_slice(bytes);
    isize::from_ne_bytes(word) as i64
}
