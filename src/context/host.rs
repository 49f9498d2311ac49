// src/context/host.rs

//! Integer-status entry points for a host that speaks the classic sensors
//! device interface: `0` or a non-negative count on success, a negated errno
//! on failure.

use super::PollContext;
use crate::common::{
    error::{OsError, SensorError},
    event::SensorEvent,
    hal_traits::{MonotonicClock, Multiplexer, SensorDevice},
    handle::SensorHandle,
};
use crate::config::SensorDescriptor;

fn status<E: OsError>(result: Result<(), SensorError<E>>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => e.status(),
    }
}

pub fn activate<IF, M>(ctx: &PollContext<IF, M>, handle: i32, enabled: bool) -> i32
where
    IF: SensorDevice + MonotonicClock,
    M: Multiplexer<Error = IF::Error>,
{
    status(ctx.activate(SensorHandle::new(handle), enabled))
}

pub fn set_delay<IF, M>(ctx: &PollContext<IF, M>, handle: i32, ns: i64) -> i32
where
    IF: SensorDevice + MonotonicClock,
    M: Multiplexer<Error = IF::Error>,
{
    status(ctx.set_delay(SensorHandle::new(handle), ns))
}

/// Number of events written to `data`, or a negated errno.
pub fn poll_events<IF, M>(ctx: &PollContext<IF, M>, data: &mut [SensorEvent]) -> i32
where
    IF: SensorDevice + MonotonicClock,
    M: Multiplexer<Error = IF::Error>,
{
    match ctx.poll_events(data) {
        Ok(n) => i32::try_from(n).unwrap_or(i32::MAX),
        Err(e) => e.status(),
    }
}

/// The sensor table and its length, as returned by `get_sensors_list`.
pub fn sensors_list<IF, M>(ctx: &PollContext<IF, M>) -> (&'static [SensorDescriptor], i32)
where
    IF: SensorDevice + MonotonicClock,
    M: Multiplexer<Error = IF::Error>,
{
    let list = ctx.sensors_list();
    (list, list.len() as i32)
}
