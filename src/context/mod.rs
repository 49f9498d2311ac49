// src/context/mod.rs

//! The poll context: owns one driver per slot plus the multiplexer, routes
//! control requests by handle and gathers events from every device into the
//! caller's buffer.

pub mod host;

use crate::common::{
    error::SensorError,
    event::SensorEvent,
    hal_traits::{MonotonicClock, Multiplexer, SensorDevice},
    handle::SensorHandle,
    timing::WaitTimeout,
};
use crate::config::{HubConfig, Route, SensorDescriptor, Slot, SLOT_COUNT};
use crate::driver::{Driver, SensorDriver};
use core::sync::atomic::{AtomicBool, Ordering};
use log::{error, warn};

// Hosted builds park a thread waiting on a slot, bare builds spin.
#[cfg(feature = "std")]
type SlotLock<T> = std::sync::Mutex<T>;
#[cfg(feature = "std")]
type SlotGuard<'a, T> = std::sync::MutexGuard<'a, T>;
#[cfg(not(feature = "std"))]
type SlotLock<T> = spin::Mutex<T>;
#[cfg(not(feature = "std"))]
type SlotGuard<'a, T> = spin::MutexGuard<'a, T>;

/// Byte written to the wake channel by `activate`.
pub const WAKE_MESSAGE: u8 = b'W';

/// Multiplexes the configured sensor devices behind one blocking poll.
///
/// All methods take `&self`. `activate` and `set_delay` may be called from
/// other threads while one thread is blocked in `poll_events`; each driver
/// slot is locked only for the duration of a single driver call and never
/// across the wait.
///
/// With the `std` feature the slot locks are `std::sync::Mutex`, so a poll
/// waiting on a slot whose attribute write is in flight sleeps. Without it
/// they are `spin` locks and the waiter spins for the length of that write.
pub struct PollContext<IF, M> {
    config: HubConfig,
    drivers: [SlotLock<Driver<IF>>; SLOT_COUNT],
    /// Readable state of each slot as last reported by the multiplexer.
    /// Only `poll_events` touches it.
    ready: [AtomicBool; SLOT_COUNT],
    mux: M,
}

impl<IF, M> PollContext<IF, M>
where
    IF: SensorDevice + MonotonicClock,
    M: Multiplexer<Error = IF::Error>,
{
    /// Builds the drivers, `devices[i]` serving `Slot::ALL[i]`.
    ///
    /// The configuration is expected to have passed [`HubConfig::validate`].
    pub fn new(config: HubConfig, devices: [IF; SLOT_COUNT], mux: M) -> Self {
        let mut index = 0;
        let drivers = devices.map(|io| {
            let driver = Driver::new(io, &config.devices[index]);
            index += 1;
            SlotLock::new(driver)
        });

        PollContext {
            config,
            drivers,
            ready: core::array::from_fn(|_| AtomicBool::new(false)),
            mux,
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Sensors exposed to the host.
    pub fn sensors_list(&self) -> &'static [SensorDescriptor] {
        self.config.sensors
    }

    fn route(&self, handle: SensorHandle) -> Result<&Route, SensorError<IF::Error>> {
        self.config.route(handle).ok_or(SensorError::InvalidHandle(handle))
    }

    fn driver(&self, slot: Slot) -> SlotGuard<'_, Driver<IF>> {
        let lock = &self.drivers[slot.index()];
        // Driver state only changes after a successful write, so a poisoned
        // slot is still consistent.
        #[cfg(feature = "std")]
        let guard = lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        #[cfg(not(feature = "std"))]
        let guard = lock.lock();
        guard
    }

    /// Turns a logical sensor on or off, together with the slots it is
    /// coupled to. Enabling wakes a blocked `poll_events`.
    ///
    /// If any slot fails, the slots this call already switched are switched
    /// back before the error is returned.
    pub fn activate(&self, handle: SensorHandle, enabled: bool) -> Result<(), SensorError<IF::Error>> {
        let route = self.route(handle)?;

        // Bit `i` set: slot `i` changed state during this call.
        let mut changed = 0u32;
        for slot in core::iter::once(route.slot).chain(route.coupled.iter().copied()) {
            let mut driver = self.driver(slot);
            let before = driver.is_enabled(handle);
            if let Err(e) = driver.set_enable(handle, enabled) {
                drop(driver);
                self.restore_enable(handle, !enabled, changed);
                return Err(e);
            }
            if before != enabled {
                changed |= 1 << slot.index();
            }
        }

        if enabled {
            if let Err(e) = self.mux.wake() {
                error!("error sending wake message: {:?}", e);
            }
        }
        Ok(())
    }

    fn restore_enable(&self, handle: SensorHandle, enabled: bool, changed: u32) {
        for slot in Slot::ALL.iter().rev().filter(|s| changed & (1 << s.index()) != 0) {
            if let Err(e) = self.driver(*slot).set_enable(handle, enabled) {
                warn!("{:?}: couldn't restore enable state of {}: {:?}", slot, handle, e);
            }
        }
    }

    /// Sets the sampling period of a logical sensor and the slots it is
    /// coupled to. The first failure is returned.
    pub fn set_delay(&self, handle: SensorHandle, ns: i64) -> Result<(), SensorError<IF::Error>> {
        let route = self.route(handle)?;

        self.driver(route.slot).set_delay(handle, ns)?;
        for slot in route.coupled {
            self.driver(*slot).set_delay(handle, ns)?;
        }
        Ok(())
    }

    /// Fills `out` with events from all devices.
    ///
    /// Blocks until at least one event is available, then keeps collecting
    /// whatever is immediately ready until nothing is left or `out` is full.
    /// Only a failed wait is reported as an error; a device whose read fails
    /// is logged and skipped for this round.
    pub fn poll_events(&self, out: &mut [SensorEvent]) -> Result<usize, SensorError<IF::Error>> {
        if out.is_empty() {
            return Err(SensorError::InvalidArgument);
        }

        let mut count = 0;
        loop {
            for slot in Slot::ALL {
                if count == out.len() {
                    break;
                }
                count += self.drain_slot(slot, &mut out[count..]);
            }

            if count == out.len() {
                break;
            }

            let timeout = if count > 0 {
                WaitTimeout::Immediate
            } else {
                WaitTimeout::Indefinite
            };
            let readiness = self.mux.wait(timeout).map_err(|e| {
                error!("poll() failed: {:?}", e);
                SensorError::Io(e)
            })?;

            for (ready, signalled) in self.ready.iter().zip(readiness.slots) {
                ready.store(signalled, Ordering::Relaxed);
            }

            if readiness.wake {
                match self.mux.drain_wake() {
                    Ok(WAKE_MESSAGE) => {}
                    Ok(other) => error!("unknown message on wake queue (0x{:02x})", other),
                    Err(e) => error!("error reading from wake pipe: {:?}", e),
                }
            }

            if readiness.count() == 0 {
                break;
            }
        }

        Ok(count)
    }

    /// Reads one slot into `out` if it is readable or has a pending event.
    /// Returns how many events were written.
    fn drain_slot(&self, slot: Slot, out: &mut [SensorEvent]) -> usize {
        let i = slot.index();
        let room = out.len();

        let mut driver = self.driver(slot);
        if !self.ready[i].load(Ordering::Relaxed) && !driver.has_pending_events() {
            return 0;
        }

        let n = match driver.read_events(out) {
            Ok(n) => n,
            Err(SensorError::WouldBlock) => 0,
            Err(e) => {
                warn!("{:?}: read failed: {:?}", slot, e);
                0
            }
        };
        drop(driver);

        if n < room {
            self.ready[i].store(false, Ordering::Relaxed);
        }

        if n > 0 {
            let latest = out[n - 1];
            for feed in self.config.feeds_from(slot) {
                self.driver(feed.sink).feed_sample(&latest);
            }
        }

        n
    }
}

impl<IF, M> core::fmt::Debug for PollContext<IF, M>
where
    IF: core::fmt::Debug,
    M: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PollContext")
            .field("drivers", &self.drivers)
            .field("mux", &self.mux)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::input::{RawEvent, TimeVal, ABS_DISTANCE, ABS_MISC, ABS_X};
    use crate::test_support::{write, MockDevice, MockError, MockMux};
    use std::time::Duration;

    type TestContext = PollContext<MockDevice, MockMux>;

    fn context() -> (TestContext, [MockDevice; SLOT_COUNT], MockMux) {
        let devices: [MockDevice; SLOT_COUNT] = core::array::from_fn(|_| MockDevice::new());
        let mux = MockMux::new(&devices);
        let ctx = PollContext::new(HubConfig::u8860(), devices.clone(), mux.clone());
        (ctx, devices, mux)
    }

    fn device(devices: &[MockDevice; SLOT_COUNT], slot: Slot) -> &MockDevice {
        &devices[slot.index()]
    }

    fn t(sec: i64) -> TimeVal {
        TimeVal { sec, usec: 0 }
    }

    fn buffer<const N: usize>() -> [SensorEvent; N] {
        [SensorEvent::default(); N]
    }

    #[test]
    fn test_unknown_handle() {
        let (ctx, devices, _mux) = context();
        let err = ctx.activate(SensorHandle::new(42), true).unwrap_err();
        assert!(matches!(err, SensorError::InvalidHandle(h) if h.as_i32() == 42));
        assert_eq!(err.status(), -22);
        assert!(ctx.set_delay(SensorHandle::new(-1), 1).is_err());
        assert!(devices.iter().all(|d| d.writes().is_empty()));
    }

    #[test]
    fn test_empty_buffer_is_invalid() {
        let (ctx, _devices, _mux) = context();
        let mut out = buffer::<0>();
        assert!(matches!(ctx.poll_events(&mut out), Err(SensorError::InvalidArgument)));
    }

    #[test]
    fn test_activate_is_idempotent() {
        let (ctx, devices, _mux) = context();
        ctx.activate(SensorHandle::LIGHT, true).unwrap();
        ctx.activate(SensorHandle::LIGHT, true).unwrap();
        assert_eq!(
            device(&devices, Slot::Light).writes(),
            vec![write("enable_als_sensor", "1")]
        );
        assert!(device(&devices, Slot::Proximity).writes().is_empty());
    }

    #[test]
    fn test_fusion_handle_couples_accelerometer() {
        let (ctx, devices, mux) = context();
        ctx.activate(SensorHandle::ORIENTATION, true).unwrap();

        assert_eq!(device(&devices, Slot::Fusion).writes(), vec![write("enable", "1")]);
        assert_eq!(device(&devices, Slot::Accelerometer).writes(), vec![write("enable", "1")]);
        assert_eq!(mux.pending_wake_bytes(), 1);

        // The accelerometer now has its first sample pending, and it is fed
        // straight into the compass.
        let mut out = buffer::<8>();
        assert_eq!(ctx.poll_events(&mut out).unwrap(), 1);
        assert_eq!(out[0].sensor, SensorHandle::ACCELEROMETER);
        assert_eq!(mux.pending_wake_bytes(), 0);
        assert_eq!(
            device(&devices, Slot::Fusion).writes(),
            vec![write("enable", "1"), write("accel_data", "0 0 0")]
        );

        ctx.set_delay(SensorHandle::ORIENTATION, 50_000_000).unwrap();
        assert_eq!(device(&devices, Slot::Fusion).writes()[2], write("delay_ms", "50"));
        assert_eq!(device(&devices, Slot::Accelerometer).writes()[1], write("pollrate_ms", "50"));

        ctx.activate(SensorHandle::ORIENTATION, false).unwrap();
        assert_eq!(device(&devices, Slot::Accelerometer).writes()[2], write("enable", "0"));
    }

    #[test]
    fn test_coupled_failure_restores_primary() {
        let (ctx, devices, mux) = context();
        device(&devices, Slot::Accelerometer).fail_next_write(MockError(5));

        let err = ctx.activate(SensorHandle::ORIENTATION, true).unwrap_err();
        assert!(matches!(err, SensorError::Io(MockError(5))));
        assert_eq!(
            device(&devices, Slot::Fusion).writes(),
            vec![write("enable", "1"), write("enable", "0")]
        );
        assert!(device(&devices, Slot::Accelerometer).writes().is_empty());
        assert_eq!(mux.pending_wake_bytes(), 0);

        ctx.activate(SensorHandle::ORIENTATION, true).unwrap();
        assert_eq!(device(&devices, Slot::Fusion).writes()[2], write("enable", "1"));
        assert_eq!(device(&devices, Slot::Accelerometer).writes(), vec![write("enable", "1")]);
    }

    #[test]
    fn test_restore_keeps_slots_already_on() {
        let (ctx, devices, _mux) = context();
        ctx.activate(SensorHandle::ACCELEROMETER, true).unwrap();
        ctx.activate(SensorHandle::ORIENTATION, true).unwrap();

        // Disabling fails at the accelerometer; the compass goes back on and
        // the accelerometer, which never changed, is left alone.
        device(&devices, Slot::Accelerometer).fail_next_write(MockError(5));
        assert!(ctx.activate(SensorHandle::ORIENTATION, false).is_err());
        assert_eq!(
            device(&devices, Slot::Fusion).writes(),
            vec![write("enable", "1"), write("enable", "0"), write("enable", "1")]
        );
        assert_eq!(device(&devices, Slot::Accelerometer).writes(), vec![write("enable", "1")]);
    }

    #[test]
    fn test_multi_channel_coupling_rolls_back() {
        static ROUTES: [Route; 1] = [Route {
            handle: SensorHandle::ORIENTATION,
            slot: Slot::Fusion,
            coupled: &[Slot::Gyroscope],
        }];
        let devices: [MockDevice; SLOT_COUNT] = core::array::from_fn(|_| MockDevice::new());
        let mux = MockMux::new(&devices);
        let config = HubConfig { routes: &ROUTES, ..HubConfig::u8860() };
        assert!(config.validate().is_err());
        let ctx = PollContext::new(config, devices.clone(), mux);

        let err = ctx.activate(SensorHandle::ORIENTATION, true).unwrap_err();
        assert!(matches!(err, SensorError::InvalidHandle(SensorHandle::ORIENTATION)));
        assert_eq!(
            device(&devices, Slot::Fusion).writes(),
            vec![write("enable", "1"), write("enable", "0")]
        );
        assert!(device(&devices, Slot::Gyroscope).writes().is_empty());
    }

    #[test]
    fn test_feed_follows_accelerometer_samples() {
        let (ctx, devices, _mux) = context();
        ctx.activate(SensorHandle::MAGNETIC_FIELD, true).unwrap();
        ctx.activate(SensorHandle::ACCELEROMETER, true).unwrap();
        let mut out = buffer::<8>();
        assert_eq!(ctx.poll_events(&mut out).unwrap(), 1);

        device(&devices, Slot::Accelerometer)
            .push_records(&[RawEvent::abs(ABS_X, 1024), RawEvent::sync(t(1))]);
        assert_eq!(ctx.poll_events(&mut out).unwrap(), 1);
        assert_eq!(
            device(&devices, Slot::Fusion).writes().last(),
            Some(&write("accel_data", "9806 0 0"))
        );
    }

    #[test]
    fn test_capacity_split_across_polls() {
        let (ctx, devices, mux) = context();
        for handle in [SensorHandle::ACCELEROMETER, SensorHandle::LIGHT, SensorHandle::PROXIMITY] {
            ctx.activate(handle, true).unwrap();
        }
        // Synthetic first samples.
        let mut big = buffer::<16>();
        assert_eq!(ctx.poll_events(&mut big).unwrap(), 3);

        device(&devices, Slot::Accelerometer).push_records(&[
            RawEvent::abs(ABS_X, 1),
            RawEvent::sync(t(1)),
            RawEvent::abs(ABS_X, 2),
            RawEvent::sync(t(2)),
        ]);
        device(&devices, Slot::Light).push_records(&[
            RawEvent::abs(ABS_MISC, 10),
            RawEvent::sync(t(1)),
            RawEvent::abs(ABS_MISC, 20),
            RawEvent::sync(t(2)),
        ]);
        device(&devices, Slot::Proximity).push_records(&[
            RawEvent::abs(ABS_DISTANCE, 1),
            RawEvent::sync(t(1)),
            RawEvent::abs(ABS_DISTANCE, 0),
            RawEvent::sync(t(2)),
        ]);

        let mut out = buffer::<5>();
        assert_eq!(ctx.poll_events(&mut out).unwrap(), 5);
        let sensors: Vec<_> = out.iter().map(|e| e.sensor).collect();
        assert_eq!(
            sensors,
            [
                SensorHandle::ACCELEROMETER,
                SensorHandle::ACCELEROMETER,
                SensorHandle::LIGHT,
                SensorHandle::LIGHT,
                SensorHandle::PROXIMITY,
            ]
        );

        let waits_before = mux.waits().len();
        assert_eq!(ctx.poll_events(&mut out).unwrap(), 1);
        assert_eq!(out[0].sensor, SensorHandle::PROXIMITY);
        assert_eq!(out[0].scalar(), Some(0.0));
        assert!(mux.waits()[waits_before..]
            .iter()
            .all(|w| *w == WaitTimeout::Immediate));
    }

    #[test]
    fn test_poll_never_exceeds_buffer() {
        let (ctx, devices, _mux) = context();
        ctx.activate(SensorHandle::LIGHT, true).unwrap();
        let light = device(&devices, Slot::Light);
        for v in 0..6 {
            light.push_records(&[RawEvent::abs(ABS_MISC, v), RawEvent::sync(t(v as i64 + 1))]);
        }

        // One synthetic sample plus six from the stream.
        let mut out = buffer::<2>();
        let mut seen = 0;
        let mut last = None;
        while seen < 7 {
            let n = ctx.poll_events(&mut out).unwrap();
            assert!((1..=2).contains(&n));
            seen += n;
            last = out[n - 1].scalar();
        }
        assert_eq!(seen, 7);
        assert_eq!(last, Some(5.0));
    }

    #[test]
    fn test_read_failure_skips_slot() {
        let (ctx, devices, _mux) = context();
        ctx.activate(SensorHandle::ACCELEROMETER, true).unwrap();
        ctx.activate(SensorHandle::LIGHT, true).unwrap();
        let mut out = buffer::<8>();
        assert_eq!(ctx.poll_events(&mut out).unwrap(), 2);

        let accel = device(&devices, Slot::Accelerometer);
        accel.push_records(&[RawEvent::abs(ABS_X, 5), RawEvent::sync(t(1))]);
        accel.fail_next_read(MockError(5));
        device(&devices, Slot::Light).push_records(&[RawEvent::abs(ABS_MISC, 1), RawEvent::sync(t(1))]);

        // The accelerometer fails once, light still gets through, and the
        // accelerometer is picked up again on the opportunistic re-poll.
        assert_eq!(ctx.poll_events(&mut out).unwrap(), 2);
        assert_eq!(out[0].sensor, SensorHandle::LIGHT);
        assert_eq!(out[1].sensor, SensorHandle::ACCELEROMETER);
    }

    #[test]
    fn test_wait_failure_is_returned() {
        let (ctx, _devices, mux) = context();
        mux.fail_next_wait(MockError(4));
        let mut out = buffer::<4>();
        let err = ctx.poll_events(&mut out).unwrap_err();
        assert!(matches!(err, SensorError::Io(MockError(4))));
        assert_eq!(err.status(), -4);
    }

    #[test]
    fn test_unexpected_wake_byte_is_drained() {
        let (ctx, _devices, mux) = context();
        mux.inject_wake_byte(0x42);
        ctx.activate(SensorHandle::PROXIMITY, true).unwrap();
        let mut out = buffer::<4>();
        assert_eq!(ctx.poll_events(&mut out).unwrap(), 1);
        assert_eq!(mux.pending_wake_bytes(), 0);
    }

    #[test]
    fn test_activate_wakes_blocked_poll() {
        let (ctx, _devices, mux) = context();

        let n = std::thread::scope(|s| {
            let poller = s.spawn(|| {
                let mut out = buffer::<4>();
                let n = ctx.poll_events(&mut out).unwrap();
                (n, out[0].sensor)
            });

            std::thread::sleep(Duration::from_millis(50));
            ctx.activate(SensorHandle::LIGHT, true).unwrap();
            poller.join().unwrap()
        });

        assert_eq!(n, (1, SensorHandle::LIGHT));
        assert_eq!(mux.waits()[0], WaitTimeout::Indefinite);
    }

    #[test]
    fn test_control_calls_run_while_poll_blocked() {
        let (ctx, devices, mux) = context();
        ctx.activate(SensorHandle::LIGHT, true).unwrap();
        let mut out = buffer::<4>();
        assert_eq!(ctx.poll_events(&mut out).unwrap(), 1);

        let polled = std::thread::scope(|s| {
            let poller = s.spawn(|| {
                let mut out = buffer::<4>();
                let n = ctx.poll_events(&mut out).unwrap();
                (n, out[0].sensor)
            });

            std::thread::sleep(Duration::from_millis(50));
            ctx.set_delay(SensorHandle::LIGHT, 100_000_000).unwrap();
            ctx.activate(SensorHandle::LIGHT, false).unwrap();
            assert!(!poller.is_finished());

            ctx.activate(SensorHandle::PROXIMITY, true).unwrap();
            poller.join().unwrap()
        });

        assert_eq!(polled, (1, SensorHandle::PROXIMITY));
        let light = device(&devices, Slot::Light).writes();
        assert_eq!(light.len(), 3);
        assert_eq!(light[2], write("enable_als_sensor", "0"));
        assert!(mux.waits().contains(&WaitTimeout::Indefinite));
    }
}
