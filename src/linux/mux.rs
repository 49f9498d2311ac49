// src/linux/mux.rs

use crate::common::{
    hal_traits::{Multiplexer, Readiness},
    timing::WaitTimeout,
};
use crate::config::{Slot, SLOT_COUNT};
use core::sync::atomic::{AtomicI32, Ordering};
use log::warn;
use std::io;
use std::os::unix::io::{AsRawFd, FromRawFd, OwnedFd, RawFd};

const HANGUP: libc::c_short = libc::POLLHUP | libc::POLLERR | libc::POLLNVAL;

/// `poll(2)` over the device descriptors plus the read end of a
/// non-blocking wake pipe, which always sits in the last position.
///
/// A stream that hangs up with nothing left to read is dropped from the
/// poll set for good.
#[derive(Debug)]
pub struct LinuxMux {
    fds: [AtomicI32; SLOT_COUNT],
    wake_read: OwnedFd,
    wake_write: OwnedFd,
}

impl LinuxMux {
    /// `fds[i]` is the stream of slot `i`; negative entries are never ready.
    /// The descriptors stay owned by their devices.
    pub fn new(fds: [RawFd; SLOT_COUNT]) -> io::Result<Self> {
        let mut pipe = [0; 2];
        if unsafe { libc::pipe2(pipe.as_mut_ptr(), libc::O_NONBLOCK | libc::O_CLOEXEC) } < 0 {
            return Err(io::Error::last_os_error());
        }
        // pipe2 returned two fresh descriptors that nothing else owns.
        let (wake_read, wake_write) = unsafe { (OwnedFd::from_raw_fd(pipe[0]), OwnedFd::from_raw_fd(pipe[1])) };
        Ok(LinuxMux { fds: fds.map(AtomicI32::new), wake_read, wake_write })
    }
}

impl Multiplexer for LinuxMux {
    type Error = io::Error;

    fn wait(&self, timeout: WaitTimeout) -> Result<Readiness, Self::Error> {
        loop {
            let mut pfds = [libc::pollfd { fd: -1, events: libc::POLLIN, revents: 0 }; SLOT_COUNT + 1];
            for (pfd, fd) in pfds.iter_mut().zip(&self.fds) {
                pfd.fd = fd.load(Ordering::Relaxed);
            }
            pfds[SLOT_COUNT].fd = self.wake_read.as_raw_fd();

            let n = unsafe { libc::poll(pfds.as_mut_ptr(), pfds.len() as libc::nfds_t, timeout.as_poll_millis()) };
            if n < 0 {
                return Err(io::Error::last_os_error());
            }

            let mut ready = Readiness::default();
            let mut dropped = false;
            for (i, pfd) in pfds[..SLOT_COUNT].iter().enumerate() {
                if pfd.revents & libc::POLLIN != 0 {
                    ready.slots[i] = true;
                } else if pfd.revents & HANGUP != 0 {
                    warn!("{:?}: stream hung up (revents 0x{:x}), no longer polled", Slot::ALL[i], pfd.revents);
                    self.fds[i].store(-1, Ordering::Relaxed);
                    dropped = true;
                }
            }
            ready.wake = pfds[SLOT_COUNT].revents & libc::POLLIN != 0;

            // Only a hangup woke an indefinite wait: keep waiting.
            if dropped && ready.count() == 0 && timeout == WaitTimeout::Indefinite {
                continue;
            }
            return Ok(ready);
        }
    }

    fn wake(&self) -> Result<(), Self::Error> {
        let msg = crate::context::WAKE_MESSAGE;
        let n = unsafe { libc::write(self.wake_write.as_raw_fd(), (&msg as *const u8).cast(), 1) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn drain_wake(&self) -> Result<u8, Self::Error> {
        let mut msg = 0u8;
        let n = unsafe { libc::read(self.wake_read.as_raw_fd(), (&mut msg as *mut u8).cast(), 1) };
        match n {
            1 => Ok(msg),
            0 => Err(io::ErrorKind::UnexpectedEof.into()),
            _ => Err(io::Error::last_os_error()),
        }
    }
}
