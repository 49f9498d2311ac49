// src/linux/mod.rs

//! Backend for Linux input-event nodes and sysfs attributes.

pub mod device;
pub mod mux;

pub use device::LinuxDevice;
pub use mux::LinuxMux;

use crate::config::{HubConfig, SLOT_COUNT};
use crate::context::PollContext;
use std::io;

pub type LinuxPollContext = PollContext<LinuxDevice, LinuxMux>;

/// Validates `config`, opens every configured device and sets up the wake
/// pipe. Devices that are not present are tolerated.
pub fn open(config: HubConfig) -> io::Result<LinuxPollContext> {
    config
        .validate()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let devices = config.devices.map(|device| LinuxDevice::open(&device));
    let fds: [_; SLOT_COUNT] = core::array::from_fn(|i| devices[i].raw_fd());
    let mux = LinuxMux::new(fds)?;

    Ok(PollContext::new(config, devices, mux))
}
