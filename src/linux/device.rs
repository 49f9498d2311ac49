// src/linux/device.rs

use crate::common::hal_traits::{MonotonicClock, SensorDevice};
use crate::config::DeviceConfig;
use log::{info, warn};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use std::vec::Vec;

const INPUT_CLASS_DIR: &str = "/sys/class/input";
const INPUT_DEV_DIR: &str = "/dev/input";

/// Direction bits of a write-only `_IOW` ioctl request.
#[cfg(not(any(
    target_arch = "mips",
    target_arch = "mips64",
    target_arch = "powerpc",
    target_arch = "powerpc64",
    target_arch = "sparc64"
)))]
const IOC_WRITE: libc::c_ulong = 0x4000_0000;
#[cfg(any(
    target_arch = "mips",
    target_arch = "mips64",
    target_arch = "powerpc",
    target_arch = "powerpc64",
    target_arch = "sparc64"
))]
const IOC_WRITE: libc::c_ulong = 0x8000_0000;

const fn ioc_write(kind: u8, nr: u8, size: usize) -> libc::c_ulong {
    IOC_WRITE | ((size as libc::c_ulong) << 16) | ((kind as libc::c_ulong) << 8) | nr as libc::c_ulong
}

/// `EVIOCSCLOCKID`: selects the clock used for event timestamps.
const EVIOCSCLOCKID: libc::c_ulong = ioc_write(b'E', 0xa0, core::mem::size_of::<libc::c_int>());

/// One sensor chip: its `/dev/input/eventN` node and its sysfs directory.
///
/// A device whose input node cannot be found is kept with no stream. It is
/// never readable, while its attributes can still be written.
#[derive(Debug)]
pub struct LinuxDevice {
    node: Option<File>,
    sysfs_root: PathBuf,
}

impl LinuxDevice {
    pub fn new(node: Option<File>, sysfs_root: impl Into<PathBuf>) -> Self {
        LinuxDevice { node, sysfs_root: sysfs_root.into() }
    }

    /// Looks up the input node named `device.input_name` and opens it
    /// non-blocking, with `CLOCK_MONOTONIC` event timestamps.
    pub fn open(device: &DeviceConfig) -> Self {
        let node = match find_input_node(device.input_name) {
            Some(path) => match open_node(&path) {
                Ok(file) => {
                    info!("{}: using {}", device.input_name, path.display());
                    if let Err(e) = use_monotonic_clock(&file) {
                        warn!(
                            "{}: couldn't switch {} to CLOCK_MONOTONIC: {}",
                            device.input_name,
                            path.display(),
                            e
                        );
                    }
                    Some(file)
                }
                Err(e) => {
                    warn!("{}: couldn't open {}: {}", device.input_name, path.display(), e);
                    None
                }
            },
            None => {
                warn!("{}: no input device found", device.input_name);
                None
            }
        };
        LinuxDevice::new(node, device.sysfs_root)
    }

    /// Descriptor for `poll(2)`; negative when there is no stream, which
    /// `poll` ignores.
    pub fn raw_fd(&self) -> RawFd {
        self.node.as_ref().map_or(-1, |f| f.as_raw_fd())
    }
}

fn open_node(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NONBLOCK | libc::O_CLOEXEC)
        .open(path)
}

/// Makes the kernel stamp events read from `node` with `CLOCK_MONOTONIC`,
/// the clock [`MonotonicClock::now_ns`] reads. The evdev default is
/// `CLOCK_REALTIME`.
fn use_monotonic_clock(node: &File) -> io::Result<()> {
    let clock: libc::c_int = libc::CLOCK_MONOTONIC;
    let rc = unsafe { libc::ioctl(node.as_raw_fd(), EVIOCSCLOCKID as _, &clock as *const libc::c_int) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Scans `/sys/class/input/event*/device/name` for `name`.
pub fn find_input_node(name: &str) -> Option<PathBuf> {
    find_input_node_in(Path::new(INPUT_CLASS_DIR), Path::new(INPUT_DEV_DIR), name)
}

fn find_input_node_in(class_dir: &Path, dev_dir: &Path, name: &str) -> Option<PathBuf> {
    let mut entries: Vec<_> = fs::read_dir(class_dir)
        .ok()?
        .filter_map(Result::ok)
        .map(|entry| entry.file_name())
        .filter(|file_name| file_name.to_string_lossy().starts_with("event"))
        .collect();
    entries.sort();

    entries.into_iter().find_map(|event| {
        let reported = fs::read_to_string(class_dir.join(&event).join("device/name")).ok()?;
        (reported.trim_end() == name).then(|| dev_dir.join(&event))
    })
}

impl SensorDevice for LinuxDevice {
    type Error = io::Error;

    fn read_raw(&mut self, buf: &mut [u8]) -> nb::Result<usize, Self::Error> {
        let Some(node) = self.node.as_mut() else {
            return Err(nb::Error::WouldBlock);
        };
        match node.read(buf) {
            Ok(0) => Err(nb::Error::WouldBlock),
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Err(nb::Error::WouldBlock),
            Err(e) => Err(nb::Error::Other(e)),
        }
    }

    fn write_attribute(&mut self, name: &str, value: &str) -> Result<(), Self::Error> {
        let path = self.sysfs_root.join(name);
        let mut file = OpenOptions::new().write(true).open(&path)?;
        file.write_all(value.as_bytes())
    }
}

impl MonotonicClock for LinuxDevice {
    fn now_ns(&self) -> i64 {
        let mut ts = libc::timespec { tv_sec: 0, tv_nsec: 0 };
        // CLOCK_MONOTONIC is always available on Linux.
        unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
        ts.tv_sec as i64 * 1_000_000_000 + ts.tv_nsec as i64
    }
}
