// src/lib.rs

#![cfg_attr(not(test), no_std)] // Specify no_std at the crate root, tests use std

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(all(feature = "std", not(test)))]
extern crate std;

pub mod common;
pub mod config;
pub mod context;
pub mod driver;

#[cfg(feature = "linux")]
pub mod linux;

#[cfg(test)]
mod test_support;

// Re-export key types for convenience
pub use common::{SensorError, SensorEvent, SensorHandle};
pub use config::HubConfig;
pub use context::PollContext;
