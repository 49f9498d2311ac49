// src/common/mod.rs

// --- Declare all public modules within common ---
pub mod error;
pub mod event;
pub mod hal_traits;
pub mod handle;
pub mod input;
pub mod timing;

// --- Re-export key types/traits for easier access ---

// From error.rs
pub use error::{ConfigError, OsError, SensorError};

// From event.rs
pub use event::{Payload, SensorEvent, SensorType, SensorVector};

// From hal_traits.rs
pub use hal_traits::{MonotonicClock, Multiplexer, Readiness, SensorDevice}; // Core sync traits

// From handle.rs
pub use handle::SensorHandle;

// From input.rs and timing.rs (constants - users can access via common::input::*)
pub use input::{RawEvent, TimeVal};
pub use timing::{RateUnit, WaitTimeout};
