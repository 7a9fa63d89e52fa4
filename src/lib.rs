//! Dynamic fan control for ThinkPad laptops.
//!
//! Overrides the embedded controller's automatic fan behavior with a
//! multi-sensor control loop: the EC thermal zones, an optional supported
//! hard drive and the hdaps accelerometer feed a hysteresis/minimum-dwell
//! decision engine whose level commands are written to the ACPI fan
//! interface. The EC watchdog is kept armed so firmware control returns
//! within seconds if the daemon dies.

pub mod args;
pub mod client;
pub mod daemon;
pub mod disk_temp;
pub mod engine;
pub mod errors;
pub mod fan_control;
pub mod logging;
pub mod pidfile;
pub mod sensors;

// Re-export commonly used types
pub use errors::{FanControlError, Result};
