//! Driver seams. The engine only talks to hardware through these traits so
//! the host can plug in real peripherals or simulations.

use chrono::NaiveDateTime;

use crate::error::DriverFault;

pub trait TemperatureSensor {
    fn read_celsius(&mut self) -> Result<f64, DriverFault>;
}

/// Two-line character display.
pub trait CharacterDisplay {
    fn clear(&mut self) -> Result<(), DriverFault>;
    fn render(&mut self, line1: &str, line2: &str) -> Result<(), DriverFault>;
    fn release(&mut self) -> Result<(), DriverFault>;
}

/// Dimmable indicator driven for one actuator.
pub trait Indicator {
    fn off(&mut self) -> Result<(), DriverFault>;
    fn set_steady(&mut self, level: f64) -> Result<(), DriverFault>;
    /// Starts a background pulse that keeps running until `off` is called.
    fn start_pulse(&mut self, fade_in_ms: u64, fade_out_ms: u64) -> Result<(), DriverFault>;
}

pub trait Transport {
    fn send(&mut self, bytes: &[u8]) -> bool;
}

pub trait Clock {
    /// Monotonic milliseconds since an arbitrary origin.
    fn now_ms(&self) -> u64;
    fn local_now(&self) -> NaiveDateTime;
}
