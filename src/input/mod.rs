//! # Input Module
//!
//! Operator input boundary.
//!
//! The drive loop reads one [`DriveSignals`] sample per cycle from an
//! [`InputSource`]. Discovery and reconnection belong to the source; the loop
//! only asks whether it is still connected.

pub mod gamepad;

pub use gamepad::Gamepad;

use crate::drive::{DriveInput, SpeedMode};
use crate::error::Result;

/// One sample of operator input.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DriveSignals {
    /// Forward is positive
    pub speed: f32,
    /// Counterclockwise is positive
    pub rotation: f32,
    /// Medium speed mode requested
    pub medium: bool,
    /// Max speed mode requested
    pub max: bool,
}

impl DriveSignals {
    pub fn drive_input(&self) -> DriveInput {
        DriveInput::new(self.speed, self.rotation)
    }

    pub fn speed_mode(&self) -> SpeedMode {
        SpeedMode::from_flags(self.medium, self.max)
    }
}

/// Source of operator input samples.
pub trait InputSource: Send {
    /// Read the current input state
    ///
    /// # Errors
    ///
    /// Returns an error if the device can no longer be read; the source then
    /// reports itself disconnected.
    fn poll(&mut self) -> Result<DriveSignals>;

    /// Whether the source can still produce samples
    fn is_connected(&self) -> bool;
}
