//! Conversion from normalized commands to controller protocol units.
//!
//! Every conversion is a pure function of the command and the static limits.
//! Values are computed in floating point and truncated toward zero only at
//! the final integral unit.

use serde::Serialize;

use crate::drive::shaping::{clamp, map_range};
use crate::vesc::protocol::DUTY_CYCLE_SCALE;

/// Fractional output in [-1.0, 1.0].
///
/// The constructor clamps, so a command can never leave the range.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize)]
pub struct NormalizedCommand(f32);

impl NormalizedCommand {
    pub const ZERO: NormalizedCommand = NormalizedCommand(0.0);

    /// Clamps `value` into [-1.0, 1.0]; NaN becomes 0
    ///
    /// # Examples
    ///
    /// ```
    /// use vesc_drive::motor::NormalizedCommand;
    ///
    /// assert_eq!(NormalizedCommand::new(1.7).value(), 1.0);
    /// assert_eq!(NormalizedCommand::new(f32::NAN).value(), 0.0);
    /// ```
    #[must_use]
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return Self::ZERO;
        }
        Self(clamp(value, -1.0, 1.0))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0.0
    }
}

impl From<f32> for NormalizedCommand {
    fn from(value: f32) -> Self {
        Self::new(value)
    }
}

/// Static output limits of one controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorLimits {
    /// Electrical RPM at full command
    pub max_rpm: i32,
    /// Motor current at full command, in milliamps
    pub max_current_ma: i32,
}

impl Default for MotorLimits {
    fn default() -> Self {
        Self {
            max_rpm: 20_000,
            max_current_ma: 20_000,
        }
    }
}

impl MotorLimits {
    /// Integral RPM in [-max_rpm, max_rpm]
    #[must_use]
    pub fn rpm(&self, command: NormalizedCommand) -> i32 {
        scale(command, self.max_rpm)
    }

    /// Integral current in mA in [-max_current_ma, max_current_ma]
    #[must_use]
    pub fn current(&self, command: NormalizedCommand) -> i32 {
        scale(command, self.max_current_ma)
    }

    /// Duty cycle in wire units (±100000 at full command)
    #[must_use]
    pub fn duty_cycle(&self, command: NormalizedCommand) -> i32 {
        scale(command, DUTY_CYCLE_SCALE)
    }
}

fn scale(command: NormalizedCommand, limit: i32) -> i32 {
    let limit = limit as f32;
    map_range(command.value(), -1.0, 1.0, -limit, limit) as i32
}
