//! # Speed Modes
//!
//! Operator-selected output scaling applied uniformly to both wheels after
//! kinematics.
//!
//! | Mode | Selected by | Default multiplier |
//! |------|-------------|--------------------|
//! | Slow | No mode button held | 0.3 |
//! | Medium | Medium button | 0.5 |
//! | Max | Max button | 1.0 |

use serde::{Deserialize, Serialize};

/// Exactly one mode is active at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedMode {
    #[default]
    Slow,
    Medium,
    Max,
}

impl SpeedMode {
    /// Resolves the mode from the two mode buttons
    ///
    /// Medium takes precedence when both are held.
    ///
    /// # Examples
    ///
    /// ```
    /// use vesc_drive::drive::speed_mode::SpeedMode;
    ///
    /// assert_eq!(SpeedMode::from_flags(false, false), SpeedMode::Slow);
    /// assert_eq!(SpeedMode::from_flags(false, true), SpeedMode::Max);
    /// assert_eq!(SpeedMode::from_flags(true, true), SpeedMode::Medium);
    /// ```
    #[must_use]
    pub fn from_flags(medium: bool, max: bool) -> Self {
        if medium {
            SpeedMode::Medium
        } else if max {
            SpeedMode::Max
        } else {
            SpeedMode::Slow
        }
    }
}

/// Multipliers for each speed mode.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SpeedModeConfig {
    #[serde(default = "default_slow")]
    pub slow: f32,

    #[serde(default = "default_medium")]
    pub medium: f32,

    #[serde(default = "default_max")]
    pub max: f32,
}

fn default_slow() -> f32 { 0.3 }
fn default_medium() -> f32 { 0.5 }
fn default_max() -> f32 { 1.0 }

impl Default for SpeedModeConfig {
    fn default() -> Self {
        Self {
            slow: default_slow(),
            medium: default_medium(),
            max: default_max(),
        }
    }
}

impl SpeedModeConfig {
    /// Multiplier for `mode`
    #[must_use]
    pub fn multiplier(&self, mode: SpeedMode) -> f32 {
        match mode {
            SpeedMode::Slow => self.slow,
            SpeedMode::Medium => self.medium,
            SpeedMode::Max => self.max,
        }
    }
}
