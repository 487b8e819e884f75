//! # Drive Module
//!
//! Turns operator input into normalized wheel commands.
//!
//! This module handles:
//! - Deadzone and sensitivity shaping of joystick axes
//! - Curvature and arcade inverse kinematics
//! - Wheel desaturation
//! - Speed mode selection

pub mod shaping;
pub mod kinematics;
pub mod speed_mode;

pub use kinematics::{Desaturation, DriveInput, DriveModel, Kinematics, WheelCommand};
pub use speed_mode::{SpeedMode, SpeedModeConfig};
