//! # VESC Drive Library
//!
//! Drive a differential-drive robot with a gamepad through two VESC motor
//! controllers.
//!
//! The left controller is attached over USB serial; the right one is reached
//! by CAN forwarding over the left controller's link. Joystick axes go
//! through inverse kinematics and speed scaling before being dispatched to
//! both wheels once per control cycle.

pub mod config;
pub mod discovery;
pub mod drive;
pub mod drive_loop;
pub mod error;
pub mod input;
pub mod motor;
pub mod serial;
pub mod telemetry;
pub mod vesc;
