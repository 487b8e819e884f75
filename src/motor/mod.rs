//! # Motor Controller Module
//!
//! A common async interface over the three ways a wheel can be driven.
//!
//! | Variant | Transport | Notes |
//! |---------|-----------|-------|
//! | [`DirectController`] | Owns a serial link | Runs the heartbeat |
//! | [`RelayedController`] | Borrows the direct controller's link | Frames forwarded by CAN address |
//! | [`SimulatedController`] | None | In-memory, for development without hardware |
//!
//! Normalized commands are converted to protocol units by [`MotorLimits`].
//!
//! ## Teardown
//!
//! [`MotorController::teardown`] sends a stop directive and, for a direct
//! controller, cancels the heartbeat. It runs at most once per controller;
//! repeated calls return `Ok(())` without touching the link.

pub mod direct;
pub mod heartbeat;
pub mod relayed;
pub mod simulated;
pub mod transport;
pub mod units;

pub use direct::DirectController;
pub use heartbeat::HeartbeatGuard;
pub use relayed::RelayedController;
pub use simulated::{SimulatedController, SimulatedProbe, SimulatedState};
pub use transport::{RelayLink, TransportHandle};
pub use units::{MotorLimits, NormalizedCommand};

use async_trait::async_trait;

use crate::error::ControllerError;
use crate::vesc::protocol::Measurement;

/// Capability set shared by every controller variant.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MotorController: Send {
    /// Drive at a fraction of the configured maximum RPM
    async fn set_rpm(&mut self, command: NormalizedCommand) -> Result<(), ControllerError>;

    /// Drive at a fraction of the configured maximum current
    async fn set_current(&mut self, command: NormalizedCommand) -> Result<(), ControllerError>;

    /// Drive at a fraction of full duty cycle
    async fn set_duty_cycle(&mut self, command: NormalizedCommand) -> Result<(), ControllerError>;

    /// Read a telemetry snapshot
    async fn measure(&mut self) -> Result<Measurement, ControllerError>;

    /// Read the present electrical RPM
    async fn get_rpm(&mut self) -> Result<i32, ControllerError>;

    /// Stop the motor and release the controller
    async fn teardown(&mut self) -> Result<(), ControllerError>;
}
