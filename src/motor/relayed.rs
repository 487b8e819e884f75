//! Controller reached by CAN forwarding through a directly attached one.

use async_trait::async_trait;
use tracing::{debug, info};

use super::transport::RelayLink;
use super::units::{MotorLimits, NormalizedCommand};
use super::MotorController;
use crate::error::ControllerError;
use crate::vesc::decoder::decode_values_frame;
use crate::vesc::encoder::encode_request;
use crate::vesc::protocol::{Command, Measurement};

/// VESC on the CAN bus behind a [`super::DirectController`].
///
/// Holds no link of its own; every call borrows the parent's link for its
/// duration and fails with [`crate::error::TransportError::Closed`] once the
/// parent is gone. No heartbeat is sent from here.
#[derive(Debug)]
pub struct RelayedController {
    link: RelayLink,
    address: u8,
    limits: MotorLimits,
    values_request: Vec<u8>,
    values_reply_len: usize,
    torn_down: bool,
}

impl RelayedController {
    pub fn new(link: RelayLink, address: u8, limits: MotorLimits) -> Self {
        Self {
            link,
            address,
            limits,
            values_request: encode_request(&Command::GetValues, Some(address)),
            values_reply_len: Command::GetValues.reply_frame_len().unwrap_or_default(),
            torn_down: false,
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    async fn send(&mut self, command: Command) -> Result<(), ControllerError> {
        debug!("Relayed controller {}: {:?}", self.address, command);
        self.link.send(&encode_request(&command, Some(self.address))).await
    }
}

#[async_trait]
impl MotorController for RelayedController {
    async fn set_rpm(&mut self, command: NormalizedCommand) -> Result<(), ControllerError> {
        let rpm = self.limits.rpm(command);
        self.send(Command::SetRpm(rpm)).await
    }

    async fn set_current(&mut self, command: NormalizedCommand) -> Result<(), ControllerError> {
        let current = self.limits.current(command);
        self.send(Command::SetCurrent(current)).await
    }

    async fn set_duty_cycle(&mut self, command: NormalizedCommand) -> Result<(), ControllerError> {
        let duty = self.limits.duty_cycle(command);
        self.send(Command::SetDutyCycle(duty)).await
    }

    async fn measure(&mut self) -> Result<Measurement, ControllerError> {
        let reply = self
            .link
            .exchange(&self.values_request, self.values_reply_len)
            .await?;
        Ok(decode_values_frame(&reply)?)
    }

    async fn get_rpm(&mut self) -> Result<i32, ControllerError> {
        Ok(self.measure().await?.rpm)
    }

    async fn teardown(&mut self) -> Result<(), ControllerError> {
        if self.torn_down {
            return Ok(());
        }
        self.torn_down = true;

        info!("Stopping relayed controller {}", self.address);
        self.send(Command::SetCurrent(0)).await
    }
}
