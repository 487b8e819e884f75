//! Controller attached directly to a serial link.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use super::heartbeat::HeartbeatGuard;
use super::relayed::RelayedController;
use super::transport::TransportHandle;
use super::units::{MotorLimits, NormalizedCommand};
use super::MotorController;
use crate::error::ControllerError;
use crate::serial::SerialPortIO;
use crate::vesc::decoder::decode_values_frame;
use crate::vesc::encoder::encode_request;
use crate::vesc::protocol::{Command, Measurement};

/// Directly attached VESC. Owns the link and keeps it alive.
#[derive(Debug)]
pub struct DirectController {
    transport: TransportHandle,
    limits: MotorLimits,
    heartbeat: HeartbeatGuard,
    values_request: Vec<u8>,
    values_reply_len: usize,
    torn_down: bool,
}

impl DirectController {
    /// Take ownership of `port` and start the heartbeat
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `port` - Opened serial port
    /// * `limits` - Output limits for unit conversion
    /// * `read_timeout` - Upper bound on each reply read
    /// * `heartbeat_period` - Interval between keep-alive frames
    pub fn new(
        port: Box<dyn SerialPortIO>,
        limits: MotorLimits,
        read_timeout: Duration,
        heartbeat_period: Duration,
    ) -> Self {
        let transport = TransportHandle::new(port, read_timeout);
        let heartbeat = HeartbeatGuard::spawn(transport.relay_link(), heartbeat_period);

        Self {
            transport,
            limits,
            heartbeat,
            values_request: encode_request(&Command::GetValues, None),
            values_reply_len: Command::GetValues.reply_frame_len().unwrap_or_default(),
            torn_down: false,
        }
    }

    /// Build a controller reached through this one's link at `address`
    pub fn relay(&self, address: u8, limits: MotorLimits) -> RelayedController {
        RelayedController::new(self.transport.relay_link(), address, limits)
    }

    pub fn limits(&self) -> MotorLimits {
        self.limits
    }

    async fn send(&mut self, command: Command) -> Result<(), ControllerError> {
        debug!("Direct controller: {:?}", command);
        self.transport.send(&encode_request(&command, None)).await
    }
}

#[async_trait]
impl MotorController for DirectController {
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
            .transport
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

        self.heartbeat.cancel();
        info!("Stopping direct controller");
        self.send(Command::SetCurrent(0)).await
    }
}
