//! # Controller Discovery
//!
//! Finds the directly attached (left) VESC among the serial ports matching
//! the configured prefix, identified by the controller id in its values
//! reply. The right VESC is then reached through the left one's link.
//!
//! Discovery retries until a matching controller answers.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{ControllerError, Result};
use crate::motor::{DirectController, MotorController, MotorLimits, RelayedController};
use crate::serial::{self, SerialPortIO};

/// Everything discovery needs from the configuration
#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    pub port_prefix: String,
    pub baud_rate: u32,
    pub read_timeout: Duration,
    pub heartbeat_interval: Duration,
    pub retry_interval: Duration,
    pub left_id: u8,
    pub right_id: u8,
    pub limits: MotorLimits,
}

impl DiscoverySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            port_prefix: config.serial.port_prefix.clone(),
            baud_rate: config.serial.baud_rate,
            read_timeout: config.serial.timeout(),
            heartbeat_interval: config.serial.heartbeat_interval(),
            retry_interval: config.serial.discovery_interval(),
            left_id: config.motor.left_id,
            right_id: config.motor.right_id,
            limits: config.motor.limits(),
        }
    }
}

/// Wrap `port` in a controller and keep it if it reports `expected_id`
///
/// A controller with another id is dropped, which stops its heartbeat and
/// closes the port.
pub async fn probe_controller(
    port: Box<dyn SerialPortIO>,
    expected_id: u8,
    settings: &DiscoverySettings,
) -> std::result::Result<Option<DirectController>, ControllerError> {
    let mut controller = DirectController::new(
        port,
        settings.limits,
        settings.read_timeout,
        settings.heartbeat_interval,
    );

    let values = controller.measure().await?;
    if values.controller_id == expected_id {
        Ok(Some(controller))
    } else {
        debug!(
            "Controller id {} does not match expected {}",
            values.controller_id, expected_id
        );
        Ok(None)
    }
}

/// Try each port once, returning the first matching pair
///
/// `open` is called once per port name, in order.
pub async fn discover_once<F>(
    ports: &[String],
    mut open: F,
    settings: &DiscoverySettings,
) -> Option<(DirectController, RelayedController)>
where
    F: FnMut(&str) -> Result<Box<dyn SerialPortIO>>,
{
    for name in ports {
        info!("Connecting to {}", name);

        let port = match open(name) {
            Ok(port) => port,
            Err(e) => {
                warn!("Could not open {}: {}", name, e);
                continue;
            }
        };

        match probe_controller(port, settings.left_id, settings).await {
            Ok(Some(left)) => {
                info!("Left controller (id {}) found on {}", settings.left_id, name);
                let right = left.relay(settings.right_id, settings.limits);
                return Some((left, right));
            }
            Ok(None) => {}
            Err(e) => warn!("Error connecting to VESC on {}: {}", name, e),
        }
    }
    None
}

/// Retry discovery every `retry_interval` until both controllers are available
pub async fn discover(settings: &DiscoverySettings) -> (DirectController, RelayedController) {
    loop {
        let ports = match serial::candidate_ports(&settings.port_prefix) {
            Ok(ports) => ports,
            Err(e) => {
                warn!("{}", e);
                Vec::new()
            }
        };

        let baud_rate = settings.baud_rate;
        if let Some(pair) = discover_once(&ports, |name| serial::open_port(name, baud_rate), settings).await {
            return pair;
        }

        warn!(
            "No VESC with id {} found on {}*, retrying",
            settings.left_id, settings.port_prefix
        );
        tokio::time::sleep(settings.retry_interval).await;
    }
}
