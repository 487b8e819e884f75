//! # Serial Communication Module
//!
//! Handles serial communication with USB-attached VESC controllers.
//!
//! This module handles:
//! - Listing candidate serial ports by path prefix
//! - Opening a port with VESC UART settings (8N1, no flow control)
//! - Wrapping the port behind [`SerialPortIO`] so transports can be mocked

pub mod port_trait;

pub use port_trait::{SerialPortIO, TokioSerialPort};

use crate::error::{DriveError, Result};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info};

/// Default VESC UART baud rate
pub const VESC_BAUD_RATE: u32 = 115_200;

/// List serial ports whose path starts with `prefix`, sorted by name
///
/// # Errors
///
/// Returns [`DriveError::Serial`] if the system port list cannot be read.
pub fn candidate_ports(prefix: &str) -> Result<Vec<String>> {
    let ports = tokio_serial::available_ports()
        .map_err(|e| DriveError::Serial(format!("Failed to list serial ports: {}", e)))?;

    let names: Vec<String> = ports.into_iter().map(|info| info.port_name).collect();
    Ok(filter_ports(names, prefix))
}

/// Keep only names starting with `prefix`, sorted for deterministic selection
fn filter_ports(names: Vec<String>, prefix: &str) -> Vec<String> {
    let mut matching: Vec<String> = names
        .into_iter()
        .filter(|name| name.starts_with(prefix))
        .collect();
    matching.sort();
    matching
}

/// Open a specific serial port with VESC settings
///
/// # Arguments
///
/// * `path` - Device path (e.g., "/dev/ttyACM0")
/// * `baud_rate` - Line speed
///
/// # Returns
///
/// * `Result<Box<dyn SerialPortIO>>` - Opened serial port
pub fn open_port(path: &str, baud_rate: u32) -> Result<Box<dyn SerialPortIO>> {
    debug!("Trying to open serial port: {}", path);

    let port = tokio_serial::new(path, baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .flow_control(tokio_serial::FlowControl::None)
        .open_native_async()
        .map_err(|e| DriveError::Serial(format!("Failed to open {}: {}", path, e)))?;

    info!("Opened serial port {} at {} baud", path, baud_rate);
    Ok(Box::new(TokioSerialPort::new(port)))
}
