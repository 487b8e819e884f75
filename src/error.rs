//! # Error Types
//!
//! Custom error types for VESC Drive using `thiserror`.
//!
//! Motor controller operations fail with [`ControllerError`], which wraps the
//! two distinct failure sources:
//!
//! - [`TransportError`]: the link itself failed (I/O, timeout, parent gone)
//! - [`ProtocolError`]: bytes arrived but did not form a valid reply
//!
//! The drive loop treats both the same way, so it only ever matches on
//! [`ControllerError`].

use thiserror::Error;

/// Link-level failures on a motor controller transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Underlying serial I/O failed
    #[error("I/O error on motor link: {0}")]
    Io(#[from] std::io::Error),

    /// No complete reply arrived within the read timeout
    #[error("Timed out after {0} ms waiting for reply")]
    Timeout(u64),

    /// The parent controller owning the shared link has been dropped
    #[error("Parent transport has been closed")]
    Closed,
}

/// Malformed frames and replies.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame does not begin with a known start byte
    #[error("Invalid start byte: 0x{0:02X}")]
    InvalidStartByte(u8),

    /// Frame does not end with the stop byte
    #[error("Invalid stop byte: 0x{0:02X}")]
    InvalidStopByte(u8),

    /// Fewer bytes than the frame or payload requires
    #[error("Frame too short: expected {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },

    /// Checksum does not match the payload
    #[error("CRC mismatch: expected 0x{expected:04X}, got 0x{actual:04X}")]
    CrcMismatch { expected: u16, actual: u16 },

    /// Payload cannot be framed
    #[error("Payload size {0} exceeds maximum {max}", max = crate::vesc::protocol::MAX_PAYLOAD_SIZE)]
    PayloadTooLarge(usize),

    /// Reply carries a different command than the one requested
    #[error("Unexpected reply command: expected {expected}, got {actual}")]
    UnexpectedCommand { expected: u8, actual: u8 },

    /// Frame carries no payload at all
    #[error("Empty payload")]
    EmptyPayload,
}

/// Any failure of a motor controller operation.
///
/// Both sub-kinds are caught as one category by the drive loop, which
/// substitutes a default measurement and keeps running.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl From<std::io::Error> for ControllerError {
    fn from(err: std::io::Error) -> Self {
        ControllerError::Transport(TransportError::Io(err))
    }
}

/// Main error type for VESC Drive
#[derive(Debug, Error)]
pub enum DriveError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// Input device errors
    #[error("Input device error: {0}")]
    InputDevice(String),

    /// No usable gamepad found
    #[error("No gamepad found")]
    InputDeviceNotFound,

    /// Telemetry serialization errors
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] serde_json::Error),
}

/// Result type alias for VESC Drive
pub type Result<T> = std::result::Result<T, DriveError>;
