//! # VESC Protocol Module
//!
//! Byte-level codec for the VESC UART protocol.
//!
//! This module handles:
//! - Command payload encoding (set RPM, current, duty cycle, keep-alive)
//! - CAN forwarding to controllers that share one physical link
//! - Short and long frame encoding with CRC16-XMODEM
//! - Values reply decoding (RPM, voltage, temperatures, controller id)

pub mod protocol;
pub mod encoder;
pub mod decoder;
pub mod crc;
