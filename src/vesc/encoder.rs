//! # VESC Packet Encoder
//!
//! Encodes commands into framed VESC packets, optionally forwarded over CAN
//! to a controller that shares the physical link.

use bytes::{BufMut, Bytes, BytesMut};

use super::crc::crc16;
use super::protocol::*;
use crate::error::ProtocolError;

/// Encode the payload of a command (command id + arguments)
///
/// # Examples
///
/// ```
/// use vesc_drive::vesc::encoder::encode_payload;
/// use vesc_drive::vesc::protocol::Command;
///
/// let payload = encode_payload(&Command::SetRpm(1500));
/// assert_eq!(&payload[..], &[0x08, 0x00, 0x00, 0x05, 0xDC]);
/// ```
pub fn encode_payload(command: &Command) -> Bytes {
    let mut payload = BytesMut::with_capacity(5);
    payload.put_u8(command.id());

    match *command {
        Command::SetRpm(value) | Command::SetCurrent(value) | Command::SetDutyCycle(value) => {
            payload.put_i32(value);
        }
        Command::GetValues | Command::Alive => {}
    }

    payload.freeze()
}

/// Wrap a payload so the directly attached controller forwards it on CAN
///
/// Layout: `FORWARD_CAN | address | inner payload`
pub fn forward_payload(address: u8, inner: &[u8]) -> Bytes {
    let mut payload = BytesMut::with_capacity(2 + inner.len());
    payload.put_u8(command_id::FORWARD_CAN);
    payload.put_u8(address);
    payload.put_slice(inner);
    payload.freeze()
}

/// Frame a payload: start byte, length, payload, CRC16, stop byte
///
/// # Errors
///
/// Returns [`ProtocolError::EmptyPayload`] for an empty payload and
/// [`ProtocolError::PayloadTooLarge`] when it cannot fit a long frame.
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    if payload.is_empty() {
        return Err(ProtocolError::EmptyPayload);
    }
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(ProtocolError::PayloadTooLarge(payload.len()));
    }

    let mut frame = BytesMut::with_capacity(frame_len(payload.len()));

    if payload.len() <= u8::MAX as usize {
        frame.put_u8(START_SHORT);
        frame.put_u8(payload.len() as u8);
    } else {
        frame.put_u8(START_LONG);
        frame.put_u16(payload.len() as u16);
    }

    frame.put_slice(payload);
    frame.put_u16(crc16(payload));
    frame.put_u8(STOP_BYTE);

    Ok(frame.to_vec())
}

/// Encode a complete frame for a command
///
/// With `can_address` set, the command is wrapped for forwarding to that
/// bus address through the directly attached controller.
///
/// # Examples
///
/// ```
/// use vesc_drive::vesc::encoder::encode_request;
/// use vesc_drive::vesc::protocol::Command;
///
/// let direct = encode_request(&Command::GetValues, None);
/// let relayed = encode_request(&Command::GetValues, Some(78));
/// assert_eq!(direct.len(), 6);
/// assert_eq!(relayed.len(), 8);
/// ```
pub fn encode_request(command: &Command, can_address: Option<u8>) -> Vec<u8> {
    let payload = encode_payload(command);
    let payload = match can_address {
        Some(address) => forward_payload(address, &payload),
        None => payload,
    };

    // Command payloads are at most 7 bytes, always within frame limits
    encode_frame(&payload).unwrap_or_default()
}
