//! # VESC Packet Decoder
//!
//! Validates framed replies and decodes the values snapshot.

use bytes::Buf;

use super::crc::crc16;
use super::protocol::*;
use crate::error::ProtocolError;

/// Validate a complete frame and return its payload
///
/// # Errors
///
/// Returns error if:
/// - Frame is shorter than its header or length field claims
/// - Start or stop byte is wrong
/// - CRC check fails
pub fn decode_frame(frame: &[u8]) -> Result<&[u8], ProtocolError> {
    if frame.len() < SHORT_FRAME_OVERHEAD {
        return Err(ProtocolError::TooShort {
            expected: SHORT_FRAME_OVERHEAD,
            actual: frame.len(),
        });
    }

    let (header_len, payload_len) = match frame[0] {
        START_SHORT => (2, frame[1] as usize),
        START_LONG => (3, u16::from_be_bytes([frame[1], frame[2]]) as usize),
        other => return Err(ProtocolError::InvalidStartByte(other)),
    };

    if payload_len == 0 {
        return Err(ProtocolError::EmptyPayload);
    }

    let total = header_len + payload_len + 3;
    if frame.len() < total {
        return Err(ProtocolError::TooShort {
            expected: total,
            actual: frame.len(),
        });
    }

    let payload = &frame[header_len..header_len + payload_len];
    let crc_offset = header_len + payload_len;
    let received_crc = u16::from_be_bytes([frame[crc_offset], frame[crc_offset + 1]]);
    let calculated_crc = crc16(payload);

    if calculated_crc != received_crc {
        return Err(ProtocolError::CrcMismatch {
            expected: calculated_crc,
            actual: received_crc,
        });
    }

    let stop = frame[crc_offset + 2];
    if stop != STOP_BYTE {
        return Err(ProtocolError::InvalidStopByte(stop));
    }

    Ok(payload)
}

/// Decode a values reply payload (command byte included)
///
/// # Errors
///
/// Returns error if the command byte is not `GET_VALUES` or the payload is
/// shorter than [`VALUES_PAYLOAD_SIZE`].
pub fn decode_values(payload: &[u8]) -> Result<Measurement, ProtocolError> {
    let Some((&command, body)) = payload.split_first() else {
        return Err(ProtocolError::EmptyPayload);
    };

    if command != command_id::GET_VALUES {
        return Err(ProtocolError::UnexpectedCommand {
            expected: command_id::GET_VALUES,
            actual: command,
        });
    }

    if body.len() < VALUES_BODY_SIZE {
        return Err(ProtocolError::TooShort {
            expected: VALUES_PAYLOAD_SIZE,
            actual: payload.len(),
        });
    }

    let mut buf = body;

    Ok(Measurement {
        temp_fet: buf.get_i16() as f32 / 10.0,
        temp_motor: buf.get_i16() as f32 / 10.0,
        avg_motor_current: buf.get_i32() as f32 / 100.0,
        avg_input_current: buf.get_i32() as f32 / 100.0,
        avg_id: buf.get_i32() as f32 / 100.0,
        avg_iq: buf.get_i32() as f32 / 100.0,
        duty_cycle: buf.get_i16() as f32 / 1000.0,
        rpm: buf.get_i32(),
        input_voltage: buf.get_i16() as f32 / 10.0,
        amp_hours: buf.get_i32() as f32 / 10_000.0,
        amp_hours_charged: buf.get_i32() as f32 / 10_000.0,
        watt_hours: buf.get_i32() as f32 / 10_000.0,
        watt_hours_charged: buf.get_i32() as f32 / 10_000.0,
        tachometer: buf.get_i32(),
        tachometer_abs: buf.get_i32(),
        fault_code: buf.get_u8(),
        pid_pos: buf.get_i32() as f32 / 1_000_000.0,
        controller_id: buf.get_u8(),
        time_ms: buf.get_i32(),
    })
}

/// Decode a complete values reply frame
pub fn decode_values_frame(frame: &[u8]) -> Result<Measurement, ProtocolError> {
    decode_values(decode_frame(frame)?)
}

/// Build a values reply frame, mirroring what a controller sends
#[cfg(test)]
pub(crate) fn values_reply_frame(rpm: i32, controller_id: u8) -> Vec<u8> {
    use bytes::{BufMut, BytesMut};

    let mut payload = BytesMut::with_capacity(VALUES_PAYLOAD_SIZE);
    payload.put_u8(command_id::GET_VALUES);
    payload.put_i16(254); // temp_fet 25.4
    payload.put_i16(301); // temp_motor 30.1
    payload.put_i32(150); // avg_motor_current 1.5
    payload.put_i32(50); // avg_input_current 0.5
    payload.put_i32(0);
    payload.put_i32(0);
    payload.put_i16(120); // duty 0.12
    payload.put_i32(rpm);
    payload.put_i16(248); // v_in 24.8
    payload.put_i32(0);
    payload.put_i32(0);
    payload.put_i32(0);
    payload.put_i32(0);
    payload.put_i32(1234);
    payload.put_i32(5678);
    payload.put_u8(0);
    payload.put_i32(0);
    payload.put_u8(controller_id);
    payload.put_i32(1000);

    super::encoder::encode_frame(&payload).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vesc::encoder::{encode_frame, encode_request};

    #[test]
    fn test_decode_frame_roundtrip_payload() {
        let frame = encode_request(&Command::SetRpm(1500), None);
        let payload = decode_frame(&frame).unwrap();
        assert_eq!(payload, &[0x08, 0x00, 0x00, 0x05, 0xDC]);
    }

    #[test]
    fn test_decode_values_reply() {
        let frame = values_reply_frame(-4200, 42);
        assert_eq!(frame.len(), 68);

        let values = decode_values_frame(&frame).unwrap();
        assert_eq!(values.rpm, -4200);
        assert_eq!(values.controller_id, 42);
        assert_eq!(values.tachometer, 1234);
        assert_eq!(values.tachometer_abs, 5678);
        assert_eq!(values.time_ms, 1000);
        assert!((values.temp_fet - 25.4).abs() < 1e-4);
        assert!((values.input_voltage - 24.8).abs() < 1e-4);
        assert!((values.duty_cycle - 0.12).abs() < 1e-4);
    }

    #[test]
    fn test_decode_frame_too_short() {
        let result = decode_frame(&[0x02, 0x01, 0x04]);
        assert_eq!(result, Err(ProtocolError::TooShort { expected: 5, actual: 3 }));
    }

    #[test]
    fn test_decode_frame_truncated_payload() {
        let frame = values_reply_frame(0, 42);
        let result = decode_frame(&frame[..40]);
        assert!(matches!(result, Err(ProtocolError::TooShort { expected: 68, actual: 40 })));
    }

    #[test]
    fn test_decode_frame_invalid_start_byte() {
        let mut frame = encode_request(&Command::GetValues, None);
        frame[0] = 0x7E;
        assert_eq!(decode_frame(&frame), Err(ProtocolError::InvalidStartByte(0x7E)));
    }

    #[test]
    fn test_decode_frame_crc_mismatch() {
        let mut frame = encode_request(&Command::SetRpm(1500), None);
        frame[4] ^= 0xFF;
        assert!(matches!(decode_frame(&frame), Err(ProtocolError::CrcMismatch { .. })));
    }

    #[test]
    fn test_decode_frame_invalid_stop_byte() {
        let mut frame = encode_request(&Command::GetValues, None);
        let last = frame.len() - 1;
        frame[last] = 0x00;
        assert_eq!(decode_frame(&frame), Err(ProtocolError::InvalidStopByte(0x00)));
    }

    #[test]
    fn test_decode_long_frame() {
        let payload = vec![0x55; 400];
        let frame = encode_frame(&payload).unwrap();
        assert_eq!(decode_frame(&frame).unwrap(), &payload[..]);
    }

    #[test]
    fn test_decode_values_wrong_command() {
        let result = decode_values(&[command_id::SET_RPM, 0, 0, 0, 0]);
        assert_eq!(
            result,
            Err(ProtocolError::UnexpectedCommand { expected: 4, actual: 8 })
        );
    }

    #[test]
    fn test_decode_values_short_body() {
        let mut payload = vec![command_id::GET_VALUES];
        payload.extend_from_slice(&[0u8; 20]);
        assert_eq!(
            decode_values(&payload),
            Err(ProtocolError::TooShort { expected: 63, actual: 21 })
        );
    }

    #[test]
    fn test_decode_values_empty() {
        assert_eq!(decode_values(&[]), Err(ProtocolError::EmptyPayload));
    }
}
