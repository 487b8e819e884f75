//! # VESC Protocol Constants and Types
//!
//! Logical message shapes exchanged with VESC motor controllers over UART.
//!
//! ## Frame Layout
//!
//! ```text
//! Short (payload <= 255 bytes): 0x02 | len (u8)  | payload | crc16 (BE) | 0x03
//! Long  (payload >  255 bytes): 0x03 | len (u16) | payload | crc16 (BE) | 0x03
//! ```
//!
//! The first payload byte is the command id. Multi-byte integers are big-endian.

/// Start byte of a frame with a one-byte length field
pub const START_SHORT: u8 = 0x02;

/// Start byte of a frame with a two-byte length field
pub const START_LONG: u8 = 0x03;

/// Stop byte terminating every frame
pub const STOP_BYTE: u8 = 0x03;

/// Largest payload a single frame can carry
pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize;

/// Framing overhead of a short frame: start + len + crc(2) + stop
pub const SHORT_FRAME_OVERHEAD: usize = 5;

/// Framing overhead of a long frame: start + len(2) + crc(2) + stop
pub const LONG_FRAME_OVERHEAD: usize = 6;

/// Command ids (first payload byte)
pub mod command_id {
    pub const GET_VALUES: u8 = 4;
    pub const SET_DUTY: u8 = 5;
    pub const SET_CURRENT: u8 = 6;
    pub const SET_RPM: u8 = 8;
    pub const ALIVE: u8 = 30;
    pub const FORWARD_CAN: u8 = 34;
}

/// Scale applied to a duty cycle fraction on the wire
pub const DUTY_CYCLE_SCALE: i32 = 100_000;

/// Size of the values reply body following the command byte
///
/// ```text
/// temp_fet(2) temp_motor(2) avg_motor_current(4) avg_input_current(4)
/// avg_id(4) avg_iq(4) duty_cycle(2) rpm(4) v_in(2) amp_hours(4)
/// amp_hours_charged(4) watt_hours(4) watt_hours_charged(4) tachometer(4)
/// tachometer_abs(4) fault_code(1) pid_pos(4) controller_id(1) time_ms(4)
/// ```
pub const VALUES_BODY_SIZE: usize = 62;

/// Full values reply payload (command byte + body)
pub const VALUES_PAYLOAD_SIZE: usize = 1 + VALUES_BODY_SIZE;

/// A directive or request sent to a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Target electrical RPM
    SetRpm(i32),
    /// Target motor current in milliamps
    SetCurrent(i32),
    /// Duty cycle scaled by [`DUTY_CYCLE_SCALE`]
    SetDutyCycle(i32),
    /// Request a values snapshot
    GetValues,
    /// Keep-alive; the controller releases the motor when these stop
    Alive,
}

impl Command {
    /// Command id byte for this message
    pub fn id(&self) -> u8 {
        match self {
            Command::SetRpm(_) => command_id::SET_RPM,
            Command::SetCurrent(_) => command_id::SET_CURRENT,
            Command::SetDutyCycle(_) => command_id::SET_DUTY,
            Command::GetValues => command_id::GET_VALUES,
            Command::Alive => command_id::ALIVE,
        }
    }

    /// Length in bytes of the full reply frame this command expects, if any
    ///
    /// Only [`Command::GetValues`] is answered; directives are write-only.
    pub fn reply_frame_len(&self) -> Option<usize> {
        match self {
            Command::GetValues => Some(frame_len(VALUES_PAYLOAD_SIZE)),
            _ => None,
        }
    }
}

/// Total frame length for a payload of `payload_len` bytes
pub fn frame_len(payload_len: usize) -> usize {
    if payload_len <= u8::MAX as usize {
        payload_len + SHORT_FRAME_OVERHEAD
    } else {
        payload_len + LONG_FRAME_OVERHEAD
    }
}

/// Telemetry snapshot decoded from a values reply.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Measurement {
    /// MOSFET temperature in °C
    pub temp_fet: f32,
    /// Motor temperature in °C
    pub temp_motor: f32,
    /// Average motor current in A
    pub avg_motor_current: f32,
    /// Average input current in A
    pub avg_input_current: f32,
    /// Average d-axis current in A
    pub avg_id: f32,
    /// Average q-axis current in A
    pub avg_iq: f32,
    /// Present duty cycle (-1.0 to 1.0)
    pub duty_cycle: f32,
    /// Electrical RPM
    pub rpm: i32,
    /// Input voltage in V
    pub input_voltage: f32,
    /// Consumed charge in Ah
    pub amp_hours: f32,
    /// Regenerated charge in Ah
    pub amp_hours_charged: f32,
    /// Consumed energy in Wh
    pub watt_hours: f32,
    /// Regenerated energy in Wh
    pub watt_hours_charged: f32,
    /// Signed tachometer count
    pub tachometer: i32,
    /// Absolute tachometer count
    pub tachometer_abs: i32,
    /// Active fault code (0 = none)
    pub fault_code: u8,
    /// PID position in degrees
    pub pid_pos: f32,
    /// Controller id as configured in the app settings
    pub controller_id: u8,
    /// Controller uptime in milliseconds
    pub time_ms: i32,
}
