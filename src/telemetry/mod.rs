//! # Telemetry Module
//!
//! Handles per-cycle telemetry logging to JSONL files with rotation.
//!
//! This module handles:
//! - The record produced by every drive cycle
//! - Formatting as JSONL (JSON Lines)
//! - Writing to rotating log files
//! - Managing file rotation (max N records per file)
//! - Retaining only last M files

pub mod logger;

pub use logger::TelemetryLogger;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::drive::SpeedMode;
use crate::motor::NormalizedCommand;

/// What one drive cycle commanded and measured.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleRecord {
    pub timestamp: DateTime<Utc>,
    /// Commands after speed scaling and clamping
    pub left: NormalizedCommand,
    pub right: NormalizedCommand,
    /// Measured RPM, 0 when the read failed
    pub left_rpm: i32,
    pub right_rpm: i32,
    pub mode: SpeedMode,
}
