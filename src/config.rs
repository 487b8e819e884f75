//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and field has a default, so an empty file (or no file at
//! all, via [`Config::default`]) yields a runnable configuration.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::drive::{Desaturation, DriveModel, Kinematics, SpeedModeConfig};
use crate::error::{DriveError, Result};
use crate::motor::MotorLimits;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub drive: DriveConfig,

    #[serde(default)]
    pub speed: SpeedModeConfig,

    #[serde(default)]
    pub motor: MotorConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial link and discovery configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_port_prefix")]
    pub port_prefix: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_discovery_interval_ms")]
    pub discovery_interval_ms: u64,

    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
}

/// Operator input configuration
#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    /// Empty means auto-detect
    #[serde(default)]
    pub device_path: String,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// How wheel commands are sent to the controllers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    #[default]
    Rpm,
    Current,
    DutyCycle,
}

/// Drive kinematics and dispatch configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DriveConfig {
    #[serde(default)]
    pub model: DriveModel,

    #[serde(default = "default_deadzone")]
    pub deadzone: f32,

    #[serde(default)]
    pub rescale_deadzone: bool,

    #[serde(default)]
    pub square_rotation: bool,

    #[serde(default)]
    pub desaturation: Desaturation,

    #[serde(default)]
    pub dispatch: DispatchMode,

    #[serde(default)]
    pub reverse_lockout: bool,
}

/// Motor controller configuration
#[derive(Debug, Deserialize, Clone)]
pub struct MotorConfig {
    #[serde(default = "default_max_rpm")]
    pub max_rpm: i32,

    #[serde(default = "default_max_current_ma")]
    pub max_current_ma: i32,

    /// Controller id reported by the directly attached (left) VESC
    #[serde(default = "default_left_id")]
    pub left_id: u8,

    /// CAN address of the relayed (right) VESC
    #[serde(default = "default_right_id")]
    pub right_id: u8,

    #[serde(default)]
    pub simulate: bool,
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,
}

/// Diagnostic log output
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Directory for daily-rolling log files; empty logs to stdout only
    #[serde(default)]
    pub dir: String,
}

// Default value functions
fn default_port_prefix() -> String { "/dev/ttyACM".to_string() }
fn default_baud_rate() -> u32 { 115200 }
fn default_timeout_ms() -> u64 { 100 }
fn default_discovery_interval_ms() -> u64 { 1000 }
fn default_heartbeat_interval_ms() -> u64 { 100 }

fn default_poll_interval_ms() -> u64 { 100 }

fn default_deadzone() -> f32 { 0.05 }

fn default_max_rpm() -> i32 { 20000 }
fn default_max_current_ma() -> i32 { 20000 }
fn default_left_id() -> u8 { 42 }
fn default_right_id() -> u8 { 78 }

fn default_telemetry_enabled() -> bool { true }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port_prefix: default_port_prefix(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
            discovery_interval_ms: default_discovery_interval_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            device_path: String::new(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            model: DriveModel::default(),
            deadzone: default_deadzone(),
            rescale_deadzone: false,
            square_rotation: false,
            desaturation: Desaturation::default(),
            dispatch: DispatchMode::default(),
            reverse_lockout: false,
        }
    }
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            max_rpm: default_max_rpm(),
            max_current_ma: default_max_current_ma(),
            left_id: default_left_id(),
            right_id: default_right_id(),
            simulate: false,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
        }
    }
}

impl SerialConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn discovery_interval(&self) -> Duration {
        Duration::from_millis(self.discovery_interval_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}

impl DriveConfig {
    /// Kinematics parameters for this configuration
    pub fn kinematics(&self) -> Kinematics {
        Kinematics {
            model: self.model,
            deadzone: self.deadzone,
            rescale_deadzone: self.rescale_deadzone,
            square_rotation: self.square_rotation,
            desaturation: self.desaturation,
        }
    }
}

impl MotorConfig {
    pub fn limits(&self) -> MotorLimits {
        MotorLimits {
            max_rpm: self.max_rpm,
            max_current_ma: self.max_current_ma,
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> DriveError {
    DriveError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use vesc_drive::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Serial
        if self.serial.port_prefix.is_empty() {
            return Err(invalid("serial port_prefix cannot be empty"));
        }

        if ![9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600].contains(&self.serial.baud_rate) {
            return Err(invalid(
                "baud_rate must be one of: 9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600",
            ));
        }

        if self.serial.timeout_ms == 0 || self.serial.timeout_ms > 10000 {
            return Err(invalid("timeout_ms must be between 1 and 10000"));
        }

        if self.serial.discovery_interval_ms == 0 || self.serial.discovery_interval_ms > 60000 {
            return Err(invalid("discovery_interval_ms must be between 1 and 60000"));
        }

        if self.serial.heartbeat_interval_ms == 0 || self.serial.heartbeat_interval_ms > 1000 {
            return Err(invalid("heartbeat_interval_ms must be between 1 and 1000"));
        }

        // Input
        if self.input.poll_interval_ms == 0 || self.input.poll_interval_ms > 10000 {
            return Err(invalid("poll_interval_ms must be between 1 and 10000"));
        }

        // Drive
        if !(0.0..1.0).contains(&self.drive.deadzone) {
            return Err(invalid("deadzone must be at least 0.0 and below 1.0"));
        }

        // Speed multipliers
        for (name, value) in [
            ("slow", self.speed.slow),
            ("medium", self.speed.medium),
            ("max", self.speed.max),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(invalid(format!("speed {} must be above 0.0 and at most 1.0", name)));
            }
        }

        // Motor
        if self.motor.max_rpm <= 0 {
            return Err(invalid("max_rpm must be greater than 0"));
        }

        if self.motor.max_current_ma <= 0 {
            return Err(invalid("max_current_ma must be greater than 0"));
        }

        if self.motor.left_id == self.motor.right_id {
            return Err(invalid("left_id and right_id must differ"));
        }

        // Telemetry
        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());

        assert_eq!(config.serial.port_prefix, "/dev/ttyACM");
        assert_eq!(config.serial.timeout_ms, 100);
        assert_eq!(config.drive.dispatch, DispatchMode::Rpm);
        assert_eq!(config.drive.model, DriveModel::Curvature);
        assert!(!config.drive.reverse_lockout);
        assert_eq!(config.motor.left_id, 42);
        assert_eq!(config.motor.right_id, 78);
        assert_eq!(config.speed, SpeedModeConfig::default());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.serial.baud_rate, 115200);
        assert_eq!(config.telemetry.max_records_per_file, 10000);
        assert_eq!(config.drive.deadzone, 0.05);
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[serial]
port_prefix = "/dev/ttyUSB"
timeout_ms = 50

[drive]
model = "arcade"
desaturation = "sum"
dispatch = "duty_cycle"
reverse_lockout = true

[speed]
slow = 0.2

[motor]
max_rpm = 15000
simulate = true
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.serial.port_prefix, "/dev/ttyUSB");
        assert_eq!(config.serial.timeout(), Duration::from_millis(50));
        assert_eq!(config.drive.model, DriveModel::Arcade);
        assert_eq!(config.drive.desaturation, Desaturation::Sum);
        assert_eq!(config.drive.dispatch, DispatchMode::DutyCycle);
        assert!(config.drive.reverse_lockout);
        assert_eq!(config.speed.slow, 0.2);
        assert_eq!(config.speed.medium, 0.5);
        assert_eq!(config.motor.limits().max_rpm, 15000);
        assert!(config.motor.simulate);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/vesc-drive.toml");
        assert!(matches!(result, Err(DriveError::Io(_))));
    }

    #[test]
    fn test_unknown_dispatch_mode_rejected() {
        let result = Config::from_toml("[drive]\ndispatch = \"torque\"\n");
        assert!(matches!(result, Err(DriveError::Config(_))));
    }

    #[test]
    fn test_kinematics_from_drive_config() {
        let mut config = Config::default();
        config.drive.square_rotation = true;
        config.drive.deadzone = 0.1;

        let ik = config.drive.kinematics();
        assert!(ik.square_rotation);
        assert_eq!(ik.deadzone, 0.1);
        assert_eq!(ik.desaturation, Desaturation::Max);
    }

    #[test]
    fn test_empty_port_prefix() {
        let mut config = Config::default();
        config.serial.port_prefix = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = Config::default();
        config.serial.baud_rate = 420000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_ms_zero() {
        let mut config = Config::default();
        config.serial.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_ms_too_high() {
        let mut config = Config::default();
        config.serial.timeout_ms = 10001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_discovery_interval_zero() {
        let mut config = Config::default();
        config.serial.discovery_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_heartbeat_interval_too_high() {
        let mut config = Config::default();
        config.serial.heartbeat_interval_ms = 1001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_poll_interval_zero() {
        let mut config = Config::default();
        config.input.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deadzone_out_of_range() {
        let mut config = Config::default();
        config.drive.deadzone = -0.1;
        assert!(config.validate().is_err());

        config.drive.deadzone = 1.0;
        assert!(config.validate().is_err());

        config.drive.deadzone = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_speed_multiplier_out_of_range() {
        let mut config = Config::default();
        config.speed.medium = 0.0;
        assert!(config.validate().is_err());

        config.speed.medium = 1.5;
        assert!(config.validate().is_err());

        config.speed.medium = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_motor_limits_must_be_positive() {
        let mut config = Config::default();
        config.motor.max_rpm = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.motor.max_current_ma = -5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_identical_controller_ids() {
        let mut config = Config::default();
        config.motor.right_id = config.motor.left_id;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir_when_enabled() {
        let mut config = Config::default();
        config.telemetry.enabled = true;
        config.telemetry.log_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir_when_disabled() {
        let mut config = Config::default();
        config.telemetry.enabled = false;
        config.telemetry.log_dir = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_records_per_file_zero() {
        let mut config = Config::default();
        config.telemetry.max_records_per_file = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_files_to_keep_zero() {
        let mut config = Config::default();
        config.telemetry.max_files_to_keep = 0;
        assert!(config.validate().is_err());
    }
}
