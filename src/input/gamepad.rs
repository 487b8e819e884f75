//! # Gamepad Input
//!
//! Reads a generic gamepad through the Linux evdev interface.
//!
//! ## Mapping
//!
//! | Signal | evdev code | Notes |
//! |--------|------------|-------|
//! | speed | ABS_Y | Inverted, so pushing the stick away is forward |
//! | rotation | ABS_X | |
//! | medium | BTN_TL | |
//! | max | BTN_TR | |
//!
//! Axes are normalized with the range the device reports for them, so both
//! 8-bit (0-255) and 16-bit (-32768..32767) sticks map to [-1.0, 1.0].
//!
//! The device is sampled by querying its current absolute and key state
//! rather than consuming the event stream, so a poll never blocks.

use evdev::{AbsoluteAxisType, Device, Key};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{DriveSignals, InputSource};
use crate::drive::shaping::clamp;
use crate::error::{DriveError, Result};

const INPUT_DIR: &str = "/dev/input";

const SPEED_AXIS: AbsoluteAxisType = AbsoluteAxisType::ABS_Y;
const ROTATION_AXIS: AbsoluteAxisType = AbsoluteAxisType::ABS_X;
const MEDIUM_BUTTON: Key = Key::BTN_TL;
const MAX_BUTTON: Key = Key::BTN_TR;

/// Reported range of one absolute axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRange {
    pub min: i32,
    pub max: i32,
}

impl AxisRange {
    /// Map a raw reading to [-1.0, 1.0] around the range midpoint
    ///
    /// A degenerate range (max <= min) always reads 0.
    ///
    /// # Examples
    ///
    /// ```
    /// use vesc_drive::input::gamepad::AxisRange;
    ///
    /// let range = AxisRange { min: 0, max: 255 };
    /// assert_eq!(range.normalize(0), -1.0);
    /// assert_eq!(range.normalize(255), 1.0);
    /// ```
    #[must_use]
    pub fn normalize(&self, raw: i32) -> f32 {
        if self.max <= self.min {
            return 0.0;
        }
        let center = (self.min as f32 + self.max as f32) / 2.0;
        let half_span = (self.max as f32 - self.min as f32) / 2.0;
        clamp((raw as f32 - center) / half_span, -1.0, 1.0)
    }
}

/// Build a sample from raw axis readings and button states
fn to_signals(
    raw_x: i32,
    raw_y: i32,
    x_range: AxisRange,
    y_range: AxisRange,
    medium: bool,
    max: bool,
) -> DriveSignals {
    DriveSignals {
        speed: -y_range.normalize(raw_y),
        rotation: x_range.normalize(raw_x),
        medium,
        max,
    }
}

/// Gamepad handle
pub struct Gamepad {
    device: Device,
    device_path: String,
    x_range: AxisRange,
    y_range: AxisRange,
    connected: bool,
}

impl std::fmt::Debug for Gamepad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gamepad")
            .field("device_path", &self.device_path)
            .field("x_range", &self.x_range)
            .field("y_range", &self.y_range)
            .field("connected", &self.connected)
            .finish()
    }
}

impl Gamepad {
    /// Open the gamepad at `device_path`, or the first one found when empty
    ///
    /// # Errors
    ///
    /// - `InputDeviceNotFound`: No gamepad found on the system
    /// - `InputDevice`: The configured device cannot be opened or is not a gamepad
    pub fn open(device_path: &str) -> Result<Self> {
        if device_path.is_empty() {
            return Self::detect();
        }

        let path = Path::new(device_path);
        let device = Device::open(path)
            .map_err(|e| DriveError::InputDevice(format!("Failed to open {}: {}", device_path, e)))?;

        if !is_gamepad(&device) {
            return Err(DriveError::InputDevice(format!(
                "{} does not report X/Y axes",
                device_path
            )));
        }

        Self::from_device(device, path.to_path_buf())
    }

    /// Scan `/dev/input/event*` for the first device that looks like a gamepad
    fn detect() -> Result<Self> {
        let input_dir = Path::new(INPUT_DIR);
        if !input_dir.exists() {
            return Err(DriveError::InputDevice(format!("{} directory not found", INPUT_DIR)));
        }

        let mut entries: Vec<_> = std::fs::read_dir(input_dir)
            .map_err(|e| DriveError::InputDevice(format!("Failed to read {}: {}", INPUT_DIR, e)))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .is_some_and(|name| name.to_string_lossy().starts_with("event"))
            })
            .collect();

        // Deterministic selection when several devices are attached
        entries.sort();

        for path in entries {
            match Device::open(&path) {
                Ok(device) if is_gamepad(&device) => {
                    info!(
                        "Found gamepad {} at {}",
                        device.name().unwrap_or("(unnamed)"),
                        path.display()
                    );
                    return Self::from_device(device, path);
                }
                Ok(_) => debug!("Skipping {}: not a gamepad", path.display()),
                Err(e) => debug!("Could not open {}: {}", path.display(), e),
            }
        }

        Err(DriveError::InputDeviceNotFound)
    }

    fn from_device(device: Device, path: PathBuf) -> Result<Self> {
        let abs = device
            .get_abs_state()
            .map_err(|e| DriveError::InputDevice(format!("Failed to read axis ranges: {}", e)))?;

        let x = abs[ROTATION_AXIS.0 as usize];
        let y = abs[SPEED_AXIS.0 as usize];

        Ok(Self {
            device,
            device_path: path.to_string_lossy().to_string(),
            x_range: AxisRange { min: x.minimum, max: x.maximum },
            y_range: AxisRange { min: y.minimum, max: y.maximum },
            connected: true,
        })
    }

    /// Retry [`Gamepad::open`] every `retry_interval` until a gamepad appears
    pub async fn wait_for(device_path: &str, retry_interval: Duration) -> Self {
        loop {
            match Self::open(device_path) {
                Ok(gamepad) => {
                    info!("Gamepad connected at {}", gamepad.device_path());
                    return gamepad;
                }
                Err(e) => {
                    warn!("Please connect your gamepad ({})", e);
                    tokio::time::sleep(retry_interval).await;
                }
            }
        }
    }

    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    pub fn name(&self) -> Option<&str> {
        self.device.name()
    }
}

impl InputSource for Gamepad {
    fn poll(&mut self) -> Result<DriveSignals> {
        let state = self
            .device
            .get_abs_state()
            .and_then(|abs| Ok((abs, self.device.get_key_state()?)));

        match state {
            Ok((abs, keys)) => Ok(to_signals(
                abs[ROTATION_AXIS.0 as usize].value,
                abs[SPEED_AXIS.0 as usize].value,
                self.x_range,
                self.y_range,
                keys.contains(MEDIUM_BUTTON),
                keys.contains(MAX_BUTTON),
            )),
            Err(e) => {
                self.connected = false;
                warn!("Gamepad {} disconnected: {}", self.device_path, e);
                Err(DriveError::InputDevice(format!("Failed to read gamepad: {}", e)))
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// A device with both stick axes and at least one gamepad-style button
fn is_gamepad(device: &Device) -> bool {
    let has_axes = device
        .supported_absolute_axes()
        .is_some_and(|axes| axes.contains(ROTATION_AXIS) && axes.contains(SPEED_AXIS));
    let has_buttons = device.supported_keys().is_some_and(|keys| {
        keys.contains(Key::BTN_SOUTH) || keys.contains(MEDIUM_BUTTON) || keys.contains(Key::BTN_TRIGGER)
    });
    has_axes && has_buttons
}
