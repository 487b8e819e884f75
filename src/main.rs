//! # VESC Drive
//!
//! Drive a differential-drive robot with a gamepad through VESC motor
//! controllers.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load configuration (first argument, or `config/default.toml`)
//!    - Set up logging with tracing subscriber
//!    - Wait for a gamepad
//!    - Discover the left VESC and relay to the right one (or simulate both)
//!
//! 2. **Main Loop**
//!    - Poll the gamepad every `input.poll_interval_ms`
//!    - Compute wheel commands and dispatch them to both controllers
//!    - Stop on Ctrl+C or when the gamepad disconnects
//!
//! 3. **Shutdown**
//!    - Stop the right controller, then the left one
//!    - Cancel the heartbeat so the VESC releases the motor
//!
//! # Examples
//!
//! ```bash
//! cargo run --release -- config/default.toml
//! ```

use anyhow::{Context, Result};
use std::path::Path;
use tokio::time::Duration;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use vesc_drive::config::{Config, LoggingConfig};
use vesc_drive::discovery::{self, DiscoverySettings};
use vesc_drive::drive_loop::DriveLoop;
use vesc_drive::input::Gamepad;
use vesc_drive::motor::{MotorController, SimulatedController};
use vesc_drive::telemetry::TelemetryLogger;

/// Configuration file used when no path is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Interval between attempts to find a gamepad
const GAMEPAD_RETRY_INTERVAL: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let (config, used_defaults) = load_config(&config_path)?;

    let _log_guard = init_logging(&config.logging)?;

    info!("VESC Drive v{} starting...", env!("CARGO_PKG_VERSION"));
    if used_defaults {
        warn!("{} not found, using built-in defaults", config_path);
    } else {
        info!("Loaded configuration from {}", config_path);
    }

    let mut gamepad = tokio::select! {
        gamepad = Gamepad::wait_for(&config.input.device_path, GAMEPAD_RETRY_INTERVAL) => gamepad,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C while waiting for gamepad");
            return Ok(());
        }
    };

    let (left, right) = if config.motor.simulate {
        info!("Simulating motor controllers");
        let limits = config.motor.limits();
        let left: Box<dyn MotorController> =
            Box::new(SimulatedController::new("left", config.motor.left_id, limits));
        let right: Box<dyn MotorController> =
            Box::new(SimulatedController::new("right", config.motor.right_id, limits));
        (left, right)
    } else {
        let settings = DiscoverySettings::from_config(&config);
        tokio::select! {
            (left, right) = discovery::discover(&settings) => {
                let left: Box<dyn MotorController> = Box::new(left);
                let right: Box<dyn MotorController> = Box::new(right);
                (left, right)
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C during discovery");
                return Ok(());
            }
        }
    };

    let mut drive = DriveLoop::new(left, right, &config);
    if config.telemetry.enabled {
        match TelemetryLogger::from_config(&config.telemetry) {
            Ok(logger) => drive = drive.with_telemetry(logger),
            Err(e) => warn!("Telemetry disabled: {}", e),
        }
    }

    info!("Press Ctrl+C to exit");
    let period = Duration::from_millis(config.input.poll_interval_ms);
    drive
        .run(&mut gamepad, period, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    info!("VESC Drive stopped");
    Ok(())
}

/// Load `path`, falling back to defaults only when the default path is absent
fn load_config(path: &str) -> Result<(Config, bool)> {
    if path == DEFAULT_CONFIG_PATH && !Path::new(path).exists() {
        return Ok((Config::default(), true));
    }
    let config = Config::load(path).with_context(|| format!("Failed to load {}", path))?;
    Ok((config, false))
}

/// Log to stdout, and also to a daily-rolling file when `logging.dir` is set
///
/// The returned guard must be held for the life of the process so buffered
/// file output is flushed.
fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    if config.dir.is_empty() {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .try_init()
            .context("Failed to initialize logging")?;
        return Ok(None);
    }

    let appender = tracing_appender::rolling::daily(&config.dir, "vesc-drive.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(Some(guard))
}
