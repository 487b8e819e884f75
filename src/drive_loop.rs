//! # Drive Loop
//!
//! One cycle: poll input, run kinematics, scale by speed mode, read both
//! wheels' RPM, then issue exactly one directive per wheel, left first.
//!
//! An RPM read that fails for any [`ControllerError`] reason reads as 0 for
//! that cycle. A failed directive is logged and the cycle carries on.
//!
//! [`DriveLoop::run`] always ends with [`DriveLoop::teardown`], however the
//! loop was left, including by a panic inside a cycle.

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use chrono::Utc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::{Config, DispatchMode};
use crate::drive::{Kinematics, SpeedModeConfig};
use crate::error::ControllerError;
use crate::input::{DriveSignals, InputSource};
use crate::motor::{MotorController, NormalizedCommand};
use crate::telemetry::{CycleRecord, TelemetryLogger};

pub struct DriveLoop {
    left: Box<dyn MotorController>,
    right: Box<dyn MotorController>,
    kinematics: Kinematics,
    speed: SpeedModeConfig,
    dispatch: DispatchMode,
    reverse_lockout: bool,
    telemetry: Option<TelemetryLogger>,
    torn_down: bool,
}

impl DriveLoop {
    pub fn new(left: Box<dyn MotorController>, right: Box<dyn MotorController>, config: &Config) -> Self {
        Self {
            left,
            right,
            kinematics: config.drive.kinematics(),
            speed: config.speed,
            dispatch: config.drive.dispatch,
            reverse_lockout: config.drive.reverse_lockout,
            telemetry: None,
            torn_down: false,
        }
    }

    /// Also append every cycle's record to `logger`
    #[must_use]
    pub fn with_telemetry(mut self, logger: TelemetryLogger) -> Self {
        self.telemetry = Some(logger);
        self
    }

    /// Run one control cycle for `signals`
    pub async fn step(&mut self, signals: DriveSignals) -> CycleRecord {
        let mode = signals.speed_mode();
        let wheels = self
            .kinematics
            .compute(signals.drive_input())
            .scaled(self.speed.multiplier(mode));

        let left = NormalizedCommand::new(wheels.left);
        let right = NormalizedCommand::new(wheels.right);

        let left_rpm = read_rpm(self.left.as_mut(), "left").await;
        let right_rpm = read_rpm(self.right.as_mut(), "right").await;

        let record = CycleRecord {
            timestamp: Utc::now(),
            left,
            right,
            left_rpm,
            right_rpm,
            mode,
        };
        debug!(
            "Left: {:.3}, Right: {:.3}, Left RPM: {}, Right RPM: {}",
            left.value(),
            right.value(),
            left_rpm,
            right_rpm
        );

        if let Err(e) = self.apply(Wheel::Left, left, left_rpm).await {
            warn!("Left directive failed: {}", e);
        }
        if let Err(e) = self.apply(Wheel::Right, right, right_rpm).await {
            warn!("Right directive failed: {}", e);
        }

        if let Some(logger) = self.telemetry.as_mut() {
            if let Err(e) = logger.log(&record) {
                warn!("Failed to write telemetry: {}", e);
            }
        }

        record
    }

    async fn apply(&mut self, wheel: Wheel, command: NormalizedCommand, rpm: i32) -> Result<(), ControllerError> {
        let lockout = self.reverse_lockout && rpm < 0 && command.is_negative();
        let dispatch = self.dispatch;
        let motor = match wheel {
            Wheel::Left => self.left.as_mut(),
            Wheel::Right => self.right.as_mut(),
        };

        if lockout {
            return motor.set_rpm(NormalizedCommand::ZERO).await;
        }

        match dispatch {
            DispatchMode::Rpm => motor.set_rpm(command).await,
            DispatchMode::Current => motor.set_current(command).await,
            DispatchMode::DutyCycle => motor.set_duty_cycle(command).await,
        }
    }

    /// Cycle every `period` until the input disconnects or `shutdown`
    /// completes, then tear both controllers down
    ///
    /// A panic inside a cycle still tears both controllers down before it
    /// resumes unwinding.
    pub async fn run<I, F>(&mut self, input: &mut I, period: Duration, shutdown: F)
    where
        I: InputSource + ?Sized,
        F: Future<Output = ()>,
    {
        let outcome = CatchUnwind::new(self.cycle(input, period, shutdown)).await;

        match outcome {
            Ok(cycles) => {
                info!("Drive loop stopped after {} cycles", cycles);
                self.teardown().await;
            }
            Err(panic) => {
                error!("Drive loop panicked, stopping controllers");
                self.teardown().await;
                std::panic::resume_unwind(panic);
            }
        }
    }

    async fn cycle<I, F>(&mut self, input: &mut I, period: Duration, shutdown: F) -> u64
    where
        I: InputSource + ?Sized,
        F: Future<Output = ()>,
    {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!("Drive loop running every {:?}", period);
        let mut cycles: u64 = 0;

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }

                _ = ticker.tick() => {
                    if !input.is_connected() {
                        warn!("Input disconnected, stopping");
                        break;
                    }
                    match input.poll() {
                        Ok(signals) => {
                            self.step(signals).await;
                            cycles += 1;
                        }
                        Err(e) => warn!("Failed to read input: {}", e),
                    }
                }
            }
        }

        cycles
    }

    /// Stop both controllers; relayed (right) first while the link is alive
    ///
    /// Failures are logged and never propagated. Later calls do nothing.
    pub async fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        if let Err(e) = self.right.teardown().await {
            warn!("Failed to stop right controller: {}", e);
        }
        if let Err(e) = self.left.teardown().await {
            warn!("Failed to stop left controller: {}", e);
        }

        if let Some(logger) = self.telemetry.as_mut() {
            if let Err(e) = logger.flush() {
                warn!("Failed to flush telemetry: {}", e);
            }
        }
        info!("Controllers stopped");
    }
}

/// Resolves to `Err` with the panic payload if polling `inner` panics
struct CatchUnwind<F: Future> {
    inner: Pin<Box<F>>,
}

impl<F: Future> CatchUnwind<F> {
    fn new(inner: F) -> Self {
        Self { inner: Box::pin(inner) }
    }
}

impl<F: Future> Future for CatchUnwind<F> {
    type Output = Result<F::Output, Box<dyn Any + Send>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let inner = self.inner.as_mut();
        match panic::catch_unwind(AssertUnwindSafe(|| inner.poll(cx))) {
            Ok(Poll::Ready(output)) => Poll::Ready(Ok(output)),
            Ok(Poll::Pending) => Poll::Pending,
            Err(payload) => Poll::Ready(Err(payload)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Wheel {
    Left,
    Right,
}

async fn read_rpm(motor: &mut dyn MotorController, name: &str) -> i32 {
    match motor.get_rpm().await {
        Ok(rpm) => rpm,
        Err(e) => {
            debug!("Failed to read {} RPM, using 0: {}", name, e);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use mockall::Sequence;
    use tempfile::TempDir;

    use crate::drive::SpeedMode;
    use crate::error::TransportError;
    use crate::input::scripted::ScriptedInput;
    use crate::motor::{MockMotorController, MotorLimits, SimulatedController};

    fn signals(speed: f32, rotation: f32) -> DriveSignals {
        DriveSignals {
            speed,
            rotation,
            ..DriveSignals::default()
        }
    }

    fn motor_reading(rpm: i32) -> MockMotorController {
        let mut motor = MockMotorController::new();
        motor.expect_get_rpm().returning(move || Ok(rpm));
        motor
    }

    fn failing_motor() -> MockMotorController {
        let mut motor = MockMotorController::new();
        motor
            .expect_get_rpm()
            .returning(|| Err(ControllerError::Transport(TransportError::Timeout(100))));
        motor
    }

    #[tokio::test]
    async fn test_end_to_end_slow_forward() {
        let limits = MotorLimits::default();
        let left = SimulatedController::new("left", 42, limits);
        let right = SimulatedController::new("right", 78, limits);
        let (left_probe, right_probe) = (left.probe(), right.probe());

        let mut drive = DriveLoop::new(Box::new(left), Box::new(right), &Config::default());
        let record = drive.step(signals(0.5, 0.0)).await;

        let expected = limits.rpm(NormalizedCommand::new(0.25 * 0.3));
        let left_rpm = left_probe.snapshot().rpm;
        let right_rpm = right_probe.snapshot().rpm;

        assert_eq!(left_rpm, expected);
        assert_eq!(right_rpm, expected);
        assert!((left_rpm - 1500).abs() <= 1, "got {}", left_rpm);
        assert_eq!(left_probe.snapshot().directives, 1);
        assert_eq!(record.mode, SpeedMode::Slow);
        assert_eq!(record.left, record.right);
    }

    #[tokio::test]
    async fn test_read_failure_falls_back_to_zero() {
        let mut left = failing_motor();
        left.expect_set_rpm().times(1).returning(|_| Ok(()));
        let mut right = motor_reading(250);
        right.expect_set_rpm().times(1).returning(|_| Ok(()));

        let mut drive = DriveLoop::new(Box::new(left), Box::new(right), &Config::default());
        let record = drive.step(signals(0.8, 0.0)).await;

        assert_eq!(record.left_rpm, 0);
        assert_eq!(record.right_rpm, 250);
    }

    #[tokio::test]
    async fn test_reverse_lockout_holds_reversing_wheel() {
        let mut config = Config::default();
        config.drive.reverse_lockout = true;
        config.drive.dispatch = DispatchMode::Current;

        // Both commands negative; only the left wheel is already turning backwards
        let mut left = motor_reading(-500);
        left.expect_set_rpm()
            .with(eq(NormalizedCommand::ZERO))
            .times(1)
            .returning(|_| Ok(()));
        left.expect_set_current().never();

        let mut right = motor_reading(0);
        right.expect_set_current()
            .withf(|command| command.is_negative())
            .times(1)
            .returning(|_| Ok(()));

        let mut drive = DriveLoop::new(Box::new(left), Box::new(right), &config);
        drive.step(signals(-1.0, 0.0)).await;
    }

    #[tokio::test]
    async fn test_lockout_disabled_drives_backwards() {
        let mut left = motor_reading(-500);
        left.expect_set_rpm()
            .withf(|command| command.is_negative())
            .times(1)
            .returning(|_| Ok(()));
        let mut right = motor_reading(-500);
        right.expect_set_rpm()
            .withf(|command| command.is_negative())
            .times(1)
            .returning(|_| Ok(()));

        let mut drive = DriveLoop::new(Box::new(left), Box::new(right), &Config::default());
        drive.step(signals(-1.0, 0.0)).await;
    }

    #[tokio::test]
    async fn test_duty_cycle_dispatch() {
        let mut config = Config::default();
        config.drive.dispatch = DispatchMode::DutyCycle;

        let mut left = motor_reading(0);
        left.expect_set_duty_cycle().times(1).returning(|_| Ok(()));
        let mut right = motor_reading(0);
        right.expect_set_duty_cycle().times(1).returning(|_| Ok(()));

        let mut drive = DriveLoop::new(Box::new(left), Box::new(right), &config);
        drive.step(signals(0.5, 0.5)).await;
    }

    #[tokio::test]
    async fn test_failed_directive_does_not_skip_other_wheel() {
        let mut left = motor_reading(0);
        left.expect_set_rpm()
            .times(1)
            .returning(|_| Err(ControllerError::Transport(TransportError::Closed)));
        let mut right = motor_reading(0);
        right.expect_set_rpm().times(1).returning(|_| Ok(()));

        let mut drive = DriveLoop::new(Box::new(left), Box::new(right), &Config::default());
        drive.step(signals(0.5, 0.0)).await;
    }

    #[tokio::test]
    async fn test_turning_in_place_is_stationary_in_curvature() {
        let mut left = motor_reading(0);
        left.expect_set_rpm()
            .with(eq(NormalizedCommand::ZERO))
            .times(1)
            .returning(|_| Ok(()));
        let mut right = motor_reading(0);
        right.expect_set_rpm()
            .with(eq(NormalizedCommand::ZERO))
            .times(1)
            .returning(|_| Ok(()));

        let mut drive = DriveLoop::new(Box::new(left), Box::new(right), &Config::default());
        drive.step(signals(0.0, 1.0)).await;
    }

    #[tokio::test]
    async fn test_run_until_disconnect_then_teardown_in_order() {
        let mut seq = Sequence::new();

        let mut left = motor_reading(0);
        left.expect_set_rpm().times(2).returning(|_| Ok(()));
        let mut right = motor_reading(0);
        right.expect_set_rpm().times(2).returning(|_| Ok(()));

        right.expect_teardown().times(1).in_sequence(&mut seq).returning(|| Ok(()));
        left.expect_teardown().times(1).in_sequence(&mut seq).returning(|| Ok(()));

        let mut input = ScriptedInput::new([signals(0.2, 0.0), signals(0.4, 0.1)]);
        let mut drive = DriveLoop::new(Box::new(left), Box::new(right), &Config::default());

        drive
            .run(&mut input, Duration::from_millis(1), std::future::pending())
            .await;

        // A second teardown must not reach the controllers again
        drive.teardown().await;
    }

    #[tokio::test]
    async fn test_shutdown_still_tears_down() {
        let mut left = motor_reading(0);
        left.expect_set_rpm().never();
        left.expect_teardown().times(1).returning(|| Ok(()));
        let mut right = motor_reading(0);
        right.expect_set_rpm().never();
        right.expect_teardown().times(1).returning(|| Ok(()));

        let mut input = ScriptedInput::new([signals(1.0, 0.0)]);
        let mut drive = DriveLoop::new(Box::new(left), Box::new(right), &Config::default());

        drive
            .run(&mut input, Duration::from_millis(1), std::future::ready(()))
            .await;
    }

    struct FaultyInput;

    impl InputSource for FaultyInput {
        fn poll(&mut self) -> crate::error::Result<DriveSignals> {
            panic!("input driver fault");
        }

        fn is_connected(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_panicking_cycle_still_stops_controllers() {
        let limits = MotorLimits::default();
        let left = SimulatedController::new("left", 42, limits);
        let right = SimulatedController::new("right", 78, limits);
        let (left_probe, right_probe) = (left.probe(), right.probe());

        let mut drive = DriveLoop::new(Box::new(left), Box::new(right), &Config::default());
        let outcome = tokio::spawn(async move {
            drive
                .run(&mut FaultyInput, Duration::from_millis(1), std::future::pending())
                .await;
        })
        .await;

        let err = outcome.unwrap_err();
        assert!(err.is_panic());
        assert!(left_probe.snapshot().torn_down);
        assert!(right_probe.snapshot().torn_down);
    }

    #[tokio::test]
    async fn test_teardown_failure_does_not_skip_left() {
        let mut left = MockMotorController::new();
        left.expect_teardown().times(1).returning(|| Ok(()));
        let mut right = MockMotorController::new();
        right
            .expect_teardown()
            .times(1)
            .returning(|| Err(ControllerError::Transport(TransportError::Closed)));

        let mut drive = DriveLoop::new(Box::new(left), Box::new(right), &Config::default());
        drive.teardown().await;
    }

    #[tokio::test]
    async fn test_cycles_are_written_to_telemetry() {
        let dir = TempDir::new().unwrap();
        let logger = TelemetryLogger::new(dir.path(), 100, 2).unwrap();
        let limits = MotorLimits::default();

        let mut drive = DriveLoop::new(
            Box::new(SimulatedController::new("left", 42, limits)),
            Box::new(SimulatedController::new("right", 78, limits)),
            &Config::default(),
        )
        .with_telemetry(logger);

        drive.step(signals(1.0, 0.0)).await;
        drive.step(signals(1.0, 0.0)).await;
        drive.teardown().await;

        let entry = std::fs::read_dir(dir.path()).unwrap().next().unwrap().unwrap();
        let contents = std::fs::read_to_string(entry.path()).unwrap();
        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["left_rpm"], 0);
        // The second cycle reads back the first cycle's command
        let expected = limits.rpm(NormalizedCommand::new(0.3));
        assert_eq!(lines[1]["left_rpm"], expected);
        assert_eq!(lines[1]["mode"], "slow");
    }
}
