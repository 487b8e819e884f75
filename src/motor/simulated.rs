//! In-memory controller for running without hardware.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::{debug, info};

use super::units::{MotorLimits, NormalizedCommand};
use super::MotorController;
use crate::error::ControllerError;
use crate::vesc::protocol::Measurement;

/// Last state written to a simulated controller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulatedState {
    pub rpm: i32,
    pub current_ma: i32,
    pub duty_cycle: i32,
    pub directives: usize,
    pub torn_down: bool,
}

/// Read-only view of a [`SimulatedController`], usable after the
/// controller itself has been moved into a drive loop.
#[derive(Debug, Clone)]
pub struct SimulatedProbe {
    state: Arc<Mutex<SimulatedState>>,
}

impl SimulatedProbe {
    pub fn snapshot(&self) -> SimulatedState {
        lock(&self.state).clone()
    }
}

/// Motor that reports back whatever it was last told.
///
/// An RPM or duty-cycle directive moves the reported RPM to the commanded
/// value immediately. A current directive is recorded but leaves the RPM
/// where it was.
#[derive(Debug)]
pub struct SimulatedController {
    name: String,
    controller_id: u8,
    limits: MotorLimits,
    state: Arc<Mutex<SimulatedState>>,
}

impl SimulatedController {
    pub fn new(name: impl Into<String>, controller_id: u8, limits: MotorLimits) -> Self {
        Self {
            name: name.into(),
            controller_id,
            limits,
            state: Arc::new(Mutex::new(SimulatedState::default())),
        }
    }

    pub fn probe(&self) -> SimulatedProbe {
        SimulatedProbe {
            state: Arc::clone(&self.state),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut SimulatedState)) {
        let mut state = lock(&self.state);
        apply(&mut state);
        state.directives += 1;
    }
}

// A poisoned lock only means a test panicked mid-update; the state is plain data
fn lock(state: &Mutex<SimulatedState>) -> MutexGuard<'_, SimulatedState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl MotorController for SimulatedController {
    async fn set_rpm(&mut self, command: NormalizedCommand) -> Result<(), ControllerError> {
        let rpm = self.limits.rpm(command);
        debug!("[sim {}] set_rpm {}", self.name, rpm);
        self.update(|state| state.rpm = rpm);
        Ok(())
    }

    async fn set_current(&mut self, command: NormalizedCommand) -> Result<(), ControllerError> {
        let current = self.limits.current(command);
        debug!("[sim {}] set_current {} mA", self.name, current);
        self.update(|state| state.current_ma = current);
        Ok(())
    }

    async fn set_duty_cycle(&mut self, command: NormalizedCommand) -> Result<(), ControllerError> {
        let duty = self.limits.duty_cycle(command);
        let rpm = self.limits.rpm(command);
        debug!("[sim {}] set_duty_cycle {}", self.name, duty);
        self.update(|state| {
            state.duty_cycle = duty;
            state.rpm = rpm;
        });
        Ok(())
    }

    async fn measure(&mut self) -> Result<Measurement, ControllerError> {
        let state = lock(&self.state).clone();
        Ok(Measurement {
            rpm: state.rpm,
            avg_motor_current: state.current_ma as f32 / 1000.0,
            duty_cycle: state.duty_cycle as f32 / 100_000.0,
            controller_id: self.controller_id,
            ..Measurement::default()
        })
    }

    async fn get_rpm(&mut self) -> Result<i32, ControllerError> {
        Ok(lock(&self.state).rpm)
    }

    async fn teardown(&mut self) -> Result<(), ControllerError> {
        let mut state = lock(&self.state);
        if state.torn_down {
            return Ok(());
        }

        info!("[sim {}] stopped", self.name);
        *state = SimulatedState {
            directives: state.directives,
            torn_down: true,
            ..SimulatedState::default()
        };
        Ok(())
    }
}
