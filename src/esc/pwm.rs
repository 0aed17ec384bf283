//! Trait abstraction for PWM duty writes to enable testing

use tracing::trace;

use crate::control::mixer::{Motor, MOTOR_COUNT};
use crate::error::Result;

/// Trait for the PWM peripheral driving the ESC signal lines
#[cfg_attr(test, mockall::automock)]
pub trait PwmOutput: Send {
    /// Write a duty value (in timer steps) to one channel
    fn write_duty(&mut self, motor: Motor, duty: u32) -> Result<()>;
}

/// In-memory PWM backend that keeps the last duty written per channel
#[derive(Debug, Default, Clone)]
pub struct SimulatedPwm {
    duties: [Option<u32>; MOTOR_COUNT],
    writes: u64,
}

impl SimulatedPwm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last duty written to a channel, if any
    pub fn duty(&self, motor: Motor) -> Option<u32> {
        self.duties[motor.index()]
    }

    /// Total number of writes accepted
    pub fn writes(&self) -> u64 {
        self.writes
    }
}

impl PwmOutput for SimulatedPwm {
    fn write_duty(&mut self, motor: Motor, duty: u32) -> Result<()> {
        trace!("PWM {} <- {}", motor, duty);
        self.duties[motor.index()] = Some(duty);
        self.writes += 1;
        Ok(())
    }
}
