//! # ESC Output Module
//!
//! Maps normalised throttles onto the standard ESC pulse contract and writes
//! them through a [`PwmOutput`] backend.
//!
//! ## Pulse Contract
//!
//! At 50 Hz a period is 20 ms. Zero throttle is a 1000 µs pulse (5 % of the
//! period), full throttle a 2000 µs pulse (10 %). With a 12-bit timer:
//!
//! | Throttle | Pulse | Duty (of 4096) |
//! |----------|-------|----------------|
//! | 0.0 | 1000 µs | 205 |
//! | 0.5 | 1500 µs | 307 |
//! | 1.0 | 2000 µs | 410 |
//!
//! `duty = round((pulse_min + t * (pulse_max - pulse_min)) * steps)`
//!
//! ## Usage
//!
//! ```
//! use eeg_drone::control::limits::ActuatorLimits;
//! use eeg_drone::esc::{EscDriver, SimulatedPwm};
//!
//! let driver = EscDriver::new(SimulatedPwm::new(), &ActuatorLimits::default(), 50);
//! assert_eq!(driver.duty_for(0.0), 205);
//! assert_eq!(driver.duty_for(1.0), 410);
//! ```

pub mod pwm;

pub use pwm::{PwmOutput, SimulatedPwm};

use std::time::Duration;

use tracing::{info, warn};

use crate::control::limits::{ActuatorLimits, STOPPED_THROTTLE};
use crate::control::mixer::{Motor, MotorCommands, MOTOR_COUNT};

/// Throttle of the full-scale calibration pulse.
const CALIBRATION_FULL_THROTTLE: f32 = 1.0;

/// Drives four ESC channels.
///
/// Every call to [`EscDriver::drive_all`] writes each channel exactly once,
/// whether or not its value changed.
#[derive(Debug)]
pub struct EscDriver<O: PwmOutput> {
    output: O,
    pulse_min_fraction: f64,
    pulse_max_fraction: f64,
    steps: u32,
    frequency_hz: u32,
    last_duties: [u32; MOTOR_COUNT],
    write_failures: u64,
}

impl<O: PwmOutput> EscDriver<O> {
    /// Creates a driver over a PWM backend.
    ///
    /// # Arguments
    ///
    /// * `output` - PWM backend
    /// * `limits` - Pulse fractions and timer resolution
    /// * `frequency_hz` - PWM frequency, only used for reporting pulse widths
    pub fn new(output: O, limits: &ActuatorLimits, frequency_hz: u32) -> Self {
        Self {
            output,
            pulse_min_fraction: f64::from(limits.pulse_min_fraction),
            pulse_max_fraction: f64::from(limits.pulse_max_fraction),
            steps: limits.pwm_resolution_steps,
            frequency_hz,
            last_duties: [0; MOTOR_COUNT],
            write_failures: 0,
        }
    }

    /// Duty value for a throttle; the throttle is clamped to `[0, 1]` first.
    #[must_use]
    pub fn duty_for(&self, throttle: f32) -> u32 {
        let t = if throttle.is_nan() {
            0.0
        } else {
            f64::from(throttle.clamp(0.0, 1.0))
        };
        let fraction =
            self.pulse_min_fraction + t * (self.pulse_max_fraction - self.pulse_min_fraction);
        (fraction * f64::from(self.steps)).round() as u32
    }

    /// Throttle corresponding to a duty value, clamped to `[0, 1]`.
    #[must_use]
    pub fn throttle_for_duty(&self, duty: u32) -> f32 {
        let span = self.pulse_max_fraction - self.pulse_min_fraction;
        if span <= 0.0 || self.steps == 0 {
            return 0.0;
        }
        let fraction = f64::from(duty) / f64::from(self.steps);
        ((fraction - self.pulse_min_fraction) / span).clamp(0.0, 1.0) as f32
    }

    /// Pulse width in microseconds for a duty value.
    #[must_use]
    pub fn pulse_width_us(&self, duty: u32) -> f32 {
        if self.steps == 0 || self.frequency_hz == 0 {
            return 0.0;
        }
        let period_us = 1_000_000.0 / f64::from(self.frequency_hz);
        (f64::from(duty) / f64::from(self.steps) * period_us) as f32
    }

    /// Writes one channel and returns the duty that was sent.
    ///
    /// A backend failure is logged and counted; it never propagates.
    pub fn drive(&mut self, motor: Motor, throttle: f32) -> u32 {
        let duty = self.duty_for(throttle);
        if let Err(e) = self.output.write_duty(motor, duty) {
            self.write_failures += 1;
            warn!("PWM write to {} failed: {}", motor, e);
        }
        self.last_duties[motor.index()] = duty;
        duty
    }

    /// Writes all four channels, one write each.
    pub fn drive_all(&mut self, commands: &MotorCommands) -> [u32; MOTOR_COUNT] {
        for command in commands {
            self.drive(command.channel, command.throttle);
        }
        self.last_duties
    }

    /// Sends the zero-throttle pulse on every channel.
    pub fn stop_all(&mut self) -> [u32; MOTOR_COUNT] {
        for motor in Motor::ALL {
            self.drive(motor, STOPPED_THROTTLE);
        }
        self.last_duties
    }

    /// Boot-time ESC range calibration.
    ///
    /// Holds the full-scale pulse, then the zero-throttle pulse, each for
    /// `hold`. Motors must be unpropped.
    pub async fn calibrate(&mut self, hold: Duration) {
        warn!("ESC calibration: sending full-scale pulse for {:?}", hold);
        for motor in Motor::ALL {
            self.drive(motor, CALIBRATION_FULL_THROTTLE);
        }
        tokio::time::sleep(hold).await;

        info!("ESC calibration: sending zero-throttle pulse for {:?}", hold);
        self.stop_all();
        tokio::time::sleep(hold).await;

        info!("ESC calibration complete");
    }

    /// Duties written by the most recent cycle, in [`Motor::ALL`] order.
    #[must_use]
    pub fn last_duties(&self) -> [u32; MOTOR_COUNT] {
        self.last_duties
    }

    #[must_use]
    pub fn write_failures(&self) -> u64 {
        self.write_failures
    }

    pub fn output(&self) -> &O {
        &self.output
    }
}
