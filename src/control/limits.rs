//! # Actuator Limits
//!
//! Process-wide actuator configuration shared by the mixer and the ESC
//! driver. Two deployment profiles differ only in data:
//!
//! | Profile | Throttle range | Idle output |
//! |---------|----------------|-------------|
//! | `flight` | 0.05 – 0.5 | ESCs held armed at `throttle_min` |
//! | `bench` | 0.05 – 1.0 | full stop (`0.0`) |

use serde::Deserialize;

/// Lowest throttle sent while thrusting; also the arm-at-min idle level.
pub const DEFAULT_THROTTLE_MIN: f32 = 0.05;

/// Throttle ceiling for flight-capable profiles.
pub const FLIGHT_THROTTLE_MAX: f32 = 0.5;

/// Throttle ceiling for bench tests with propellers removed.
pub const BENCH_THROTTLE_MAX: f32 = 1.0;

/// Throttle written by the `stop` idle policy.
pub const STOPPED_THROTTLE: f32 = 0.0;

/// Pulse width at zero throttle as a fraction of the PWM period (1000 µs of 20 ms).
pub const DEFAULT_PULSE_MIN_FRACTION: f32 = 0.05;

/// Pulse width at full throttle as a fraction of the PWM period (2000 µs of 20 ms).
pub const DEFAULT_PULSE_MAX_FRACTION: f32 = 0.10;

/// Duty-cycle steps per PWM period (12-bit timer).
pub const DEFAULT_PWM_RESOLUTION_STEPS: u32 = 4096;

/// ESC refresh rate.
pub const DEFAULT_PWM_FREQUENCY_HZ: u32 = 50;

/// Deployment profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActuatorProfile {
    #[default]
    Flight,
    Bench,
}

/// Output used whenever the cycle is not thrusting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdlePolicy {
    /// Keep ESCs armed at `throttle_min` to avoid re-sync delays.
    ArmAtMin,
    /// De-energize motors completely.
    Stop,
}

impl IdlePolicy {
    /// Profile default.
    #[must_use]
    pub fn for_profile(profile: ActuatorProfile) -> Self {
        match profile {
            ActuatorProfile::Flight => IdlePolicy::ArmAtMin,
            ActuatorProfile::Bench => IdlePolicy::Stop,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuatorLimits {
    pub throttle_min: f32,
    pub throttle_max: f32,
    pub pulse_min_fraction: f32,
    pub pulse_max_fraction: f32,
    pub pwm_resolution_steps: u32,
    pub idle_policy: IdlePolicy,
}

impl Default for ActuatorLimits {
    fn default() -> Self {
        Self::for_profile(ActuatorProfile::default())
    }
}

impl ActuatorLimits {
    /// Limits for a deployment profile with the standard ESC pulse contract.
    #[must_use]
    pub fn for_profile(profile: ActuatorProfile) -> Self {
        let throttle_max = match profile {
            ActuatorProfile::Flight => FLIGHT_THROTTLE_MAX,
            ActuatorProfile::Bench => BENCH_THROTTLE_MAX,
        };

        Self {
            throttle_min: DEFAULT_THROTTLE_MIN,
            throttle_max,
            pulse_min_fraction: DEFAULT_PULSE_MIN_FRACTION,
            pulse_max_fraction: DEFAULT_PULSE_MAX_FRACTION,
            pwm_resolution_steps: DEFAULT_PWM_RESOLUTION_STEPS,
            idle_policy: IdlePolicy::for_profile(profile),
        }
    }

    /// Throttle written on idle cycles.
    #[must_use]
    pub fn idle_throttle(&self) -> f32 {
        match self.idle_policy {
            IdlePolicy::ArmAtMin => self.throttle_min,
            IdlePolicy::Stop => STOPPED_THROTTLE,
        }
    }
}
