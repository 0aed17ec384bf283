//! # Quad Mixer
//!
//! Converts a (base thrust, yaw rate) pair into four motor throttles with a
//! fixed differential law:
//!
//! | Motor | Throttle |
//! |-------|----------|
//! | FL | `thrust - yaw` |
//! | FR | `thrust + yaw` |
//! | RL | `thrust - yaw` |
//! | RR | `thrust + yaw` |
//!
//! Positive yaw speeds up FR/RR and slows FL/RL. Each result is clamped to
//! `[throttle_min, throttle_max]`.
//!
//! ## Usage
//!
//! ```
//! use eeg_drone::control::limits::ActuatorLimits;
//! use eeg_drone::control::mixer::{Motor, QuadMixer};
//!
//! let mixer = QuadMixer::new(&ActuatorLimits::default());
//! let commands = mixer.mix(0.35, 0.10);
//!
//! assert!((commands[Motor::FrontRight.index()].throttle - 0.45).abs() < 1e-6);
//! assert!((commands[Motor::FrontLeft.index()].throttle - 0.25).abs() < 1e-6);
//! ```

use std::fmt;

use serde::Serialize;

use tracing::warn;

use super::limits::{ActuatorLimits, IdlePolicy, STOPPED_THROTTLE};

/// Number of motors on the airframe.
pub const MOTOR_COUNT: usize = 4;

/// Motor / ESC channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Motor {
    FrontLeft,
    FrontRight,
    RearLeft,
    RearRight,
}

impl Motor {
    /// All channels in output order.
    pub const ALL: [Motor; MOTOR_COUNT] = [
        Motor::FrontLeft,
        Motor::FrontRight,
        Motor::RearLeft,
        Motor::RearRight,
    ];

    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Short label used in logs.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Motor::FrontLeft => "FL",
            Motor::FrontRight => "FR",
            Motor::RearLeft => "RL",
            Motor::RearRight => "RR",
        }
    }
}

impl fmt::Display for Motor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Throttle for one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorCommand {
    pub channel: Motor,
    pub throttle: f32,
}

/// One command per motor, in [`Motor::ALL`] order.
pub type MotorCommands = [MotorCommand; MOTOR_COUNT];

/// Extracts the throttles of a command set.
#[must_use]
pub fn throttles(commands: &MotorCommands) -> [f32; MOTOR_COUNT] {
    commands.map(|command| command.throttle)
}

#[derive(Debug, Clone, Copy)]
pub struct QuadMixer {
    throttle_min: f32,
    throttle_max: f32,
    idle_throttle: f32,
}

impl QuadMixer {
    /// Builds a mixer from the actuator limits.
    ///
    /// Inconsistent limits never make mixing fail: a NaN bound becomes the
    /// stopped throttle and a floor above the ceiling is lowered to it.
    #[must_use]
    pub fn new(limits: &ActuatorLimits) -> Self {
        let throttle_max = if limits.throttle_max.is_nan() {
            STOPPED_THROTTLE
        } else {
            limits.throttle_max
        };
        let throttle_min = if limits.throttle_min.is_nan() {
            STOPPED_THROTTLE
        } else {
            limits.throttle_min.min(throttle_max)
        };
        if throttle_min != limits.throttle_min || throttle_max != limits.throttle_max {
            warn!(
                "Inconsistent throttle range {}..{}, using {}..{}",
                limits.throttle_min, limits.throttle_max, throttle_min, throttle_max
            );
        }

        let idle_throttle = match limits.idle_policy {
            IdlePolicy::ArmAtMin => throttle_min,
            IdlePolicy::Stop => STOPPED_THROTTLE,
        };

        Self {
            throttle_min,
            throttle_max,
            idle_throttle,
        }
    }

    /// Raw differential law, before clamping.
    #[must_use]
    pub fn mix_unclamped(base_thrust: f32, yaw_rate: f32) -> [f32; MOTOR_COUNT] {
        [
            base_thrust - yaw_rate,
            base_thrust + yaw_rate,
            base_thrust - yaw_rate,
            base_thrust + yaw_rate,
        ]
    }

    /// Mixes and clamps to the configured throttle range.
    #[must_use]
    pub fn mix(&self, base_thrust: f32, yaw_rate: f32) -> MotorCommands {
        let raw = Self::mix_unclamped(base_thrust, yaw_rate);
        Self::commands(raw.map(|throttle| self.clamp(throttle)))
    }

    /// Commands for a non-thrusting cycle, per the idle policy.
    #[must_use]
    pub fn idle(&self) -> MotorCommands {
        Self::commands([self.idle_throttle; MOTOR_COUNT])
    }

    #[inline]
    fn clamp(&self, throttle: f32) -> f32 {
        // NaN collapses to the floor; the ceiling wins over the floor
        throttle.max(self.throttle_min).min(self.throttle_max)
    }

    fn commands(throttles: [f32; MOTOR_COUNT]) -> MotorCommands {
        let mut commands = Motor::ALL.map(|channel| MotorCommand {
            channel,
            throttle: 0.0,
        });
        for (command, throttle) in commands.iter_mut().zip(throttles) {
            command.throttle = throttle;
        }
        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::limits::ActuatorProfile;

    const TOLERANCE: f32 = 1e-6;

    fn flight() -> QuadMixer {
        QuadMixer::new(&ActuatorLimits::for_profile(ActuatorProfile::Flight))
    }

    fn bench() -> QuadMixer {
        QuadMixer::new(&ActuatorLimits::for_profile(ActuatorProfile::Bench))
    }

    // ==================== Mixing Law Tests ====================

    #[test]
    fn test_unclamped_law_invariants() {
        for &thrust in &[-1.0f32, 0.0, 0.15, 0.35, 0.7, 2.0] {
            for &yaw in &[-0.5f32, -0.2, 0.0, 0.05, 0.2, 1.0] {
                let [fl, fr, rl, rr] = QuadMixer::mix_unclamped(thrust, yaw);
                assert!((fl + rr - 2.0 * thrust).abs() < TOLERANCE);
                assert!((fr + rl - 2.0 * thrust).abs() < TOLERANCE);
                assert!((fr - fl - 2.0 * yaw).abs() < TOLERANCE);
                assert!((rr - rl - 2.0 * yaw).abs() < TOLERANCE);
            }
        }
    }

    #[test]
    fn test_zero_yaw_gives_equal_throttles() {
        let commands = flight().mix(0.35, 0.0);
        for command in &commands {
            assert_eq!(command.throttle, 0.35);
        }
    }

    #[test]
    fn test_positive_yaw_direction() {
        let commands = flight().mix(0.35, 0.10);
        let [fl, fr, rl, rr] = throttles(&commands);
        assert!((fl - 0.25).abs() < TOLERANCE);
        assert!((fr - 0.45).abs() < TOLERANCE);
        assert!((rl - 0.25).abs() < TOLERANCE);
        assert!((rr - 0.45).abs() < TOLERANCE);
    }

    #[test]
    fn test_channel_order() {
        let commands = flight().mix(0.2, 0.0);
        for (command, motor) in commands.iter().zip(Motor::ALL) {
            assert_eq!(command.channel, motor);
        }
    }

    // ==================== Clamping Tests ====================

    #[test]
    fn test_clamped_to_flight_ceiling() {
        let commands = flight().mix(0.35, 0.20);
        let [fl, fr, rl, rr] = throttles(&commands);
        assert!((fl - 0.15).abs() < TOLERANCE);
        assert_eq!(fr, 0.5);
        assert!((rl - 0.15).abs() < TOLERANCE);
        assert_eq!(rr, 0.5);
    }

    #[test]
    fn test_clamped_to_floor() {
        let commands = flight().mix(0.15, 0.15);
        assert_eq!(commands[Motor::FrontLeft.index()].throttle, 0.05);
        assert_eq!(commands[Motor::RearLeft.index()].throttle, 0.05);
    }

    #[test]
    fn test_bench_allows_full_throttle() {
        let commands = bench().mix(0.9, 0.2);
        assert_eq!(commands[Motor::FrontRight.index()].throttle, 1.0);
        assert!((commands[Motor::FrontLeft.index()].throttle - 0.7).abs() < TOLERANCE);
    }

    #[test]
    fn test_clamp_invariant_holds_everywhere() {
        let mixer = flight();
        for thrust in [-5.0f32, 0.0, 0.3, 5.0, f32::NAN] {
            for yaw in [-5.0f32, 0.0, 0.3, 5.0] {
                for command in mixer.mix(thrust, yaw) {
                    assert!((0.05..=0.5).contains(&command.throttle));
                }
            }
        }
    }

    // ==================== Idle Tests ====================

    #[test]
    fn test_idle_arm_at_min() {
        for command in flight().idle() {
            assert_eq!(command.throttle, 0.05);
        }
    }

    #[test]
    fn test_idle_stop() {
        for command in bench().idle() {
            assert_eq!(command.throttle, 0.0);
        }
    }

    #[test]
    fn test_idle_policy_override() {
        let mut limits = ActuatorLimits::for_profile(ActuatorProfile::Flight);
        limits.idle_policy = IdlePolicy::Stop;
        for command in QuadMixer::new(&limits).idle() {
            assert_eq!(command.throttle, 0.0);
        }
    }

    #[test]
    fn test_motor_labels() {
        let labels: Vec<_> = Motor::ALL.iter().map(|m| m.to_string()).collect();
        assert_eq!(labels, vec!["FL", "FR", "RL", "RR"]);
    }

    // ==================== Inconsistent Limit Tests ====================

    #[test]
    fn test_floor_above_ceiling_does_not_panic() {
        let mut limits = ActuatorLimits::for_profile(ActuatorProfile::Flight);
        limits.throttle_min = 0.6;
        let mixer = QuadMixer::new(&limits);

        for command in mixer.mix(0.35, 0.0) {
            assert_eq!(command.throttle, 0.5);
        }
        for command in mixer.idle() {
            assert_eq!(command.throttle, 0.5);
        }
    }

    #[test]
    fn test_nan_bounds_do_not_panic() {
        let mut limits = ActuatorLimits::for_profile(ActuatorProfile::Flight);
        limits.throttle_min = f32::NAN;
        let commands = QuadMixer::new(&limits).mix(0.35, 0.1);
        for command in commands {
            assert!((0.0..=0.5).contains(&command.throttle));
        }

        limits.throttle_max = f32::NAN;
        for command in QuadMixer::new(&limits).mix(0.35, 0.1) {
            assert_eq!(command.throttle, 0.0);
        }
    }
}
