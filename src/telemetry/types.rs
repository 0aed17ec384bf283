//! Telemetry record types

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::control::band::ControlBand;
use crate::control::core::CycleOutput;
use crate::control::mixer::{throttles, MOTOR_COUNT};

/// One JSONL line: the state of a single control cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleRecord {
    /// RFC 3339 wall-clock time, millisecond precision
    pub timestamp: String,
    pub value: f32,
    pub band: ControlBand,
    /// 1-based band number
    pub band_number: u8,
    pub stale: bool,
    pub watchdog_tripped: bool,
    pub thrusting: bool,
    /// FL, FR, RL, RR
    pub throttles: [f32; MOTOR_COUNT],
    pub duties: [u32; MOTOR_COUNT],
    /// `#RRGGBB`
    pub color: String,
}

impl CycleRecord {
    /// Builds a record stamped with the current time.
    pub fn new(output: &CycleOutput, duties: [u32; MOTOR_COUNT]) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            value: output.value,
            band: output.band,
            band_number: output.band.number(),
            stale: output.stale,
            watchdog_tripped: output.watchdog_tripped,
            thrusting: output.thrusting,
            throttles: throttles(&output.commands),
            duties,
            color: output.color.to_string(),
        }
    }
}
