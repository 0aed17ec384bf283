//! # Control Cycle
//!
//! [`ControlCore`] owns all mutable control state and runs one cycle at a
//! time:
//!
//! 1. Staleness check; a stale signal reads as `0.0`
//! 2. Classification into a band
//! 3. Thrust is requested only with a fresh signal and a non-idle band
//! 4. The session watchdog may force idle
//! 5. Mixing (or idle output) and status colour
//!
//! Samples are handed in through [`ControlCore::ingest`] or
//! [`ControlCore::accept`] from the same thread that runs the cycles.
//!
//! ## Usage
//!
//! ```
//! use std::time::Instant;
//! use eeg_drone::control::core::{ControlCore, CoreSettings};
//! use eeg_drone::control::band::ControlBand;
//!
//! let mut core = ControlCore::new(CoreSettings::default());
//! let now = Instant::now();
//!
//! core.ingest("2.0", now).unwrap();
//! let output = core.cycle(now);
//!
//! assert_eq!(output.band, ControlBand::Moderate);
//! assert!(output.thrusting);
//! ```

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::band::{BandTable, ControlBand};
use super::input::{InputGate, InvalidInput, ParseMode, Sample};
use super::limits::ActuatorLimits;
use super::mixer::{MotorCommands, QuadMixer};
use super::staleness::{StalenessSupervisor, DEFAULT_STALE_TIMEOUT};
use super::status::{Color, StatusOverrides, StatusSignal};
use super::watchdog::{RearmPolicy, SessionWatchdog, WatchdogVerdict, DEFAULT_SESSION_LIMIT};

/// Everything the core needs to know at start-up.
#[derive(Debug, Clone)]
pub struct CoreSettings {
    pub parse_mode: ParseMode,
    pub stale_timeout: Duration,
    pub session_limit: Duration,
    pub rearm_policy: RearmPolicy,
    pub bands: BandTable,
    pub limits: ActuatorLimits,
    pub warning_color: Color,
    pub no_signal_color: Color,
}

impl Default for CoreSettings {
    fn default() -> Self {
        Self {
            parse_mode: ParseMode::default(),
            stale_timeout: DEFAULT_STALE_TIMEOUT,
            session_limit: DEFAULT_SESSION_LIMIT,
            rearm_policy: RearmPolicy::default(),
            bands: BandTable::default(),
            limits: ActuatorLimits::default(),
            warning_color: Color::ORANGE,
            no_signal_color: Color::GREY,
        }
    }
}

/// Mutable state carried from one cycle to the next.
#[derive(Debug, Clone)]
pub struct ControlCoreState {
    pub staleness: StalenessSupervisor,
    pub watchdog: SessionWatchdog,
    pub last_sample: Option<Sample>,
    signal_lost: bool,
}

/// Result of one control cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleOutput {
    /// Value that was classified (`0.0` when stale).
    pub value: f32,
    pub band: ControlBand,
    pub stale: bool,
    pub watchdog_tripped: bool,
    /// Motors are driven by the mixer this cycle (not idle).
    pub thrusting: bool,
    pub commands: MotorCommands,
    pub color: Color,
}

#[derive(Debug, Clone)]
pub struct ControlCore {
    gate: InputGate,
    bands: BandTable,
    mixer: QuadMixer,
    status: StatusSignal,
    state: ControlCoreState,
}

impl ControlCore {
    #[must_use]
    pub fn new(settings: CoreSettings) -> Self {
        let status = StatusSignal::new(
            &settings.bands,
            settings.warning_color,
            settings.no_signal_color,
        );

        Self {
            gate: InputGate::new(settings.parse_mode),
            mixer: QuadMixer::new(&settings.limits),
            bands: settings.bands,
            status,
            state: ControlCoreState {
                staleness: StalenessSupervisor::new(settings.stale_timeout),
                watchdog: SessionWatchdog::new(settings.session_limit, settings.rearm_policy),
                last_sample: None,
                signal_lost: true,
            },
        }
    }

    /// Validates a raw token and accepts the resulting sample.
    ///
    /// # Errors
    ///
    /// Returns the gate's [`InvalidInput`]; state is left untouched.
    pub fn ingest(&mut self, raw: &str, now: Instant) -> Result<Sample, InvalidInput> {
        let sample = self.gate.validate(raw, now)?;
        self.accept(sample);
        Ok(sample)
    }

    /// Records an already validated sample.
    pub fn accept(&mut self, sample: Sample) {
        self.state.staleness.on_sample(sample.received_at);
        self.state.watchdog.on_sample();
        self.state.last_sample = Some(sample);
        debug!("Accepted sample {:.2}", sample.value);
    }

    /// Runs one control cycle.
    pub fn cycle(&mut self, now: Instant) -> CycleOutput {
        let stale = self.state.staleness.tick(now);
        self.note_signal_transition(stale);

        let value = match self.state.last_sample {
            Some(sample) if !stale => sample.value,
            _ => 0.0,
        };

        let band = self.bands.classify(value);
        let action = self.bands.action(band);
        let requested = !stale && !action.is_idle();

        let verdict = self.state.watchdog.on_cycle(now, requested);
        let watchdog_tripped = verdict == WatchdogVerdict::ForcedIdle;
        let thrusting = requested && !watchdog_tripped;

        let commands = if thrusting {
            self.mixer.mix(action.base_thrust, action.yaw_rate)
        } else {
            self.mixer.idle()
        };

        let color = self.status.color_for(
            band,
            StatusOverrides {
                stale,
                watchdog_tripped,
            },
        );

        CycleOutput {
            value,
            band,
            stale,
            watchdog_tripped,
            thrusting,
            commands,
            color,
        }
    }

    #[must_use]
    pub fn state(&self) -> &ControlCoreState {
        &self.state
    }

    #[must_use]
    pub fn bands(&self) -> &BandTable {
        &self.bands
    }

    fn note_signal_transition(&mut self, stale: bool) {
        if stale == self.state.signal_lost {
            return;
        }
        self.state.signal_lost = stale;

        if stale {
            warn!(
                "No sample for more than {:?}, holding idle",
                self.state.staleness.timeout()
            );
        } else {
            info!("Sample feed active");
        }
    }
}
