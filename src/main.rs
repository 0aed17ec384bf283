//! # EEG Drone
//!
//! Steer a quadcopter's yaw and thrust with an EEG concentration signal.
//!
//! Samples arrive over UDP, are classified into five concentration bands and
//! mixed into four ESC commands every control cycle.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load configuration (first CLI argument, default `config/default.toml`)
//!    - Set up logging with tracing subscriber
//!    - Optionally run the ESC calibration sequence
//!    - Bind the UDP sample socket and start the telemetry writer
//!
//! 2. **Main Loop**
//!    - Run one control cycle per period (10 ms by default)
//!    - Feed every received datagram through the input gate
//!    - Log the status colour on change and a status line periodically
//!    - Handle Ctrl+C for graceful shutdown
//!
//! 3. **Graceful Shutdown**
//!    - Send the zero-throttle pulse to all ESCs
//!    - Drain the telemetry writer
//!
//! # Examples
//!
//! ```bash
//! cargo run --release -- config/default.toml
//! echo -n "2.0" | nc -u -w0 127.0.0.1 4210
//! ```

use std::time::Instant;

use anyhow::{Context, Result};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use eeg_drone::config::{Config, LoggingConfig};
use eeg_drone::control::{Color, ControlCore, CycleOutput};
use eeg_drone::error::EegDroneError;
use eeg_drone::esc::{EscDriver, SimulatedPwm};
use eeg_drone::link::SampleReceiver;
use eeg_drone::telemetry::{self, CycleRecord, TelemetryLogger, CHANNEL_CAPACITY};

/// Configuration file used when no path is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// File name prefix of the daily rolling log
const LOG_FILE_NAME: &str = "eeg-drone.log";

/// Counters reported in the periodic status line
#[derive(Debug, Default)]
struct LoopStats {
    cycles: u64,
    samples: u64,
    rejected: u64,
}

impl LoopStats {
    /// Accounts for a failed receive.
    ///
    /// An undecodable payload is a rejected sample like any invalid token;
    /// socket failures are only logged.
    fn note_link_error(&mut self, error: &EegDroneError) {
        match error {
            EegDroneError::Link(_) => {
                self.rejected += 1;
                debug!("Discarded datagram: {}", error);
            }
            _ => warn!("Sample link error: {}", error),
        }
    }
}

/// Sets up the tracing subscriber.
///
/// The returned guard must live until shutdown when logging to files.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            None
        }
    }
}

fn log_status(output: &CycleOutput, duties: &[u32], stats: &LoopStats) {
    info!(
        "Cycle {}: value {:.2}, band {}, stale {}, watchdog {}, duties {:?}, {} samples ({} rejected)",
        stats.cycles,
        output.value,
        output.band.number(),
        output.stale,
        output.watchdog_tripped,
        duties,
        stats.samples,
        stats.rejected
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("failed to load configuration from {}", config_path))?;

    let _log_guard = init_logging(&config.logging);

    info!("EEG Drone v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Configuration: {}", config_path);

    let mut core = ControlCore::new(config.core_settings()?);
    let mut esc = EscDriver::new(
        SimulatedPwm::new(),
        &config.limits(),
        config.actuator.pwm_frequency_hz,
    );

    if config.actuator.calibrate_on_boot {
        esc.calibrate(config.calibration_hold()).await;
    }
    esc.stop_all();

    let mut receiver = SampleReceiver::bind(&config.link).await?;

    let (mut sink, writer) = if config.telemetry.enabled {
        let logger = TelemetryLogger::from_config(&config.telemetry)?;
        let (sink, handle) = telemetry::spawn(logger, CHANNEL_CAPACITY);
        (Some(sink), Some(handle))
    } else {
        (None, None)
    };

    let mut cycle_interval = interval(config.cycle_period());
    cycle_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let status_interval = config.status_log_interval();
    let telemetry_interval = config.telemetry_interval();

    info!(
        "Starting control loop at {:?} per cycle (session limit {} ms, stale after {} ms)",
        config.cycle_period(),
        config.control.session_limit_ms,
        config.control.stale_timeout_ms
    );
    info!("Press Ctrl+C to exit");

    let mut stats = LoopStats::default();
    let mut last_color: Option<Color> = None;
    let mut last_status_log = Instant::now();
    let mut last_telemetry = Instant::now();

    // Main control loop
    loop {
        tokio::select! {
            _ = cycle_interval.tick() => {
                let now = Instant::now();
                let output = core.cycle(now);
                let duties = esc.drive_all(&output.commands);
                stats.cycles += 1;

                if last_color != Some(output.color) {
                    info!("Status colour {} (band {})", output.color, output.band.number());
                    last_color = Some(output.color);
                }

                if let Some(sink) = sink.as_mut() {
                    if now.duration_since(last_telemetry) >= telemetry_interval {
                        sink.record(CycleRecord::new(&output, duties));
                        last_telemetry = now;
                    }
                }

                if now.duration_since(last_status_log) >= status_interval {
                    log_status(&output, &duties, &stats);
                    last_status_log = now;
                }
            }

            received = receiver.recv() => {
                match received {
                    Ok((token, peer)) => match core.ingest(&token, Instant::now()) {
                        Ok(sample) => {
                            stats.samples += 1;
                            debug!("Sample {:.2} from {}", sample.value, peer);
                        }
                        Err(e) => {
                            stats.rejected += 1;
                            debug!("Discarded sample from {}: {}", peer, e);
                        }
                    },
                    Err(e) => stats.note_link_error(&e),
                }
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    let duties = esc.stop_all();
    info!(
        "Motors stopped ({} µs pulse), {} cycles, {} samples, {} rejected, {} PWM write failures",
        esc.pulse_width_us(duties[0]),
        stats.cycles,
        stats.samples,
        stats.rejected,
        esc.write_failures()
    );

    if let Some(sink) = sink.take() {
        if sink.dropped() > 0 {
            warn!("{} telemetry records were dropped", sink.dropped());
        }
    }
    if let Some(writer) = writer {
        if let Err(e) = writer.await {
            warn!("Telemetry writer failed: {}", e);
        }
    }

    Ok(())
}
