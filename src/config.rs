//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and every field is optional; missing values fall back to
//! the built-in defaults.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use tracing::warn;

use crate::control::band::{BandEntry, BandProfile, BandTable};
use crate::control::core::CoreSettings;
use crate::control::input::ParseMode;
use crate::control::limits::{
    ActuatorLimits, ActuatorProfile, IdlePolicy, DEFAULT_PULSE_MAX_FRACTION,
    DEFAULT_PULSE_MIN_FRACTION, DEFAULT_PWM_FREQUENCY_HZ, DEFAULT_PWM_RESOLUTION_STEPS,
    DEFAULT_THROTTLE_MIN,
};
use crate::control::status::Color;
use crate::control::watchdog::RearmPolicy;
use crate::error::{EegDroneError, Result};
use crate::link::{PayloadFormat, DEFAULT_MAX_PACKET_SIZE, DEFAULT_PORT};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub control: ControlConfig,

    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub bands: BandsConfig,

    #[serde(default)]
    pub actuator: ActuatorConfig,

    #[serde(default)]
    pub status: StatusConfig,

    #[serde(default)]
    pub link: LinkConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Control loop timing
#[derive(Debug, Deserialize, Clone)]
pub struct ControlConfig {
    #[serde(default = "default_cycle_period_ms")]
    pub cycle_period_ms: u64,

    #[serde(default = "default_stale_timeout_ms")]
    pub stale_timeout_ms: u64,

    #[serde(default = "default_session_limit_ms")]
    pub session_limit_ms: u64,

    #[serde(default)]
    pub rearm_policy: RearmPolicy,

    #[serde(default = "default_status_log_interval_ms")]
    pub status_log_interval_ms: u64,
}

/// Sample parsing
#[derive(Debug, Deserialize, Clone, Default)]
pub struct InputConfig {
    #[serde(default)]
    pub parse_mode: ParseMode,
}

/// Band table selection
#[derive(Debug, Deserialize, Clone, Default)]
pub struct BandsConfig {
    #[serde(default)]
    pub profile: BandProfile,

    /// Used only with `profile = "custom"`
    #[serde(default)]
    pub custom: Vec<BandEntry>,
}

/// Motor and ESC configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ActuatorConfig {
    #[serde(default)]
    pub profile: ActuatorProfile,

    #[serde(default = "default_throttle_min")]
    pub throttle_min: f32,

    /// Overrides the profile ceiling
    #[serde(default)]
    pub throttle_max: Option<f32>,

    /// Overrides the profile idle policy
    #[serde(default)]
    pub idle_policy: Option<IdlePolicy>,

    #[serde(default = "default_pulse_min_fraction")]
    pub pulse_min_fraction: f32,

    #[serde(default = "default_pulse_max_fraction")]
    pub pulse_max_fraction: f32,

    #[serde(default = "default_pwm_resolution_steps")]
    pub pwm_resolution_steps: u32,

    #[serde(default = "default_pwm_frequency_hz")]
    pub pwm_frequency_hz: u32,

    #[serde(default)]
    pub calibrate_on_boot: bool,

    #[serde(default = "default_calibration_hold_ms")]
    pub calibration_hold_ms: u64,
}

/// Status colours
#[derive(Debug, Deserialize, Clone)]
pub struct StatusConfig {
    #[serde(default = "default_warning_color")]
    pub warning_color: Color,

    #[serde(default = "default_no_signal_color")]
    pub no_signal_color: Color,
}

/// Inbound sample feed
#[derive(Debug, Deserialize, Clone)]
pub struct LinkConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub payload: PayloadFormat,

    #[serde(default = "default_max_packet_size")]
    pub max_packet_size: usize,
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,

    #[serde(default = "default_log_interval_ms")]
    pub log_interval_ms: u64,

    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Diagnostic logging
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Daily rolling log files are written here when set
    #[serde(default)]
    pub directory: Option<String>,
}

// Default value functions
fn default_cycle_period_ms() -> u64 { 10 }
fn default_stale_timeout_ms() -> u64 { 3000 }
fn default_session_limit_ms() -> u64 { 15000 }
fn default_status_log_interval_ms() -> u64 { 1000 }

fn default_throttle_min() -> f32 { DEFAULT_THROTTLE_MIN }
fn default_pulse_min_fraction() -> f32 { DEFAULT_PULSE_MIN_FRACTION }
fn default_pulse_max_fraction() -> f32 { DEFAULT_PULSE_MAX_FRACTION }
fn default_pwm_resolution_steps() -> u32 { DEFAULT_PWM_RESOLUTION_STEPS }
fn default_pwm_frequency_hz() -> u32 { DEFAULT_PWM_FREQUENCY_HZ }
fn default_calibration_hold_ms() -> u64 { 2000 }

fn default_warning_color() -> Color { Color::ORANGE }
fn default_no_signal_color() -> Color { Color::GREY }

fn default_bind_address() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { DEFAULT_PORT }
fn default_max_packet_size() -> usize { DEFAULT_MAX_PACKET_SIZE }

fn default_telemetry_enabled() -> bool { true }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }
fn default_log_interval_ms() -> u64 { 100 }
fn default_log_format() -> String { "jsonl".to_string() }

fn default_log_level() -> String { "info".to_string() }

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            cycle_period_ms: default_cycle_period_ms(),
            stale_timeout_ms: default_stale_timeout_ms(),
            session_limit_ms: default_session_limit_ms(),
            rearm_policy: RearmPolicy::default(),
            status_log_interval_ms: default_status_log_interval_ms(),
        }
    }
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            profile: ActuatorProfile::default(),
            throttle_min: default_throttle_min(),
            throttle_max: None,
            idle_policy: None,
            pulse_min_fraction: default_pulse_min_fraction(),
            pulse_max_fraction: default_pulse_max_fraction(),
            pwm_resolution_steps: default_pwm_resolution_steps(),
            pwm_frequency_hz: default_pwm_frequency_hz(),
            calibrate_on_boot: false,
            calibration_hold_ms: default_calibration_hold_ms(),
        }
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            warning_color: default_warning_color(),
            no_signal_color: default_no_signal_color(),
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            payload: PayloadFormat::default(),
            max_packet_size: default_max_packet_size(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
            log_interval_ms: default_log_interval_ms(),
            format: default_log_format(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> EegDroneError {
    EegDroneError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use eeg_drone::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("Config file {} not found, using defaults", path.display());
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        Self::load(path)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Control timing
        if self.control.cycle_period_ms == 0 || self.control.cycle_period_ms > 1000 {
            return Err(invalid("cycle_period_ms must be between 1 and 1000"));
        }

        if self.control.stale_timeout_ms == 0 || self.control.stale_timeout_ms > 60000 {
            return Err(invalid("stale_timeout_ms must be between 1 and 60000"));
        }

        if self.control.session_limit_ms == 0 || self.control.session_limit_ms > 600000 {
            return Err(invalid("session_limit_ms must be between 1 and 600000"));
        }

        if self.control.status_log_interval_ms == 0 || self.control.status_log_interval_ms > 60000 {
            return Err(invalid("status_log_interval_ms must be between 1 and 60000"));
        }

        // Band table
        self.band_table()?;

        // Actuator range
        let limits = self.limits();
        if !(0.0..1.0).contains(&limits.throttle_min) {
            return Err(invalid("throttle_min must be between 0.0 and 1.0"));
        }

        if !(limits.throttle_max > limits.throttle_min && limits.throttle_max <= 1.0) {
            return Err(invalid("throttle_max must be greater than throttle_min and at most 1.0"));
        }

        // Pulse contract
        let (pmin, pmax) = (limits.pulse_min_fraction, limits.pulse_max_fraction);
        if !(pmin > 0.0 && pmin < pmax && pmax < 1.0) {
            return Err(invalid(
                "pulse fractions must satisfy 0 < pulse_min_fraction < pulse_max_fraction < 1",
            ));
        }

        if limits.pwm_resolution_steps < 256 {
            return Err(invalid("pwm_resolution_steps must be at least 256"));
        }

        if self.actuator.pwm_frequency_hz == 0 || self.actuator.pwm_frequency_hz > 500 {
            return Err(invalid("pwm_frequency_hz must be between 1 and 500"));
        }

        if self.actuator.calibrate_on_boot
            && (self.actuator.calibration_hold_ms == 0 || self.actuator.calibration_hold_ms > 10000)
        {
            return Err(invalid("calibration_hold_ms must be between 1 and 10000"));
        }

        // Link
        if self.link.bind_address.is_empty() {
            return Err(invalid("link bind_address cannot be empty"));
        }

        if self.link.max_packet_size == 0 || self.link.max_packet_size > 65507 {
            return Err(invalid("max_packet_size must be between 1 and 65507"));
        }

        // Telemetry
        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if self.telemetry.log_interval_ms == 0 || self.telemetry.log_interval_ms > 60000 {
            return Err(invalid("log_interval_ms must be between 1 and 60000"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        if self.telemetry.format != "jsonl" {
            return Err(invalid("log format must be 'jsonl' (only supported format)"));
        }

        // Logging
        if self.logging.level.trim().is_empty() {
            return Err(invalid("logging level cannot be empty"));
        }

        Ok(())
    }

    /// Actuator limits after applying profile and overrides
    #[must_use]
    pub fn limits(&self) -> ActuatorLimits {
        let mut limits = ActuatorLimits::for_profile(self.actuator.profile);
        limits.throttle_min = self.actuator.throttle_min;
        if let Some(throttle_max) = self.actuator.throttle_max {
            limits.throttle_max = throttle_max;
        }
        if let Some(idle_policy) = self.actuator.idle_policy {
            limits.idle_policy = idle_policy;
        }
        limits.pulse_min_fraction = self.actuator.pulse_min_fraction;
        limits.pulse_max_fraction = self.actuator.pulse_max_fraction;
        limits.pwm_resolution_steps = self.actuator.pwm_resolution_steps;
        limits
    }

    /// Active band table
    pub fn band_table(&self) -> Result<BandTable> {
        BandTable::for_profile(self.bands.profile, &self.bands.custom)
    }

    /// Settings for the control core
    pub fn core_settings(&self) -> Result<CoreSettings> {
        Ok(CoreSettings {
            parse_mode: self.input.parse_mode,
            stale_timeout: Duration::from_millis(self.control.stale_timeout_ms),
            session_limit: Duration::from_millis(self.control.session_limit_ms),
            rearm_policy: self.control.rearm_policy,
            bands: self.band_table()?,
            limits: self.limits(),
            warning_color: self.status.warning_color,
            no_signal_color: self.status.no_signal_color,
        })
    }

    #[must_use]
    pub fn cycle_period(&self) -> Duration {
        Duration::from_millis(self.control.cycle_period_ms)
    }

    #[must_use]
    pub fn status_log_interval(&self) -> Duration {
        Duration::from_millis(self.control.status_log_interval_ms)
    }

    #[must_use]
    pub fn telemetry_interval(&self) -> Duration {
        Duration::from_millis(self.telemetry.log_interval_ms)
    }

    #[must_use]
    pub fn calibration_hold(&self) -> Duration {
        Duration::from_millis(self.actuator.calibration_hold_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::band::ControlBand;

    fn create_valid_config() -> Config {
        Config::default()
    }

    #[test]
    fn test_default_config() {
        let config = create_valid_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.control.cycle_period_ms, 10);
        assert_eq!(config.control.stale_timeout_ms, 3000);
        assert_eq!(config.control.session_limit_ms, 15000);
        assert_eq!(config.link.port, 4210);
        assert_eq!(config.link.max_packet_size, 255);
        assert_eq!(config.status.warning_color, Color::ORANGE);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.control.rearm_policy, RearmPolicy::RisingEdge);
        assert_eq!(config.input.parse_mode, ParseMode::Permissive);
        assert_eq!(config.bands.profile, BandProfile::Canonical);
        assert_eq!(config.limits(), ActuatorLimits::default());
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[control]
session_limit_ms = 20000
rearm_policy = "fresh_sample"

[input]
parse_mode = "strict"

[actuator]
profile = "bench"

[status]
warning_color = [255, 0, 0]

[link]
payload = "json"
port = 5005
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.control.session_limit_ms, 20000);
        assert_eq!(config.control.rearm_policy, RearmPolicy::FreshSample);
        assert_eq!(config.input.parse_mode, ParseMode::Strict);
        assert_eq!(config.status.warning_color, Color::RED);
        assert_eq!(config.link.payload, PayloadFormat::Json);
        assert_eq!(config.link.port, 5005);

        let limits = config.limits();
        assert_eq!(limits.throttle_max, 1.0);
        assert_eq!(limits.idle_policy, IdlePolicy::Stop);
    }

    #[test]
    fn test_load_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.control.cycle_period_ms, 10);
        assert!(Config::load(dir.path().join("absent.toml")).is_err());
    }

    #[test]
    fn test_invalid_toml() {
        assert!(Config::from_toml("[control\ncycle_period_ms = 10").is_err());
        assert!(Config::from_toml("[input]\nparse_mode = \"loose\"").is_err());
    }

    // ==================== Override Tests ====================

    #[test]
    fn test_actuator_overrides() {
        let config = Config::from_toml(
            r#"
[actuator]
profile = "flight"
throttle_max = 0.4
idle_policy = "stop"
"#,
        )
        .unwrap();

        let limits = config.limits();
        assert_eq!(limits.throttle_max, 0.4);
        assert_eq!(limits.idle_policy, IdlePolicy::Stop);
        assert_eq!(limits.idle_throttle(), 0.0);
    }

    #[test]
    fn test_band_profile_selection() {
        let config = Config::from_toml("[bands]\nprofile = \"rotation\"").unwrap();
        assert_eq!(config.band_table().unwrap(), BandTable::rotation());
    }

    #[test]
    fn test_custom_band_profile() {
        let config = Config::from_toml(
            r#"
[bands]
profile = "custom"

[[bands.custom]]
lower = 0.0
yaw_rate = 0.0
base_thrust = 0.0
color = [0, 0, 255]

[[bands.custom]]
lower = 2.0
yaw_rate = 0.0
base_thrust = 0.2
color = [0, 255, 0]

[[bands.custom]]
lower = 4.0
yaw_rate = 0.0
base_thrust = 0.3
color = [255, 0, 0]

[[bands.custom]]
lower = 6.0
yaw_rate = 0.1
base_thrust = 0.3
color = [255, 0, 255]

[[bands.custom]]
lower = 8.0
yaw_rate = -0.1
base_thrust = 0.3
color = [255, 255, 255]
"#,
        )
        .unwrap();

        let table = config.band_table().unwrap();
        assert_eq!(table.classify(5.0), ControlBand::Moderate);
        assert_eq!(table.classify(1.9), ControlBand::Resting);
    }

    #[test]
    fn test_custom_profile_without_entries() {
        let mut config = create_valid_config();
        config.bands.profile = BandProfile::Custom;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_core_settings() {
        let mut config = create_valid_config();
        config.control.stale_timeout_ms = 5000;
        let settings = config.core_settings().unwrap();
        assert_eq!(settings.stale_timeout, Duration::from_millis(5000));
        assert_eq!(settings.session_limit, Duration::from_millis(15000));
        assert_eq!(settings.no_signal_color, Color::GREY);
    }

    #[test]
    fn test_durations() {
        let config = create_valid_config();
        assert_eq!(config.cycle_period(), Duration::from_millis(10));
        assert_eq!(config.status_log_interval(), Duration::from_millis(1000));
        assert_eq!(config.telemetry_interval(), Duration::from_millis(100));
        assert_eq!(config.calibration_hold(), Duration::from_millis(2000));
    }

    // ==================== Validation Tests ====================

    #[test]
    fn test_cycle_period_zero() {
        let mut config = create_valid_config();
        config.control.cycle_period_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cycle_period_too_high() {
        let mut config = create_valid_config();
        config.control.cycle_period_ms = 1001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_stale_timeout_zero() {
        let mut config = create_valid_config();
        config.control.stale_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_session_limit_zero() {
        let mut config = create_valid_config();
        config.control.session_limit_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_status_log_interval_too_high() {
        let mut config = create_valid_config();
        config.control.status_log_interval_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_throttle_min_negative() {
        let mut config = create_valid_config();
        config.actuator.throttle_min = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_throttle_max_below_min() {
        let mut config = create_valid_config();
        config.actuator.throttle_max = Some(0.04);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_throttle_max_above_one() {
        let mut config = create_valid_config();
        config.actuator.throttle_max = Some(1.1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pulse_fractions_inverted() {
        let mut config = create_valid_config();
        config.actuator.pulse_min_fraction = 0.10;
        config.actuator.pulse_max_fraction = 0.05;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pwm_resolution_too_low() {
        let mut config = create_valid_config();
        config.actuator.pwm_resolution_steps = 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pwm_frequency_zero() {
        let mut config = create_valid_config();
        config.actuator.pwm_frequency_hz = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_calibration_hold_only_checked_when_enabled() {
        let mut config = create_valid_config();
        config.actuator.calibration_hold_ms = 0;
        assert!(config.validate().is_ok());

        config.actuator.calibrate_on_boot = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_bind_address() {
        let mut config = create_valid_config();
        config.link.bind_address = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_packet_size_zero() {
        let mut config = create_valid_config();
        config.link.max_packet_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir_when_enabled() {
        let mut config = create_valid_config();
        config.telemetry.enabled = true;
        config.telemetry.log_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir_when_disabled() {
        let mut config = create_valid_config();
        config.telemetry.enabled = false;
        config.telemetry.log_dir = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_log_interval_zero() {
        let mut config = create_valid_config();
        config.telemetry.log_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_records_per_file_zero() {
        let mut config = create_valid_config();
        config.telemetry.max_records_per_file = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_files_to_keep_zero() {
        let mut config = create_valid_config();
        config.telemetry.max_files_to_keep = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_format() {
        let mut config = create_valid_config();
        config.telemetry.format = "csv".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_level() {
        let mut config = create_valid_config();
        config.logging.level = " ".to_string();
        assert!(config.validate().is_err());
    }
}
