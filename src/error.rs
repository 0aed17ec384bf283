//! # Error Types
//!
//! Custom error types for EEG Drone using `thiserror`.

use thiserror::Error;

use crate::control::input::InvalidInput;

/// Main error type for EEG Drone
#[derive(Debug, Error)]
pub enum EegDroneError {
    /// Rejected sample token
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Sample feed errors
    #[error("Link error: {0}")]
    Link(String),

    /// PWM backend errors
    #[error("PWM output error: {0}")]
    Pwm(String),

    /// Telemetry serialization errors
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for EEG Drone
pub type Result<T> = std::result::Result<T, EegDroneError>;
