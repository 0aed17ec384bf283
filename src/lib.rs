//! # EEG Drone Library
//!
//! Steer a quadcopter with an EEG concentration signal.
//!
//! This library provides the control core that turns a stream of
//! concentration samples into four ESC commands and a status colour, plus
//! the UDP sample link, ESC output driver and telemetry logging around it.

pub mod config;
pub mod control;
pub mod error;
pub mod esc;
pub mod link;
pub mod telemetry;
