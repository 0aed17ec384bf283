//! # Control Module
//!
//! Turns concentration samples into motor commands and a status colour.
//!
//! This module handles:
//! - Validating raw sample tokens
//! - Classifying samples into five bands
//! - Detecting a stale sample feed
//! - Limiting continuous thrust sessions
//! - Mixing thrust and yaw into four motor throttles
//! - Picking the status colour

pub mod band;
pub mod core;
pub mod input;
pub mod limits;
pub mod mixer;
pub mod staleness;
pub mod status;
pub mod watchdog;

pub use self::core::{ControlCore, ControlCoreState, CoreSettings, CycleOutput};
pub use band::{BandTable, ControlBand};
pub use input::{InputGate, InvalidInput, Sample};
pub use mixer::{Motor, MotorCommand, MotorCommands};
pub use status::Color;
