//! # Concentration Classifier
//!
//! Maps a concentration value to one of five ordered [`ControlBand`]s and
//! each band to a [`BandAction`] (yaw rate, base thrust, colour).
//!
//! Bands are half-open intervals, closed below and open above. The last band
//! has no upper bound. Values below the first bound (including NaN) fall into
//! the first band.
//!
//! ## Built-in tables
//!
//! | Profile | Bounds | Behaviour |
//! |---------|--------|-----------|
//! | `canonical` | 0 / 0.5 / 1.5 / 2.5 / 4.0 | idle, left, hover, right, strong right |
//! | `spin` | 0 / 0.5 / 1.5 / 2.5 / 4.0 | idle, then slow → fast right spin, left spin on top |
//! | `rotation` | 0 / 1 / 2 / 3 / 4 | strong left → strong right, always lifting |
//!
//! ## Usage
//!
//! ```
//! use eeg_drone::control::band::{BandTable, ControlBand};
//!
//! let table = BandTable::canonical();
//! assert_eq!(table.classify(0.49), ControlBand::Resting);
//! assert_eq!(table.classify(0.5), ControlBand::Low);
//! assert_eq!(table.action(ControlBand::Moderate).yaw_rate, 0.0);
//! ```

use serde::{Deserialize, Serialize};

use super::status::Color;
use crate::error::{EegDroneError, Result};

/// Number of control bands.
pub const BAND_COUNT: usize = 5;

/// Discrete concentration band, ordered from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlBand {
    Resting,
    Low,
    Moderate,
    High,
    Peak,
}

impl ControlBand {
    /// All bands in ascending order.
    pub const ALL: [ControlBand; BAND_COUNT] = [
        ControlBand::Resting,
        ControlBand::Low,
        ControlBand::Moderate,
        ControlBand::High,
        ControlBand::Peak,
    ];

    /// Zero-based position of the band.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// One-based band number, as shown to operators.
    #[must_use]
    pub fn number(self) -> u8 {
        self as u8 + 1
    }
}

/// What a band asks of the airframe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandAction {
    /// Differential thrust between the diagonal motor pairs.
    pub yaw_rate: f32,
    /// Common thrust applied to all four motors.
    pub base_thrust: f32,
    /// Indicator colour for the band.
    pub color: Color,
}

impl BandAction {
    #[must_use]
    pub const fn new(base_thrust: f32, yaw_rate: f32, color: Color) -> Self {
        Self {
            yaw_rate,
            base_thrust,
            color,
        }
    }

    /// An idle band never requests thrust.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.base_thrust <= 0.0
    }
}

/// Which band table to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandProfile {
    #[default]
    Canonical,
    Spin,
    Rotation,
    /// Five entries supplied in `[[bands.custom]]`.
    Custom,
}

/// One band of a custom table, as written in the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BandEntry {
    /// Inclusive lower bound of the band.
    pub lower: f32,
    pub yaw_rate: f32,
    pub base_thrust: f32,
    pub color: Color,
}

/// Lower bounds and actions of the five bands.
#[derive(Debug, Clone, PartialEq)]
pub struct BandTable {
    lower_bounds: [f32; BAND_COUNT],
    actions: [BandAction; BAND_COUNT],
}

impl Default for BandTable {
    fn default() -> Self {
        Self::canonical()
    }
}

impl BandTable {
    /// Default table: idle at rest, then left / hover / right / strong right.
    #[must_use]
    pub fn canonical() -> Self {
        Self {
            lower_bounds: [0.0, 0.5, 1.5, 2.5, 4.0],
            actions: [
                BandAction::new(0.0, 0.0, Color::BLUE),
                BandAction::new(0.35, -0.10, Color::GREEN),
                BandAction::new(0.35, 0.0, Color::RED),
                BandAction::new(0.35, 0.10, Color::MAGENTA),
                BandAction::new(0.35, 0.20, Color::WHITE),
            ],
        }
    }

    /// Low-thrust spin table: speed of the right turn follows concentration.
    #[must_use]
    pub fn spin() -> Self {
        Self {
            lower_bounds: [0.0, 0.5, 1.5, 2.5, 4.0],
            actions: [
                BandAction::new(0.0, 0.0, Color::BLUE),
                BandAction::new(0.15, 0.05, Color::GREEN),
                BandAction::new(0.15, 0.10, Color::RED),
                BandAction::new(0.15, 0.15, Color::MAGENTA),
                BandAction::new(0.15, -0.10, Color::WHITE),
            ],
        }
    }

    /// Lifting table with integer bounds, from strong left to strong right.
    #[must_use]
    pub fn rotation() -> Self {
        Self {
            lower_bounds: [0.0, 1.0, 2.0, 3.0, 4.0],
            actions: [
                BandAction::new(0.35, -0.20, Color::MAGENTA),
                BandAction::new(0.35, -0.10, Color::BLUE),
                BandAction::new(0.35, 0.0, Color::GREEN),
                BandAction::new(0.35, 0.10, Color::YELLOW),
                BandAction::new(0.35, 0.20, Color::RED),
            ],
        }
    }

    /// Builds a table from five configuration entries.
    ///
    /// # Errors
    ///
    /// Returns a configuration error unless there are exactly five entries,
    /// the first lower bound is `0.0`, bounds strictly increase and every
    /// value is finite with a non-negative base thrust.
    pub fn from_entries(entries: &[BandEntry]) -> Result<Self> {
        if entries.len() != BAND_COUNT {
            return Err(config_error(format!(
                "custom band table needs exactly {} entries, got {}",
                BAND_COUNT,
                entries.len()
            )));
        }

        for entry in entries {
            if !entry.lower.is_finite() || !entry.yaw_rate.is_finite() || !entry.base_thrust.is_finite() {
                return Err(config_error("custom band values must be finite".to_string()));
            }
            if entry.base_thrust < 0.0 {
                return Err(config_error("custom band base_thrust must not be negative".to_string()));
            }
        }

        if entries[0].lower != 0.0 {
            return Err(config_error("first custom band must start at 0.0".to_string()));
        }

        if entries.windows(2).any(|pair| pair[1].lower <= pair[0].lower) {
            return Err(config_error(
                "custom band lower bounds must be strictly increasing".to_string(),
            ));
        }

        let mut lower_bounds = [0.0; BAND_COUNT];
        let mut actions = [BandAction::new(0.0, 0.0, Color::default()); BAND_COUNT];
        for (i, entry) in entries.iter().enumerate() {
            lower_bounds[i] = entry.lower;
            actions[i] = BandAction::new(entry.base_thrust, entry.yaw_rate, entry.color);
        }

        Ok(Self {
            lower_bounds,
            actions,
        })
    }

    /// Resolves a profile to its table.
    ///
    /// `custom` is only consulted for [`BandProfile::Custom`].
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a custom table is invalid.
    pub fn for_profile(profile: BandProfile, custom: &[BandEntry]) -> Result<Self> {
        match profile {
            BandProfile::Canonical => Ok(Self::canonical()),
            BandProfile::Spin => Ok(Self::spin()),
            BandProfile::Rotation => Ok(Self::rotation()),
            BandProfile::Custom => Self::from_entries(custom),
        }
    }

    /// Classifies a concentration value.
    ///
    /// Total over all inputs: anything below the second bound, NaN included,
    /// is [`ControlBand::Resting`].
    #[must_use]
    pub fn classify(&self, value: f32) -> ControlBand {
        let reached = self.lower_bounds[1..]
            .iter()
            .take_while(|&&lower| value >= lower)
            .count();
        ControlBand::ALL[reached]
    }

    #[must_use]
    pub fn action(&self, band: ControlBand) -> BandAction {
        self.actions[band.index()]
    }

    /// Inclusive lower bound of a band.
    #[must_use]
    pub fn lower_bound(&self, band: ControlBand) -> f32 {
        self.lower_bounds[band.index()]
    }

    /// Colours of all bands in ascending order.
    #[must_use]
    pub fn colors(&self) -> [Color; BAND_COUNT] {
        self.actions.map(|action| action.color)
    }
}

fn config_error(message: String) -> EegDroneError {
    use serde::de::Error;
    EegDroneError::Config(toml::de::Error::custom(message))
}
