//! # Status Signal
//!
//! Picks the indicator colour for a control cycle.
//!
//! Priority, highest first:
//!
//! 1. Watchdog tripped → warning colour
//! 2. Signal stale → no-signal colour
//! 3. Otherwise → the colour of the active band
//!
//! Driving an actual LED from the returned [`Color`] is left to the caller.

use std::fmt;

use serde::Deserialize;

use super::band::{BandTable, ControlBand, BAND_COUNT};

/// A 24-bit RGB colour.
///
/// Deserializes from a `[r, g, b]` array in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(from = "[u8; 3]")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLUE: Color = Color::new(0, 0, 255);
    pub const GREEN: Color = Color::new(0, 255, 0);
    pub const RED: Color = Color::new(255, 0, 0);
    pub const MAGENTA: Color = Color::new(255, 0, 255);
    pub const YELLOW: Color = Color::new(255, 255, 0);
    pub const WHITE: Color = Color::new(255, 255, 255);
    /// Default watchdog / timeout warning colour.
    pub const ORANGE: Color = Color::new(255, 165, 0);
    /// Default no-signal colour.
    pub const GREY: Color = Color::new(64, 64, 64);

    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Packs the colour as `0xRRGGBB`.
    #[must_use]
    pub fn to_rgb24(self) -> u32 {
        (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }
}

impl From<[u8; 3]> for Color {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::new(r, g, b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Conditions that override the band colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusOverrides {
    pub stale: bool,
    pub watchdog_tripped: bool,
}

/// Maps a control band and its overrides to an indicator colour.
#[derive(Debug, Clone)]
pub struct StatusSignal {
    band_colors: [Color; BAND_COUNT],
    warning: Color,
    no_signal: Color,
}

impl StatusSignal {
    /// Builds a status signal from a band table's colours and the two override colours.
    #[must_use]
    pub fn new(table: &BandTable, warning: Color, no_signal: Color) -> Self {
        Self {
            band_colors: table.colors(),
            warning,
            no_signal,
        }
    }

    #[must_use]
    pub fn color_for(&self, band: ControlBand, overrides: StatusOverrides) -> Color {
        if overrides.watchdog_tripped {
            self.warning
        } else if overrides.stale {
            self.no_signal
        } else {
            self.band_colors[band.index()]
        }
    }
}
