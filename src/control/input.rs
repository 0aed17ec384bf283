//! # Input Gate
//!
//! Turns a raw sample token from the link into a validated [`Sample`].
//!
//! Parsing is locale-free and takes the longest valid numeric prefix of the
//! token, the same way C `atof` does. In [`ParseMode::Permissive`] a token
//! without any numeric prefix reads as `0.0`; in [`ParseMode::Strict`] it is
//! rejected along with tokens that carry trailing garbage.
//!
//! ## Usage
//!
//! ```
//! use std::time::Instant;
//! use eeg_drone::control::input::{InputGate, ParseMode};
//!
//! let gate = InputGate::new(ParseMode::Permissive);
//! let now = Instant::now();
//!
//! assert_eq!(gate.validate("2.5", now).unwrap().value, 2.5);
//! assert_eq!(gate.validate("bogus", now).unwrap().value, 0.0);
//! assert!(gate.validate("12", now).is_err());
//! ```

use std::time::Instant;

use serde::Deserialize;
use thiserror::Error;

/// Lowest concentration value accepted by the gate.
pub const SAMPLE_VALUE_MIN: f32 = 0.0;

/// Highest concentration value accepted by the gate.
pub const SAMPLE_VALUE_MAX: f32 = 10.0;

/// A validated concentration sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Concentration value in `[0.0, 10.0]`.
    pub value: f32,
    /// Monotonic time the sample was received.
    pub received_at: Instant,
}

/// Reasons a sample token is rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidInput {
    /// Parsed value lies outside `[0.0, 10.0]` (NaN and infinities included).
    #[error("sample value {value} is outside [0, 10]")]
    OutOfRange { value: f32 },

    /// Token is not a number (strict mode only).
    #[error("sample token {token:?} is not a number")]
    NotNumeric { token: String },
}

/// How tokens without a clean numeric form are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseMode {
    /// `atof` behaviour: no numeric prefix reads as `0.0`, trailing text is ignored.
    #[default]
    Permissive,
    /// Only a complete number (surrounding whitespace allowed) is accepted.
    Strict,
}

/// Validates raw sample tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputGate {
    mode: ParseMode,
}

impl InputGate {
    /// Creates a gate using the given parse mode.
    #[must_use]
    pub fn new(mode: ParseMode) -> Self {
        Self { mode }
    }

    /// Returns the configured parse mode.
    #[must_use]
    pub fn mode(&self) -> ParseMode {
        self.mode
    }

    /// Parses and range-checks a raw token.
    ///
    /// The token is cut at the first NUL byte before parsing.
    ///
    /// # Errors
    ///
    /// - [`InvalidInput::OutOfRange`] if the value is outside `[0.0, 10.0]`
    /// - [`InvalidInput::NotNumeric`] in strict mode if the token is not a clean number
    pub fn validate(&self, raw: &str, now: Instant) -> Result<Sample, InvalidInput> {
        let token = raw.split('\0').next().unwrap_or_default();
        let value = match (numeric_prefix(token), self.mode) {
            (Some((_, rest)), ParseMode::Strict) if !rest.trim().is_empty() => {
                return Err(InvalidInput::NotNumeric {
                    token: token.to_string(),
                });
            }
            (Some((value, _)), _) => value,
            (None, ParseMode::Permissive) => 0.0,
            (None, ParseMode::Strict) => {
                return Err(InvalidInput::NotNumeric {
                    token: token.to_string(),
                });
            }
        };

        let value = value as f32;
        if !(SAMPLE_VALUE_MIN..=SAMPLE_VALUE_MAX).contains(&value) {
            return Err(InvalidInput::OutOfRange { value });
        }

        Ok(Sample {
            value,
            received_at: now,
        })
    }
}

/// Whitespace as understood by C `isspace` in the "C" locale.
#[inline]
fn is_c_space(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

/// Finds the longest numeric prefix of `token`.
///
/// Returns the parsed value and the unparsed remainder, or `None` if the
/// token does not start with a number.
fn numeric_prefix(token: &str) -> Option<(f64, &str)> {
    let bytes = token.as_bytes();
    let len = bytes.len();

    let mut i = 0;
    while i < len && is_c_space(bytes[i]) {
        i += 1;
    }
    let start = i;

    if i < len && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }

    // Special values, longest spelling first
    for word in ["infinity", "inf", "nan"] {
        let end = i + word.len();
        if end <= len && bytes[i..end].eq_ignore_ascii_case(word.as_bytes()) {
            let value = token[start..end].parse::<f64>().ok()?;
            return Some((value, &token[end..]));
        }
    }

    let mut digits = 0;
    while i < len && bytes[i].is_ascii_digit() {
        i += 1;
        digits += 1;
    }
    if i < len && bytes[i] == b'.' {
        i += 1;
        while i < len && bytes[i].is_ascii_digit() {
            i += 1;
            digits += 1;
        }
    }
    if digits == 0 {
        return None;
    }

    // Exponent only counts when it has at least one digit
    if i < len && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < len && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        let exponent_start = j;
        while j < len && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exponent_start {
            i = j;
        }
    }

    let value = token[start..i].parse::<f64>().ok()?;
    Some((value, &token[i..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permissive() -> InputGate {
        InputGate::new(ParseMode::Permissive)
    }

    fn strict() -> InputGate {
        InputGate::new(ParseMode::Strict)
    }

    // ==================== Prefix Parsing Tests ====================

    #[test]
    fn test_prefix_plain_numbers() {
        assert_eq!(numeric_prefix("2.0"), Some((2.0, "")));
        assert_eq!(numeric_prefix("7"), Some((7.0, "")));
        assert_eq!(numeric_prefix(".5"), Some((0.5, "")));
        assert_eq!(numeric_prefix("5."), Some((5.0, "")));
    }

    #[test]
    fn test_prefix_leading_whitespace_and_sign() {
        assert_eq!(numeric_prefix("  \t3.25"), Some((3.25, "")));
        assert_eq!(numeric_prefix("+1.5"), Some((1.5, "")));
        assert_eq!(numeric_prefix("-0.5"), Some((-0.5, "")));
    }

    #[test]
    fn test_prefix_stops_at_garbage() {
        assert_eq!(numeric_prefix("3.5abc"), Some((3.5, "abc")));
        assert_eq!(numeric_prefix("1.2.3"), Some((1.2, ".3")));
        assert_eq!(numeric_prefix("4\n"), Some((4.0, "\n")));
    }

    #[test]
    fn test_prefix_exponent() {
        assert_eq!(numeric_prefix("1e1"), Some((10.0, "")));
        assert_eq!(numeric_prefix("25E-1"), Some((2.5, "")));
        // Dangling exponent is not consumed
        assert_eq!(numeric_prefix("2e"), Some((2.0, "e")));
        assert_eq!(numeric_prefix("2e+x"), Some((2.0, "e+x")));
    }

    #[test]
    fn test_prefix_special_values() {
        let (value, rest) = numeric_prefix("INF").unwrap();
        assert!(value.is_infinite());
        assert_eq!(rest, "");

        let (value, rest) = numeric_prefix("-Infinity!").unwrap();
        assert!(value.is_infinite() && value < 0.0);
        assert_eq!(rest, "!");

        let (value, _) = numeric_prefix("nan").unwrap();
        assert!(value.is_nan());
    }

    #[test]
    fn test_prefix_none() {
        assert_eq!(numeric_prefix(""), None);
        assert_eq!(numeric_prefix("bogus"), None);
        assert_eq!(numeric_prefix("."), None);
        assert_eq!(numeric_prefix("-"), None);
        assert_eq!(numeric_prefix("   "), None);
    }

    #[test]
    fn test_prefix_multibyte_text_does_not_panic() {
        assert_eq!(numeric_prefix("集中"), None);
        assert_eq!(numeric_prefix("1.5集中"), Some((1.5, "集中")));
        assert_eq!(numeric_prefix("in集"), None);
    }

    // ==================== Permissive Gate Tests ====================

    #[test]
    fn test_valid_sample() {
        let now = Instant::now();
        let sample = permissive().validate("2.0", now).unwrap();
        assert_eq!(sample.value, 2.0);
        assert_eq!(sample.received_at, now);
    }

    #[test]
    fn test_range_bounds_inclusive() {
        let now = Instant::now();
        assert_eq!(permissive().validate("0.0", now).unwrap().value, 0.0);
        assert_eq!(permissive().validate("10.0", now).unwrap().value, 10.0);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let now = Instant::now();
        assert_eq!(
            permissive().validate("10.5", now),
            Err(InvalidInput::OutOfRange { value: 10.5 })
        );
        assert!(matches!(
            permissive().validate("-0.1", now),
            Err(InvalidInput::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_non_finite_rejected() {
        let now = Instant::now();
        assert!(permissive().validate("inf", now).is_err());
        assert!(permissive().validate("nan", now).is_err());
    }

    #[test]
    fn test_bogus_reads_as_zero() {
        let sample = permissive().validate("bogus", Instant::now()).unwrap();
        assert_eq!(sample.value, 0.0);
    }

    #[test]
    fn test_empty_reads_as_zero() {
        let sample = permissive().validate("", Instant::now()).unwrap();
        assert_eq!(sample.value, 0.0);
    }

    #[test]
    fn test_trailing_garbage_ignored() {
        let sample = permissive().validate("3.5 units", Instant::now()).unwrap();
        assert_eq!(sample.value, 3.5);
    }

    #[test]
    fn test_nul_terminated_token() {
        let sample = permissive().validate("1.5\0garbage9", Instant::now()).unwrap();
        assert_eq!(sample.value, 1.5);
    }

    // ==================== Strict Gate Tests ====================

    #[test]
    fn test_strict_accepts_clean_numbers() {
        let now = Instant::now();
        assert_eq!(strict().validate("4.0", now).unwrap().value, 4.0);
        assert_eq!(strict().validate(" 4.0\r\n", now).unwrap().value, 4.0);
    }

    #[test]
    fn test_strict_rejects_bogus() {
        assert_eq!(
            strict().validate("bogus", Instant::now()),
            Err(InvalidInput::NotNumeric {
                token: "bogus".to_string()
            })
        );
    }

    #[test]
    fn test_strict_rejects_trailing_garbage() {
        assert!(matches!(
            strict().validate("3.5abc", Instant::now()),
            Err(InvalidInput::NotNumeric { .. })
        ));
    }

    #[test]
    fn test_strict_still_range_checks() {
        assert!(matches!(
            strict().validate("11", Instant::now()),
            Err(InvalidInput::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_default_mode_is_permissive() {
        assert_eq!(InputGate::default().mode(), ParseMode::Permissive);
    }
}
