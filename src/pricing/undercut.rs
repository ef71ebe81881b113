//! Undercut arithmetic: offset, rounding policy, floor.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How far below the observed price to go.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UndercutMode {
    /// Subtract a whole number of currency units.
    #[default]
    Fixed,
    /// Subtract a percentage of the observed price.
    Percent,
}

impl UndercutMode {
    pub fn key(self) -> &'static str {
        match self {
            UndercutMode::Fixed => "fixed",
            UndercutMode::Percent => "percent",
        }
    }
}

impl fmt::Display for UndercutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for UndercutMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(UndercutMode::Fixed),
            "percent" => Ok(UndercutMode::Percent),
            _ => Err(ConfigError::UnknownVariant {
                field: "undercutMode",
                value: s.to_string(),
            }),
        }
    }
}

/// Rounding applied to the undercut candidate before the floor clamp.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rounding {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "down_10")]
    RoundDownTens,
    #[serde(rename = "down_100")]
    RoundDownHundreds,
    #[serde(rename = "end_9")]
    EndInNine,
}

impl Rounding {
    pub const ALL: [Rounding; 4] = [
        Rounding::None,
        Rounding::RoundDownTens,
        Rounding::RoundDownHundreds,
        Rounding::EndInNine,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Rounding::None => "none",
            Rounding::RoundDownTens => "down_10",
            Rounding::RoundDownHundreds => "down_100",
            Rounding::EndInNine => "end_9",
        }
    }

    /// Applies the policy. Flooring is mathematical, so negative
    /// candidates round towards negative infinity.
    pub fn apply(self, candidate: i128) -> i128 {
        match self {
            Rounding::None => candidate,
            Rounding::RoundDownTens => candidate.div_euclid(10).saturating_mul(10),
            Rounding::RoundDownHundreds => candidate.div_euclid(100).saturating_mul(100),
            Rounding::EndInNine => candidate
                .div_euclid(10)
                .saturating_mul(10)
                .saturating_add(9)
                .max(9),
        }
    }
}

impl fmt::Display for Rounding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Rounding {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rounding::ALL
            .into_iter()
            .find(|r| r.key() == s.trim())
            .ok_or_else(|| ConfigError::UnknownVariant {
                field: "rounding",
                value: s.to_string(),
            })
    }
}

/// Largest fixed offset accepted; any larger value cannot be a price.
const MAX_FIXED_OFFSET: f64 = u64::MAX as f64;

/// Validated pricing parameters for one pipeline call.
///
/// Construction is the only place values are checked; `undercut` trusts them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PricingConfig {
    mode: UndercutMode,
    value: f64,
    rounding: Rounding,
    floor: u64,
}

impl PricingConfig {
    /// Builds a config from numeric fields.
    ///
    /// The value must be finite and non-negative, a whole number no larger
    /// than `u64::MAX` in fixed mode, and at most 100 in percent mode. The floor must be non-negative.
    pub fn new(
        mode: UndercutMode,
        value: f64,
        rounding: Rounding,
        floor: i64,
    ) -> Result<Self, ConfigError> {
        let out_of_range = |field, value: String, reason| ConfigError::OutOfRange {
            field,
            value,
            reason,
        };

        if !value.is_finite() || value < 0.0 {
            return Err(out_of_range(
                "undercutValue",
                value.to_string(),
                "must be a non-negative number",
            ));
        }
        match mode {
            UndercutMode::Fixed if value.fract() != 0.0 => {
                return Err(out_of_range(
                    "undercutValue",
                    value.to_string(),
                    "a fixed offset must be a whole number",
                ));
            }
            UndercutMode::Fixed if value > MAX_FIXED_OFFSET => {
                return Err(out_of_range(
                    "undercutValue",
                    value.to_string(),
                    "a fixed offset must fit in a price",
                ));
            }
            UndercutMode::Percent if value > 100.0 => {
                return Err(out_of_range(
                    "undercutValue",
                    value.to_string(),
                    "a percentage must be between 0 and 100",
                ));
            }
            _ => {}
        }
        let floor = u64::try_from(floor).map_err(|_| {
            out_of_range("minPrice", floor.to_string(), "must not be negative")
        })?;

        Ok(Self {
            mode,
            value,
            rounding,
            floor,
        })
    }

    /// Builds a config from free-form text fields, as typed by the operator.
    pub fn parse(mode: &str, value: &str, rounding: &str, floor: &str) -> Result<Self, ConfigError> {
        let mode: UndercutMode = mode.parse()?;
        let rounding: Rounding = rounding.parse()?;
        let value = parse_number("undercutValue", value)?;
        let floor = parse_integer("minPrice", floor)?;
        Self::new(mode, value, rounding, floor)
    }

    pub fn mode(&self) -> UndercutMode {
        self.mode
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn rounding(&self) -> Rounding {
        self.rounding
    }

    pub fn floor(&self) -> u64 {
        self.floor
    }
}

impl fmt::Display for PricingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} / {} / min {}",
            self.mode, self.value, self.rounding, self.floor
        )
    }
}

/// Parses a real number from a text field.
pub fn parse_number(field: &'static str, text: &str) -> Result<f64, ConfigError> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ConfigError::NotNumeric {
            field,
            value: text.to_string(),
        })
}

/// Parses a whole number from a text field.
pub fn parse_integer(field: &'static str, text: &str) -> Result<i64, ConfigError> {
    text.trim()
        .parse::<i64>()
        .map_err(|_| ConfigError::NotNumeric {
            field,
            value: text.to_string(),
        })
}

/// Computes the price to list at, given the observed lowest price.
///
/// Returns `None` when there is nothing to price. Otherwise the result is
/// always at least `config.floor()`.
pub fn undercut(raw: Option<u64>, config: &PricingConfig) -> Option<u64> {
    let raw = i128::from(raw?);

    let candidate = match config.mode {
        UndercutMode::Fixed => raw - config.value as i128,
        UndercutMode::Percent => (raw as f64 * (1.0 - config.value / 100.0)).round() as i128,
    };

    let rounded = config.rounding.apply(candidate);
    let clamped = rounded.max(i128::from(config.floor));

    Some(u64::try_from(clamped).unwrap_or(u64::MAX))
}
