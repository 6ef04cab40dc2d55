//! Explicitly-undefined numeric values.
//!
//! Every derived ratio in the engine can hit a zero denominator. Instead of
//! leaning on NaN, which silently poisons sums, such values are carried as
//! [`Metric::Undefined`] and every reducer decides what to do with them.

use serde::{Serialize, Serializer};
use std::fmt;

/// A numeric value that may be undefined.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Metric {
    /// A well-defined, finite value.
    Value(f64),
    /// Result of a zero denominator or a missing input.
    #[default]
    Undefined,
}

impl Metric {
    /// Wrap a raw float; non-finite inputs become `Undefined`.
    pub fn from_f64(v: f64) -> Self {
        if v.is_finite() {
            Metric::Value(v)
        } else {
            Metric::Undefined
        }
    }

    /// `numerator / denominator`, undefined when the denominator is zero.
    pub fn ratio(numerator: f64, denominator: f64) -> Self {
        if denominator == 0.0 {
            return Metric::Undefined;
        }
        Metric::from_f64(numerator / denominator)
    }

    /// `numerator / denominator * 100`.
    pub fn percent(numerator: f64, denominator: f64) -> Self {
        Metric::ratio(numerator, denominator).scale(100.0)
    }

    /// Ratio of two metrics; undefined if either side is.
    pub fn ratio_of(numerator: Metric, denominator: Metric) -> Self {
        match (numerator, denominator) {
            (Metric::Value(n), Metric::Value(d)) => Metric::ratio(n, d),
            _ => Metric::Undefined,
        }
    }

    pub fn scale(self, factor: f64) -> Self {
        match self {
            Metric::Value(v) => Metric::from_f64(v * factor),
            Metric::Undefined => Metric::Undefined,
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Metric::Value(v) => Some(v),
            Metric::Undefined => None,
        }
    }

    pub fn is_undefined(self) -> bool {
        matches!(self, Metric::Undefined)
    }

    /// Rounded for presentation only; internal values are never rounded.
    pub fn rounded(self, decimals: i32) -> Self {
        match self {
            Metric::Value(v) => {
                let factor = 10f64.powi(decimals);
                Metric::Value((v * factor).round() / factor)
            }
            Metric::Undefined => Metric::Undefined,
        }
    }
}

impl From<Option<f64>> for Metric {
    fn from(v: Option<f64>) -> Self {
        v.map_or(Metric::Undefined, Metric::from_f64)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Value(v) => write!(f, "{:.2}", v),
            Metric::Undefined => write!(f, "undefined"),
        }
    }
}

// Undefined serializes as `null` so JSON consumers never see a fake zero.
impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Metric::Value(v) => serializer.serialize_f64(*v),
            Metric::Undefined => serializer.serialize_none(),
        }
    }
}
