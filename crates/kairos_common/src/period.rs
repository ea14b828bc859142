//! Clock period values with unit parsing and display.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;
use std::str::FromStr;

/// A clock period stored in nanoseconds.
///
/// Supports parsing from strings like "4.7ns", "4700ps", "0.01us", and bare
/// numeric values (interpreted as ns). Deserializes from either form so a
/// config may write `clock_period = 4.7` or `clock_period = "4.7ns"`.
#[derive(Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "PeriodRepr", into = "f64")]
pub struct ClockPeriod(f64);

impl ClockPeriod {
    /// Creates a new period from a value in nanoseconds.
    pub fn from_ns(ns: f64) -> Self {
        Self(ns)
    }

    /// Returns the period in nanoseconds.
    pub fn ns(&self) -> f64 {
        self.0
    }

    /// Returns the period in picoseconds.
    pub fn ps(&self) -> f64 {
        self.0 * 1_000.0
    }

    /// Returns the corresponding clock frequency in megahertz.
    pub fn mhz(&self) -> f64 {
        1_000.0 / self.0
    }
}

impl Add for ClockPeriod {
    type Output = ClockPeriod;

    fn add(self, rhs: ClockPeriod) -> ClockPeriod {
        // Keep repeated sweeps (4.7 + 0.2 + ...) from accumulating float noise.
        ClockPeriod(((self.0 + rhs.0) * 1e6).round() / 1e6)
    }
}

impl fmt::Debug for ClockPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClockPeriod({self})")
    }
}

impl fmt::Display for ClockPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = (self.0 * 1e6).round() / 1e6;
        write!(f, "{ns}ns")
    }
}

impl From<ClockPeriod> for f64 {
    fn from(p: ClockPeriod) -> f64 {
        p.0
    }
}

/// Error type for parsing clock period strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid clock period: '{input}'")]
pub struct ParsePeriodError {
    /// The input string that failed to parse.
    pub input: String,
}

impl FromStr for ClockPeriod {
    type Err = ParsePeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || ParsePeriodError {
            input: s.to_string(),
        };

        let lower = s.to_ascii_lowercase();
        let (num, scale) = if let Some(num) = lower.strip_suffix("ps") {
            (num, 0.001)
        } else if let Some(num) = lower.strip_suffix("ns") {
            (num, 1.0)
        } else if let Some(num) = lower.strip_suffix("us") {
            (num, 1_000.0)
        } else {
            (lower.as_str(), 1.0)
        };

        let val: f64 = num.trim().parse().map_err(|_| err())?;
        if !val.is_finite() || val <= 0.0 {
            return Err(err());
        }
        Ok(ClockPeriod(val * scale))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PeriodRepr {
    Number(f64),
    Text(String),
}

impl TryFrom<PeriodRepr> for ClockPeriod {
    type Error = ParsePeriodError;

    fn try_from(repr: PeriodRepr) -> Result<Self, Self::Error> {
        match repr {
            PeriodRepr::Number(ns) if ns.is_finite() && ns > 0.0 => Ok(ClockPeriod(ns)),
            PeriodRepr::Number(ns) => Err(ParsePeriodError {
                input: ns.to_string(),
            }),
            PeriodRepr::Text(s) => s.parse(),
        }
    }
}
