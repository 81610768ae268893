//! Interval — the fixed bucket duration defining the sampling grid.

use crate::data::provider::DataError;
use chrono::Duration;
use std::fmt;
use std::str::FromStr;

/// A kline interval such as `15m`, `4h`, or `1d`.
///
/// The textual form is what the candle API expects; the duration is the
/// bucket width used for grid construction and merge tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    amount: u32,
    unit: IntervalUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum IntervalUnit {
    Minutes,
    Hours,
    Days,
}

impl Interval {
    /// Bucket width as a chrono duration.
    pub fn duration(&self) -> Duration {
        match self.unit {
            IntervalUnit::Minutes => Duration::minutes(self.amount as i64),
            IntervalUnit::Hours => Duration::hours(self.amount as i64),
            IntervalUnit::Days => Duration::days(self.amount as i64),
        }
    }
}

impl Default for Interval {
    /// The default 4-hour bucket.
    fn default() -> Self {
        Self {
            amount: 4,
            unit: IntervalUnit::Hours,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.unit {
            IntervalUnit::Minutes => 'm',
            IntervalUnit::Hours => 'h',
            IntervalUnit::Days => 'd',
        };
        write!(f, "{}{unit}", self.amount)
    }
}

impl FromStr for Interval {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DataError::InvalidInterval(s.to_string());
        let (digits, unit) = s.split_at(s.len().saturating_sub(1));
        let amount: u32 = digits.parse().map_err(|_| invalid())?;
        if amount == 0 {
            return Err(invalid());
        }
        let unit = match unit {
            "m" => IntervalUnit::Minutes,
            "h" => IntervalUnit::Hours,
            "d" => IntervalUnit::Days,
            _ => return Err(invalid()),
        };
        Ok(Self { amount, unit })
    }
}
