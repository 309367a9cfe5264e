//! Kline interval value object.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use super::errors::ValidationError;

/// Candlestick interval accepted by the upstream klines endpoint.
///
/// Parsing is case-sensitive: `1m` is one minute, `1M` is one month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Interval {
    /// One second.
    OneSecond,
    /// One minute.
    #[default]
    OneMinute,
    /// Three minutes.
    ThreeMinutes,
    /// Five minutes.
    FiveMinutes,
    /// Fifteen minutes.
    FifteenMinutes,
    /// Thirty minutes.
    ThirtyMinutes,
    /// One hour.
    OneHour,
    /// Two hours.
    TwoHours,
    /// Four hours.
    FourHours,
    /// Six hours.
    SixHours,
    /// Eight hours.
    EightHours,
    /// Twelve hours.
    TwelveHours,
    /// One day.
    OneDay,
    /// Three days.
    ThreeDays,
    /// One week.
    OneWeek,
    /// One calendar month.
    OneMonth,
}

impl Interval {
    /// Get all intervals in ascending order of duration.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::OneSecond,
            Self::OneMinute,
            Self::ThreeMinutes,
            Self::FiveMinutes,
            Self::FifteenMinutes,
            Self::ThirtyMinutes,
            Self::OneHour,
            Self::TwoHours,
            Self::FourHours,
            Self::SixHours,
            Self::EightHours,
            Self::TwelveHours,
            Self::OneDay,
            Self::ThreeDays,
            Self::OneWeek,
            Self::OneMonth,
        ]
    }

    /// Get the wire code used by the upstream API.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OneSecond => "1s",
            Self::OneMinute => "1m",
            Self::ThreeMinutes => "3m",
            Self::FiveMinutes => "5m",
            Self::FifteenMinutes => "15m",
            Self::ThirtyMinutes => "30m",
            Self::OneHour => "1h",
            Self::TwoHours => "2h",
            Self::FourHours => "4h",
            Self::SixHours => "6h",
            Self::EightHours => "8h",
            Self::TwelveHours => "12h",
            Self::OneDay => "1d",
            Self::ThreeDays => "3d",
            Self::OneWeek => "1w",
            Self::OneMonth => "1M",
        }
    }

    /// Wire codes of every interval, for error messages and the service descriptor.
    #[must_use]
    pub fn codes() -> Vec<&'static str> {
        Self::all().iter().map(Self::as_str).collect()
    }
}

impl FromStr for Interval {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|interval| interval.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidInterval {
                value: s.to_string(),
            })
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Interval {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
