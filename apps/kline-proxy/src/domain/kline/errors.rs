//! Validation errors for kline queries.

use thiserror::Error;

/// A kline query failed local validation.
///
/// These are always detected before any upstream call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Symbol is not 5-20 uppercase ASCII letters or digits.
    #[error("invalid symbol '{value}': expected 5-20 characters of A-Z or 0-9")]
    InvalidSymbol {
        /// The symbol after uppercasing.
        value: String,
    },

    /// Interval is not one of the supported codes.
    #[error("invalid interval '{value}'")]
    InvalidInterval {
        /// The rejected interval.
        value: String,
    },

    /// Start time is after end time.
    #[error("startTime ({start_time}) must not be greater than endTime ({end_time})")]
    InvalidRange {
        /// Requested start, epoch milliseconds.
        start_time: u64,
        /// Requested end, epoch milliseconds.
        end_time: u64,
    },
}
