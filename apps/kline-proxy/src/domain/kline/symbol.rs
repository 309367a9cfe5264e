//! Symbol value object for kline queries.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::errors::ValidationError;

#[allow(clippy::expect_used)]
static SYMBOL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[A-Z0-9]{5,20}$").expect("static symbol pattern is valid"));

/// A validated trading pair symbol (e.g. "BTCUSDT").
///
/// Always uppercase, 5 to 20 characters of `A-Z` / `0-9`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct KlineSymbol(String);

impl KlineSymbol {
    /// Uppercase and validate a raw symbol.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidSymbol` if the uppercased value does
    /// not match `^[A-Z0-9]{5,20}$`.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let value = raw.to_uppercase();
        if SYMBOL_PATTERN.is_match(&value) {
            Ok(Self(value))
        } else {
            Err(ValidationError::InvalidSymbol { value })
        }
    }

    /// Get the symbol string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KlineSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for KlineSymbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
