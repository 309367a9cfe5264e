//! Kline query parsing, validation and upstream serialization.
//!
//! # Numeric parsing
//!
//! `limit`, `startTime` and `endTime` are read as decimal numbers (leading and
//! trailing whitespace ignored, exponents allowed) and truncated toward zero.
//! Values that fail to parse or are not finite never produce an error:
//!
//! - `limit` falls back to the default when absent, unparseable or below 1
//!   after truncation, and is capped at the maximum.
//! - `startTime` / `endTime` are dropped when absent, empty, unparseable or
//!   negative.

use serde::Serialize;

use super::errors::ValidationError;
use super::interval::Interval;
use super::symbol::KlineSymbol;

// =============================================================================
// Defaults
// =============================================================================

/// Default symbol when the query omits one.
pub const DEFAULT_SYMBOL: &str = "BTCUSDT";

/// Default number of klines when `limit` is omitted or unusable.
pub const DEFAULT_LIMIT: u32 = 100;

/// Largest `limit` forwarded upstream.
pub const MAX_LIMIT: u32 = 1000;

/// Read-only defaults applied while validating a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KlineDefaults {
    /// Symbol used when `symbol` is absent.
    pub symbol: String,
    /// Interval used when `interval` is absent.
    pub interval: Interval,
    /// Limit used when `limit` is absent or unusable.
    pub limit: u32,
    /// Upper bound applied to `limit`.
    pub max_limit: u32,
}

impl Default for KlineDefaults {
    fn default() -> Self {
        Self {
            symbol: DEFAULT_SYMBOL.to_string(),
            interval: Interval::default(),
            limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
        }
    }
}

// =============================================================================
// Raw Query
// =============================================================================

/// Decoded query-string pairs in their original order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawQuery(Vec<(String, String)>);

impl RawQuery {
    /// Decode an `application/x-www-form-urlencoded` query string.
    ///
    /// A missing or undecodable query is treated as empty.
    #[must_use]
    pub fn parse(query: Option<&str>) -> Self {
        let pairs = query
            .and_then(|q| serde_urlencoded::from_str::<Vec<(String, String)>>(q).ok())
            .unwrap_or_default();
        Self(pairs)
    }

    /// Get the first value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawQuery {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

// =============================================================================
// Numeric Helpers
// =============================================================================

/// Parse a decimal number, returning `None` for non-finite or unparseable input.
///
/// A blank string reads as zero.
fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Normalize a raw `limit` value.
///
/// The result is always within `1..=defaults.max_limit` and
/// `clamp_limit(Some(&clamp_limit(x).to_string())) == clamp_limit(x)`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn clamp_limit(raw: Option<&str>, defaults: &KlineDefaults) -> u32 {
    raw.and_then(parse_number)
        .map(f64::trunc)
        .filter(|n| *n >= 1.0)
        .map_or(defaults.limit, |n| n.min(f64::from(defaults.max_limit)) as u32)
}

/// Normalize a raw epoch-millisecond timestamp.
///
/// Values beyond `u64::MAX` saturate to `u64::MAX` and are forwarded as is;
/// the upstream rejects them.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_time(raw: Option<&str>) -> Option<u64> {
    raw.filter(|r| !r.is_empty())
        .and_then(parse_number)
        .filter(|n| *n >= 0.0)
        .map(|n| n.trunc() as u64)
}

// =============================================================================
// Query Parameters
// =============================================================================

/// A validated kline query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParameters {
    /// Uppercased trading pair.
    pub symbol: KlineSymbol,
    /// Candle interval.
    pub interval: Interval,
    /// Number of candles, `1..=max_limit`.
    pub limit: u32,
    /// Inclusive start, epoch milliseconds.
    pub start_time: Option<u64>,
    /// Inclusive end, epoch milliseconds.
    pub end_time: Option<u64>,
}

impl QueryParameters {
    /// Validate raw query values, applying `defaults` for missing fields.
    ///
    /// Checks run in order: symbol, interval, then the time range.
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` encountered.
    pub fn from_query(query: &RawQuery, defaults: &KlineDefaults) -> Result<Self, ValidationError> {
        let symbol = KlineSymbol::parse(query.get("symbol").unwrap_or(defaults.symbol.as_str()))?;

        let interval = match query.get("interval") {
            Some(raw) => raw.parse::<Interval>()?,
            None => defaults.interval,
        };

        let limit = clamp_limit(query.get("limit"), defaults);
        let start_time = parse_time(query.get("startTime"));
        let end_time = parse_time(query.get("endTime"));

        if let (Some(start_time), Some(end_time)) = (start_time, end_time)
            && start_time > end_time
        {
            return Err(ValidationError::InvalidRange {
                start_time,
                end_time,
            });
        }

        Ok(Self {
            symbol,
            interval,
            limit,
            start_time,
            end_time,
        })
    }

    /// Build the query forwarded upstream.
    #[must_use]
    pub fn to_upstream_query(&self) -> UpstreamQuery {
        UpstreamQuery::from(self)
    }
}

// =============================================================================
// Upstream Query
// =============================================================================

/// The upstream `GET /api/v3/klines` query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamQuery {
    symbol: String,
    interval: Interval,
    limit: u32,
    start_time: Option<u64>,
    end_time: Option<u64>,
}

impl UpstreamQuery {
    /// Ordered key/value pairs; time bounds only when present.
    #[must_use]
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("symbol", self.symbol.clone()),
            ("interval", self.interval.as_str().to_string()),
            ("limit", self.limit.to_string()),
        ];
        if let Some(start_time) = self.start_time {
            pairs.push(("startTime", start_time.to_string()));
        }
        if let Some(end_time) = self.end_time {
            pairs.push(("endTime", end_time.to_string()));
        }
        pairs
    }

    /// Encode as a query string.
    ///
    /// Every value is alphanumeric, so no percent-encoding is needed.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        self.pairs()
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl From<&QueryParameters> for UpstreamQuery {
    fn from(params: &QueryParameters) -> Self {
        Self {
            symbol: params.symbol.as_str().to_string(),
            interval: params.interval,
            limit: params.limit,
            start_time: params.start_time,
            end_time: params.end_time,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use test_case::test_case;

    use super::*;

    fn query(pairs: &[(&str, &str)]) -> RawQuery {
        pairs.iter().copied().collect()
    }

    fn clamp(raw: Option<&str>) -> u32 {
        clamp_limit(raw, &KlineDefaults::default())
    }

    #[test_case(None, 100 ; "absent")]
    #[test_case(Some("-5"), 100 ; "negative")]
    #[test_case(Some("0"), 100 ; "zero")]
    #[test_case(Some("abc"), 100 ; "not a number")]
    #[test_case(Some(""), 100 ; "empty")]
    #[test_case(Some("Infinity"), 100 ; "infinite")]
    #[test_case(Some("NaN"), 100 ; "nan")]
    #[test_case(Some("0.5"), 100 ; "truncates to zero")]
    #[test_case(Some("5000"), 1000 ; "above cap")]
    #[test_case(Some("1000"), 1000 ; "at cap")]
    #[test_case(Some("250"), 250 ; "in range")]
    #[test_case(Some("250.9"), 250 ; "fractional")]
    #[test_case(Some(" 42 "), 42 ; "surrounding whitespace")]
    #[test_case(Some("1e2"), 100 ; "exponent")]
    #[test_case(Some("1"), 1 ; "minimum")]
    fn clamp_limit_cases(raw: Option<&str>, expected: u32) {
        assert_eq!(clamp(raw), expected);
    }

    #[test_case(None, None ; "absent")]
    #[test_case(Some(""), None ; "empty")]
    #[test_case(Some("-1"), None ; "negative")]
    #[test_case(Some("abc"), None ; "not a number")]
    #[test_case(Some("1000.7"), Some(1000) ; "fractional")]
    #[test_case(Some("0"), Some(0) ; "zero")]
    #[test_case(Some("-0"), Some(0) ; "negative zero")]
    #[test_case(Some("1700000000000"), Some(1_700_000_000_000) ; "epoch millis")]
    #[test_case(Some("1e30"), Some(u64::MAX) ; "saturates above u64 range")]
    fn parse_time_cases(raw: Option<&str>, expected: Option<u64>) {
        assert_eq!(parse_time(raw), expected);
    }

    #[test]
    fn applies_defaults_to_empty_query() {
        let params = QueryParameters::from_query(&RawQuery::default(), &KlineDefaults::default())
            .unwrap();
        assert_eq!(params.symbol.as_str(), "BTCUSDT");
        assert_eq!(params.interval, Interval::OneMinute);
        assert_eq!(params.limit, 100);
        assert_eq!(params.start_time, None);
        assert_eq!(params.end_time, None);
    }

    #[test]
    fn normalizes_all_fields() {
        let params = QueryParameters::from_query(
            &query(&[
                ("symbol", "ethusdt"),
                ("interval", "4h"),
                ("limit", "5000"),
                ("startTime", "1000.9"),
                ("endTime", "2000"),
            ]),
            &KlineDefaults::default(),
        )
        .unwrap();
        assert_eq!(params.symbol.as_str(), "ETHUSDT");
        assert_eq!(params.interval, Interval::FourHours);
        assert_eq!(params.limit, 1000);
        assert_eq!(params.start_time, Some(1000));
        assert_eq!(params.end_time, Some(2000));
    }

    #[test]
    fn empty_symbol_is_not_defaulted() {
        let err = QueryParameters::from_query(&query(&[("symbol", "")]), &KlineDefaults::default())
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidSymbol { .. }));
    }

    #[test]
    fn symbol_is_checked_before_interval() {
        let err = QueryParameters::from_query(
            &query(&[("symbol", "x"), ("interval", "2m")]),
            &KlineDefaults::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidSymbol { .. }));
    }

    #[test]
    fn rejects_inverted_range() {
        let err = QueryParameters::from_query(
            &query(&[("startTime", "2000"), ("endTime", "1000")]),
            &KlineDefaults::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidRange {
                start_time: 2000,
                end_time: 1000
            }
        );
    }

    #[test]
    fn accepts_ordered_and_equal_ranges() {
        for (start, end) in [("1000", "2000"), ("1500", "1500")] {
            let params = QueryParameters::from_query(
                &query(&[("startTime", start), ("endTime", end)]),
                &KlineDefaults::default(),
            );
            assert!(params.is_ok());
        }
    }

    #[test]
    fn invalid_time_bound_disables_range_check() {
        let params = QueryParameters::from_query(
            &query(&[("startTime", "2000"), ("endTime", "-1")]),
            &KlineDefaults::default(),
        )
        .unwrap();
        assert_eq!(params.start_time, Some(2000));
        assert_eq!(params.end_time, None);
    }

    #[test]
    fn custom_defaults_are_honored() {
        let defaults = KlineDefaults {
            symbol: "ETHBTC".to_string(),
            interval: Interval::OneDay,
            limit: 10,
            max_limit: 50,
        };
        let params = QueryParameters::from_query(&query(&[("limit", "75")]), &defaults).unwrap();
        assert_eq!(params.symbol.as_str(), "ETHBTC");
        assert_eq!(params.interval, Interval::OneDay);
        assert_eq!(params.limit, 50);
    }

    #[test]
    fn raw_query_first_value_wins() {
        let raw = RawQuery::parse(Some("symbol=ethusdt&symbol=btcusdt&limit=5"));
        assert_eq!(raw.get("symbol"), Some("ethusdt"));
        assert_eq!(raw.get("limit"), Some("5"));
        assert_eq!(raw.get("interval"), None);
    }

    #[test]
    fn raw_query_decodes_percent_and_plus() {
        let raw = RawQuery::parse(Some("symbol=BTC%5FUSDT&note=a+b"));
        assert_eq!(raw.get("symbol"), Some("BTC_USDT"));
        assert_eq!(raw.get("note"), Some("a b"));
    }

    #[test]
    fn upstream_query_omits_missing_bounds() {
        let params = QueryParameters::from_query(
            &query(&[("symbol", "btcusdt"), ("limit", "10")]),
            &KlineDefaults::default(),
        )
        .unwrap();
        assert_eq!(
            params.to_upstream_query().to_query_string(),
            "symbol=BTCUSDT&interval=1m&limit=10"
        );
    }

    #[test]
    fn upstream_query_includes_present_bounds_in_order() {
        let params = QueryParameters::from_query(
            &query(&[
                ("endTime", "2000"),
                ("interval", "1M"),
                ("startTime", "1000"),
                ("extra", "ignored"),
            ]),
            &KlineDefaults::default(),
        )
        .unwrap();
        assert_eq!(
            params.to_upstream_query().to_query_string(),
            "symbol=BTCUSDT&interval=1M&limit=100&startTime=1000&endTime=2000"
        );
    }

    proptest! {
        #[test]
        fn clamp_is_idempotent_for_any_number(n in proptest::num::f64::ANY) {
            let once = clamp(Some(&n.to_string()));
            let twice = clamp(Some(&once.to_string()));
            prop_assert_eq!(once, twice);
            prop_assert!((1..=MAX_LIMIT).contains(&once));
        }

        #[test]
        fn clamp_is_total_for_any_string(s in ".*") {
            let limit = clamp(Some(&s));
            prop_assert!((1..=MAX_LIMIT).contains(&limit));
        }

        #[test]
        fn parse_time_never_returns_for_negative(n in -1.0e15f64..-1.0e-9) {
            prop_assert_eq!(parse_time(Some(&n.to_string())), None);
        }
    }
}
