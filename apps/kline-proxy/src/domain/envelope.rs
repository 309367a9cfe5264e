//! Response Envelopes
//!
//! Normalized JSON bodies returned to callers, independent of the upstream
//! schema. The error arm of the envelope lives with `ProxyError` in the
//! application layer.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Value, json};

use super::kline::{Interval, KlineDefaults, KlineSymbol, QueryParameters};

/// Parse an upstream body as JSON, wrapping unparseable text as `{"raw": text}`.
#[must_use]
pub fn parse_lenient(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| json!({ "raw": text }))
}

/// Successful kline response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KlineEnvelope {
    /// Normalized symbol.
    pub symbol: KlineSymbol,
    /// Requested interval.
    pub interval: Interval,
    /// Normalized limit.
    pub limit: u32,
    /// Upstream provider tag.
    pub source: String,
    /// Upstream body, passed through.
    pub data: Value,
}

impl KlineEnvelope {
    /// Wrap an upstream body for the given query.
    #[must_use]
    pub fn new(params: &QueryParameters, source: impl Into<String>, data: Value) -> Self {
        Self {
            symbol: params.symbol.clone(),
            interval: params.interval,
            limit: params.limit,
            source: source.into(),
            data,
        }
    }
}

/// Body of the `/health` route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthBody {
    /// Always `"ok"` while the process is serving.
    pub status: &'static str,
}

impl HealthBody {
    /// The only health body the proxy emits.
    #[must_use]
    pub const fn ok() -> Self {
        Self { status: "ok" }
    }
}

/// Static description of the service, served at `/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceDescriptor {
    /// Service name.
    pub name: String,
    /// Service version.
    pub version: String,
    /// Upstream provider tag.
    pub source: String,
    /// Route name to example request.
    pub endpoints: BTreeMap<&'static str, String>,
    /// Accepted query parameters and how they are interpreted.
    pub parameters: Value,
}

impl ServiceDescriptor {
    /// Describe the proxy routes for the given defaults.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        source: impl Into<String>,
        defaults: &KlineDefaults,
    ) -> Self {
        let example = format!(
            "symbol={}&interval={}&limit={}",
            defaults.symbol, defaults.interval, defaults.limit
        );

        let endpoints = BTreeMap::from([
            ("health", "/health".to_string()),
            ("kline", format!("/kline?{example}")),
            ("klines", format!("/klines?{example}")),
        ]);

        let parameters = json!({
            "symbol": {
                "default": defaults.symbol,
                "pattern": "^[A-Z0-9]{5,20}$",
            },
            "interval": {
                "default": defaults.interval,
                "allowed": Interval::codes(),
            },
            "limit": {
                "default": defaults.limit,
                "max": defaults.max_limit,
            },
            "startTime": "optional, epoch milliseconds",
            "endTime": "optional, epoch milliseconds",
        });

        Self {
            name: name.into(),
            version: version.into(),
            source: source.into(),
            endpoints,
            parameters,
        }
    }
}
