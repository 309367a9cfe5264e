//! Proxy Configuration Settings
//!
//! Configuration types for the kline proxy, loaded from environment variables.

use std::time::Duration;

use reqwest::Url;

use crate::domain::kline::KlineDefaults;

/// Default upstream base URL (Binance spot REST API).
pub const DEFAULT_UPSTREAM_URL: &str = "https://api.binance.com";

/// Provider tag reported in successful responses.
pub const UPSTREAM_SOURCE: &str = "binance";

/// Upstream HTTP client settings.
#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    /// Base URL; `/api/v3/klines` is appended.
    pub base_url: Url,
    /// Timeout for the whole outbound request.
    pub timeout: Duration,
    /// Value of the `User-Agent` header sent upstream.
    pub user_agent: String,
    /// Provider tag for the `source` field.
    pub source: String,
}

impl Default for UpstreamSettings {
    #[allow(clippy::expect_used)]
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_UPSTREAM_URL).expect("static upstream URL is valid"),
            timeout: Duration::from_secs(10),
            user_agent: default_user_agent(),
            source: UPSTREAM_SOURCE.to_string(),
        }
    }
}

fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Server port settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Proxy HTTP port.
    pub http_port: u16,
    /// Health and metrics HTTP port (0 = disabled).
    pub health_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            http_port: 8080,
            health_port: 8082,
        }
    }
}

/// Complete proxy configuration.
#[derive(Debug, Clone, Default)]
pub struct ProxyConfig {
    /// Server port settings.
    pub server: ServerSettings,
    /// Upstream client settings.
    pub upstream: UpstreamSettings,
    /// Defaults applied to kline queries.
    pub klines: KlineDefaults,
}

impl ProxyConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream URL is not an absolute http(s) URL or
    /// the timeout is zero.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let server = ServerSettings {
            http_port: parse_or(&lookup, "KLINE_PROXY_PORT", defaults.server.http_port),
            health_port: parse_or(
                &lookup,
                "KLINE_PROXY_HEALTH_PORT",
                defaults.server.health_port,
            ),
        };

        let base_url = match lookup("KLINE_PROXY_UPSTREAM_URL") {
            Some(raw) => parse_upstream_url(&raw)?,
            None => defaults.upstream.base_url,
        };

        let timeout_ms = parse_or(
            &lookup,
            "KLINE_PROXY_UPSTREAM_TIMEOUT_MS",
            u64::try_from(defaults.upstream.timeout.as_millis()).unwrap_or(u64::MAX),
        );
        if timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "KLINE_PROXY_UPSTREAM_TIMEOUT_MS".to_string(),
                reason: "timeout must be greater than zero".to_string(),
            });
        }

        let user_agent = match lookup("KLINE_PROXY_USER_AGENT") {
            Some(value) if value.is_empty() => {
                return Err(ConfigError::EmptyValue("KLINE_PROXY_USER_AGENT".to_string()));
            }
            Some(value) => value,
            None => defaults.upstream.user_agent,
        };

        Ok(Self {
            server,
            upstream: UpstreamSettings {
                base_url,
                timeout: Duration::from_millis(timeout_ms),
                user_agent,
                source: defaults.upstream.source,
            },
            klines: defaults.klines,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable has an unusable value.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_upstream_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        key: "KLINE_PROXY_UPSTREAM_URL".to_string(),
        reason,
    };

    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    Ok(url)
}
