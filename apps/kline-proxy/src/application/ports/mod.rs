//! Port Interfaces
//!
//! Defines the interfaces (ports) for external systems following
//! the Hexagonal Architecture pattern.
//!
//! ## Driven Ports (Outbound)
//!
//! - `KlineSourcePort`: Interface for the upstream klines REST endpoint

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::kline::UpstreamQuery;

/// Raw upstream reply: status code and body text, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamReply {
    /// HTTP status code.
    pub status: u16,
    /// Full response body as text.
    pub body: String,
}

impl UpstreamReply {
    /// Whether the status is in the 2xx range.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// The outbound call could not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamFetchError {
    /// No response within the configured timeout.
    #[error("upstream request timed out after {timeout_ms}ms")]
    Timeout {
        /// Configured timeout in milliseconds.
        timeout_ms: u64,
    },

    /// Connection, TLS or body transfer failure.
    #[error("upstream request failed: {message}")]
    Transport {
        /// Underlying error description.
        message: String,
    },
}

/// Port for fetching klines from the upstream provider.
///
/// Implementations issue exactly one request per call and never retry.
#[async_trait]
pub trait KlineSourcePort: Send + Sync {
    /// Provider tag reported in the `source` field of successful responses.
    fn source(&self) -> &str;

    /// Fetch klines for an already-validated query.
    ///
    /// Non-2xx replies are returned as `Ok`; only transport failures are `Err`.
    async fn fetch_klines(
        &self,
        query: &UpstreamQuery,
    ) -> Result<UpstreamReply, UpstreamFetchError>;
}
