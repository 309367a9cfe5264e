//! Proxy error taxonomy.
//!
//! Every failure surfaced to a caller is one of these variants. Each knows
//! its HTTP status and the tag written to the `error` field of the body.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::application::ports::UpstreamFetchError;
use crate::domain::kline::{Interval, ValidationError};

/// A request that did not produce a kline envelope.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProxyError {
    /// Method other than GET or OPTIONS.
    #[error("method {method} is not allowed")]
    MethodNotAllowed {
        /// The rejected method.
        method: String,
    },

    /// Unknown path.
    #[error("no route for {path}")]
    NotFound {
        /// The normalized path.
        path: String,
    },

    /// Query failed local validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Upstream answered with a non-2xx status.
    #[error("upstream responded with status {status}")]
    Upstream {
        /// Upstream status code.
        status: u16,
        /// Upstream body, parsed leniently.
        details: Value,
    },

    /// Upstream call did not complete.
    #[error("{0}")]
    Fetch(#[from] UpstreamFetchError),
}

impl ProxyError {
    /// Tag written to the `error` field.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::MethodNotAllowed { .. } => "MethodNotAllowed",
            Self::NotFound { .. } => "NotFound",
            Self::Validation(ValidationError::InvalidSymbol { .. }) => "InvalidSymbol",
            Self::Validation(ValidationError::InvalidInterval { .. }) => "InvalidInterval",
            Self::Validation(ValidationError::InvalidRange { .. }) => "InvalidRange",
            Self::Upstream { .. } => "UpstreamError",
            Self::Fetch(_) => "FetchFailure",
        }
    }

    /// HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::MethodNotAllowed { .. } => 405,
            Self::NotFound { .. } => 404,
            Self::Validation(_) => 400,
            Self::Upstream { .. } | Self::Fetch(_) => 502,
        }
    }

    /// Serializable body for this error.
    #[must_use]
    pub fn to_body(&self) -> ErrorBody {
        let (status, details) = match self {
            Self::Upstream { status, details } => (Some(*status), Some(details.clone())),
            Self::Validation(ValidationError::InvalidInterval { .. }) => {
                (None, Some(Value::from(Interval::codes())))
            }
            _ => (None, None),
        };

        ErrorBody {
            error: self.tag(),
            message: Some(self.to_string()),
            status,
            details,
        }
    }
}

/// Error arm of the response envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    /// Error tag, e.g. `InvalidSymbol`.
    pub error: &'static str,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Upstream status code, for upstream errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Structured detail: the upstream body, or the allowed intervals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}
