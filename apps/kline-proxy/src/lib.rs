#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Kline Proxy - Candlestick Market Data Proxy
//!
//! A stateless HTTP service that validates kline queries, forwards each one
//! to the Binance REST API exactly once and relays the result inside a
//! normalized JSON envelope with permissive CORS headers.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Query validation and response envelopes
//!   - `kline`: Symbol, interval, limit and time-range normalization
//!   - `envelope`: Success, health and service descriptor bodies
//!
//! - **Application**: Request handling and port definitions
//!   - `ports`: Interface for the upstream kline source
//!   - `services`: Request translator (routing, validation, reply mapping)
//!   - `error`: Error taxonomy and error bodies
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `upstream`: reqwest client for `/api/v3/klines`
//!   - `http`: axum proxy server
//!   - `health`: Liveness and Prometheus endpoints
//!   - `config`: Environment configuration
//!
//! # Data Flow
//!
//! ```text
//! Client ──GET /klines?...──► RequestTranslator ──validate──► BinanceKlineClient ──► Binance
//!   ◄──── envelope / error ─────────┘                                  ◄── status + body ──┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Query types with no external I/O.
pub mod domain;

/// Application layer - Request handling and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::envelope::{HealthBody, KlineEnvelope, ServiceDescriptor};
pub use domain::kline::{
    Interval, KlineDefaults, KlineSymbol, QueryParameters, UpstreamQuery, ValidationError,
};

// Application
pub use application::error::{ErrorBody, ProxyError};
pub use application::ports::{KlineSourcePort, UpstreamFetchError, UpstreamReply};
pub use application::services::{InboundRequest, Outcome, RequestTranslator, Route};

// Infrastructure config
pub use infrastructure::config::{ConfigError, ProxyConfig, ServerSettings, UpstreamSettings};

// Servers
pub use infrastructure::health::{HealthServer, HealthServerError, HealthServerState};
pub use infrastructure::http::{ProxyServer, ServerError, create_router};

// Upstream client
pub use infrastructure::upstream::BinanceKlineClient;

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
