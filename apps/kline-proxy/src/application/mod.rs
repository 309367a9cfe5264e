//! Application Layer - Request handling and port definitions.
//!
//! This layer contains the request translator and the port interface
//! through which it reaches the upstream provider.

/// Error taxonomy surfaced to callers.
pub mod error;

/// Port interfaces for external systems (upstream kline source).
pub mod ports;

/// Request translation service.
pub mod services;
