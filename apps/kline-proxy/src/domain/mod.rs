//! Domain Layer - Kline query types and response envelopes.
//!
//! Pure value objects with no I/O. Everything here is constructed and
//! discarded within a single request.

/// Kline query validation and upstream query construction.
pub mod kline;

/// Normalized response bodies.
pub mod envelope;
