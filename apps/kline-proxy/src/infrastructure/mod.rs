//! Infrastructure Layer
//!
//! Adapters connecting the translator to the outside world.
//!
//! - `config`: Environment-based configuration
//! - `upstream`: HTTP client for the klines endpoint
//! - `http`: Public proxy server
//! - `health`: Liveness and metrics server
//! - `metrics`: Prometheus recorder
//! - `telemetry`: Tracing subscriber and OTLP export

pub mod config;
pub mod health;
pub mod http;
pub mod metrics;
pub mod telemetry;
pub mod upstream;
