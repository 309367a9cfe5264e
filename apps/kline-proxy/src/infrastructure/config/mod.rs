//! Configuration Module
//!
//! Configuration loading for the proxy service.

mod settings;

pub use settings::{
    ConfigError, DEFAULT_UPSTREAM_URL, ProxyConfig, ServerSettings, UPSTREAM_SOURCE,
    UpstreamSettings,
};
