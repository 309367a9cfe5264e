//! Upstream Adapter
//!
//! reqwest implementation of `KlineSourcePort` for the Binance REST API.

mod client;

pub use client::{BinanceKlineClient, KLINES_PATH};
