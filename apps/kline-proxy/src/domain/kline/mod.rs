//! Kline Query Types
//!
//! Value objects for a single candlestick request: the validated symbol and
//! interval, the normalized query and the query forwarded upstream.

mod errors;
mod interval;
mod query;
mod symbol;

pub use errors::ValidationError;
pub use interval::Interval;
pub use query::{
    DEFAULT_LIMIT, DEFAULT_SYMBOL, KlineDefaults, MAX_LIMIT, QueryParameters, RawQuery,
    UpstreamQuery, clamp_limit, parse_time,
};
pub use symbol::KlineSymbol;
