//! Application Services
//!
//! - `translator`: validates kline requests and maps upstream replies

mod translator;

pub use translator::{InboundRequest, Outcome, RequestTranslator, Route, normalize_path};
