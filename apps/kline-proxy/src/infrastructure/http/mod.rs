//! HTTP/REST API adapter.
//!
//! Inbound adapter exposing the request translator over HTTP.

mod response;
mod server;

pub use response::{JSON_CONTENT_TYPE, apply_cors, json_response, preflight_response};
pub use server::{ProxyServer, REQUEST_ID_HEADER, ServerError, create_router};
