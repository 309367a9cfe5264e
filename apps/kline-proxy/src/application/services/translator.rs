//! Request Translator
//!
//! Turns an inbound request into at most one upstream kline call and maps
//! the result onto a response envelope.
//!
//! # Check Order
//!
//! 1. `OPTIONS` on any path is a CORS preflight.
//! 2. Any method other than `GET` is rejected.
//! 3. Trailing slashes are stripped and the path is matched.
//! 4. For kline routes the query is validated.
//! 5. The upstream is called once and its reply mapped.
//!
//! Each step assumes the previous ones passed, so validation failures never
//! reach the network.

use std::time::Instant;

use axum::http::Method;

use crate::application::error::ProxyError;
use crate::application::ports::KlineSourcePort;
use crate::domain::envelope::{HealthBody, KlineEnvelope, ServiceDescriptor, parse_lenient};
use crate::domain::kline::{KlineDefaults, QueryParameters, RawQuery};

// =============================================================================
// Routes
// =============================================================================

/// Route matched from a normalized path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `/` or the empty path.
    Root,
    /// `/health`.
    Health,
    /// `/kline` or `/klines`.
    Klines,
    /// Anything else.
    Unknown,
}

impl Route {
    /// Match a request path, ignoring trailing slashes.
    #[must_use]
    pub fn resolve(path: &str) -> Self {
        match normalize_path(path) {
            "" => Self::Root,
            "/health" => Self::Health,
            "/kline" | "/klines" => Self::Klines,
            _ => Self::Unknown,
        }
    }

    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Health => "health",
            Self::Klines => "klines",
            Self::Unknown => "unknown",
        }
    }
}

/// Strip trailing slashes; `/` normalizes to the empty path.
#[must_use]
pub fn normalize_path(path: &str) -> &str {
    path.trim_end_matches('/')
}

// =============================================================================
// Request / Outcome
// =============================================================================

/// The parts of an inbound HTTP request the translator looks at.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    /// HTTP method.
    pub method: Method,
    /// URL path.
    pub path: String,
    /// Raw query string, without the leading `?`.
    pub query: Option<String>,
}

impl InboundRequest {
    /// Create a request.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>, query: Option<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query,
        }
    }

    /// Shorthand for a `GET` request, splitting the query off `uri`.
    #[must_use]
    pub fn get(uri: &str) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (uri, None),
        };
        Self::new(Method::GET, path, query)
    }
}

/// A successfully handled request.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// CORS preflight: empty 204.
    Preflight,
    /// Service descriptor for `/`.
    Service(Box<ServiceDescriptor>),
    /// Liveness body for `/health`.
    Health(HealthBody),
    /// Upstream klines.
    Klines(KlineEnvelope),
}

// =============================================================================
// Translator
// =============================================================================

/// Stateless request handler shared by every connection.
pub struct RequestTranslator<S: KlineSourcePort> {
    source: S,
    defaults: KlineDefaults,
    descriptor: ServiceDescriptor,
}

impl<S: KlineSourcePort> RequestTranslator<S> {
    /// Create a translator over an upstream source.
    #[must_use]
    pub fn new(source: S, defaults: KlineDefaults) -> Self {
        let descriptor = ServiceDescriptor::new(
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            source.source(),
            &defaults,
        );
        Self {
            source,
            defaults,
            descriptor,
        }
    }

    /// Handle one request.
    ///
    /// # Errors
    ///
    /// Returns the `ProxyError` to render when the request does not yield a
    /// successful outcome.
    pub async fn handle(&self, request: &InboundRequest) -> Result<Outcome, ProxyError> {
        if request.method == Method::OPTIONS {
            return Ok(Outcome::Preflight);
        }

        if request.method != Method::GET {
            return Err(ProxyError::MethodNotAllowed {
                method: request.method.to_string(),
            });
        }

        match Route::resolve(&request.path) {
            Route::Root => Ok(Outcome::Service(Box::new(self.descriptor.clone()))),
            Route::Health => Ok(Outcome::Health(HealthBody::ok())),
            Route::Klines => self.fetch_klines(request.query.as_deref()).await,
            Route::Unknown => Err(ProxyError::NotFound {
                path: normalize_path(&request.path).to_string(),
            }),
        }
    }

    /// Validate the query, call upstream once and map the reply.
    async fn fetch_klines(&self, query: Option<&str>) -> Result<Outcome, ProxyError> {
        let params = QueryParameters::from_query(&RawQuery::parse(query), &self.defaults)?;
        let upstream_query = params.to_upstream_query();

        let started = Instant::now();
        let reply = self
            .source
            .fetch_klines(&upstream_query)
            .await
            .inspect_err(|e| {
                tracing::warn!(
                    error = %e,
                    query = %upstream_query.to_query_string(),
                    "Upstream fetch failed"
                );
            })?;

        tracing::debug!(
            status = reply.status,
            bytes = reply.body.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "Upstream replied"
        );

        let data = parse_lenient(&reply.body);

        if !reply.is_success() {
            tracing::warn!(
                status = reply.status,
                query = %upstream_query.to_query_string(),
                "Upstream returned error status"
            );
            return Err(ProxyError::Upstream {
                status: reply.status,
                details: data,
            });
        }

        Ok(Outcome::Klines(KlineEnvelope::new(
            &params,
            self.source.source(),
            data,
        )))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::application::ports::{UpstreamFetchError, UpstreamReply};
    use crate::domain::kline::{Interval, UpstreamQuery, ValidationError};

    // Stub upstream recording every query it receives.
    struct StubSource {
        reply: Result<UpstreamReply, UpstreamFetchError>,
        calls: Mutex<Vec<String>>,
    }

    impl StubSource {
        fn replying(status: u16, body: &str) -> Self {
            Self {
                reply: Ok(UpstreamReply {
                    status,
                    body: body.to_string(),
                }),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing(error: UpstreamFetchError) -> Self {
            Self {
                reply: Err(error),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl KlineSourcePort for StubSource {
        fn source(&self) -> &str {
            "binance"
        }

        async fn fetch_klines(
            &self,
            query: &UpstreamQuery,
        ) -> Result<UpstreamReply, UpstreamFetchError> {
            self.calls.lock().unwrap().push(query.to_query_string());
            self.reply.clone()
        }
    }

    fn translator(source: StubSource) -> RequestTranslator<StubSource> {
        RequestTranslator::new(source, KlineDefaults::default())
    }

    fn calls(translator: &RequestTranslator<StubSource>) -> Vec<String> {
        translator.source.calls.lock().unwrap().clone()
    }

    #[test]
    fn route_resolution() {
        assert_eq!(Route::resolve(""), Route::Root);
        assert_eq!(Route::resolve("/"), Route::Root);
        assert_eq!(Route::resolve("/health"), Route::Health);
        assert_eq!(Route::resolve("/health/"), Route::Health);
        assert_eq!(Route::resolve("/kline"), Route::Klines);
        assert_eq!(Route::resolve("/kline/"), Route::Klines);
        assert_eq!(Route::resolve("/klines"), Route::Klines);
        assert_eq!(Route::resolve("/klines//"), Route::Klines);
        assert_eq!(Route::resolve("/Kline"), Route::Unknown);
        assert_eq!(Route::resolve("/kline/extra"), Route::Unknown);
        assert_eq!(Route::resolve("/api/v3/klines"), Route::Unknown);
    }

    #[test]
    fn inbound_get_splits_query() {
        let request = InboundRequest::get("/kline?symbol=ethusdt");
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.path, "/kline");
        assert_eq!(request.query.as_deref(), Some("symbol=ethusdt"));
        assert_eq!(InboundRequest::get("/").query, None);
    }

    #[tokio::test]
    async fn options_is_preflight_on_any_path() {
        let translator = translator(StubSource::replying(200, "[]"));
        for path in ["/", "/kline", "/does-not-exist"] {
            let request = InboundRequest::new(Method::OPTIONS, path, None);
            assert_eq!(translator.handle(&request).await, Ok(Outcome::Preflight));
        }
        assert!(calls(&translator).is_empty());
    }

    #[tokio::test]
    async fn non_get_methods_are_rejected_on_any_path() {
        let translator = translator(StubSource::replying(200, "[]"));
        for method in [Method::POST, Method::PUT, Method::DELETE, Method::HEAD] {
            for path in ["/", "/kline", "/nope"] {
                let request = InboundRequest::new(method.clone(), path, None);
                let err = translator.handle(&request).await.unwrap_err();
                assert_eq!(err.status_code(), 405);
            }
        }
        assert!(calls(&translator).is_empty());
    }

    #[tokio::test]
    async fn root_returns_descriptor() {
        let translator = translator(StubSource::replying(200, "[]"));
        let outcome = translator.handle(&InboundRequest::get("/")).await.unwrap();
        let Outcome::Service(descriptor) = outcome else {
            panic!("expected service descriptor, got {outcome:?}");
        };
        assert_eq!(descriptor.source, "binance");
        assert!(descriptor.endpoints.contains_key("klines"));
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let translator = translator(StubSource::replying(200, "[]"));
        let outcome = translator
            .handle(&InboundRequest::get("/health/"))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Health(HealthBody::ok()));
        assert!(calls(&translator).is_empty());
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let translator = translator(StubSource::replying(200, "[]"));
        let err = translator
            .handle(&InboundRequest::get("/ticker/"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ProxyError::NotFound {
                path: "/ticker".to_string()
            }
        );
    }

    #[tokio::test]
    async fn kline_success_wraps_upstream_body() {
        let translator = translator(StubSource::replying(200, "[[1,\"2\"]]"));
        let outcome = translator
            .handle(&InboundRequest::get(
                "/kline?symbol=btcusdt&interval=1m&limit=10",
            ))
            .await
            .unwrap();

        let Outcome::Klines(envelope) = outcome else {
            panic!("expected klines, got {outcome:?}");
        };
        assert_eq!(envelope.symbol.as_str(), "BTCUSDT");
        assert_eq!(envelope.interval, Interval::OneMinute);
        assert_eq!(envelope.limit, 10);
        assert_eq!(envelope.source, "binance");
        assert_eq!(envelope.data, json!([[1, "2"]]));
        assert_eq!(
            calls(&translator),
            vec!["symbol=BTCUSDT&interval=1m&limit=10".to_string()]
        );
    }

    #[tokio::test]
    async fn klines_alias_and_trailing_slash() {
        let translator = translator(StubSource::replying(200, "[]"));
        assert!(translator.handle(&InboundRequest::get("/klines")).await.is_ok());
        assert!(translator.handle(&InboundRequest::get("/kline/")).await.is_ok());
        assert_eq!(calls(&translator).len(), 2);
    }

    #[tokio::test]
    async fn validation_failures_never_call_upstream() {
        let translator = translator(StubSource::replying(200, "[]"));
        let cases = [
            ("/kline?symbol=btc", "InvalidSymbol"),
            ("/kline?symbol=BTC_USDT", "InvalidSymbol"),
            ("/kline?interval=2m", "InvalidInterval"),
            ("/kline?interval=1Y", "InvalidInterval"),
            ("/kline?startTime=2000&endTime=1000", "InvalidRange"),
        ];

        for (uri, tag) in cases {
            let err = translator
                .handle(&InboundRequest::get(uri))
                .await
                .unwrap_err();
            assert_eq!(err.tag(), tag, "{uri}");
            assert_eq!(err.status_code(), 400);
        }
        assert!(calls(&translator).is_empty());
    }

    #[tokio::test]
    async fn upstream_error_status_is_passed_through() {
        let translator = translator(StubSource::replying(
            418,
            r#"{"code":-1121,"msg":"Invalid symbol."}"#,
        ));
        let err = translator
            .handle(&InboundRequest::get("/kline?symbol=AAAAAA"))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ProxyError::Upstream {
                status: 418,
                details: json!({"code": -1121, "msg": "Invalid symbol."}),
            }
        );
        assert_eq!(err.status_code(), 502);
    }

    #[tokio::test]
    async fn upstream_non_json_is_wrapped_raw() {
        let translator = translator(StubSource::replying(503, "Service Unavailable"));
        let err = translator
            .handle(&InboundRequest::get("/kline"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ProxyError::Upstream {
                status: 503,
                details: json!({"raw": "Service Unavailable"}),
            }
        );
    }

    #[tokio::test]
    async fn successful_non_json_body_is_wrapped_raw() {
        let translator = translator(StubSource::replying(200, "not json"));
        let outcome = translator
            .handle(&InboundRequest::get("/kline"))
            .await
            .unwrap();
        let Outcome::Klines(envelope) = outcome else {
            panic!("expected klines, got {outcome:?}");
        };
        assert_eq!(envelope.data, json!({"raw": "not json"}));
    }

    #[tokio::test]
    async fn transport_failure_is_fetch_failure() {
        let translator = translator(StubSource::failing(UpstreamFetchError::Transport {
            message: "connection refused".to_string(),
        }));
        let err = translator
            .handle(&InboundRequest::get("/klines"))
            .await
            .unwrap_err();

        assert_eq!(err.tag(), "FetchFailure");
        assert_eq!(err.status_code(), 502);
        assert_eq!(
            err.to_body().message.as_deref(),
            Some("upstream request failed: connection refused")
        );
        assert_eq!(calls(&translator).len(), 1);
    }

    #[tokio::test]
    async fn range_error_precedes_upstream_even_with_valid_symbol() {
        let translator = translator(StubSource::replying(200, "[]"));
        let err = translator
            .handle(&InboundRequest::get(
                "/kline?symbol=ethusdt&startTime=2000&endTime=1000",
            ))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ProxyError::Validation(ValidationError::InvalidRange {
                start_time: 2000,
                end_time: 1000
            })
        );
        assert!(calls(&translator).is_empty());
    }
}
