//! Proxy HTTP Server
//!
//! All paths and methods go to a single fallback handler; routing is done by
//! the `RequestTranslator` so the check order stays in one place.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderName, HeaderValue, Method, Uri};
use axum::response::{IntoResponse, Response};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::application::ports::KlineSourcePort;
use crate::application::services::{InboundRequest, RequestTranslator, Route};
use crate::infrastructure::metrics::record_request;

/// Response header carrying the request ID.
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Create the proxy router.
pub fn create_router<S>(translator: Arc<RequestTranslator<S>>) -> Router
where
    S: KlineSourcePort + 'static,
{
    Router::new().fallback(dispatch::<S>).with_state(translator)
}

async fn dispatch<S>(
    State(translator): State<Arc<RequestTranslator<S>>>,
    method: Method,
    uri: Uri,
) -> Response
where
    S: KlineSourcePort + 'static,
{
    let request_id = Uuid::new_v4();
    let request = InboundRequest::new(method, uri.path(), uri.query().map(str::to_string));
    let route = Route::resolve(&request.path);
    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method,
        path = %request.path,
    );

    async move {
        let started = Instant::now();
        let mut response = translator.handle(&request).await.into_response();
        let elapsed = started.elapsed();
        let status = response.status().as_u16();

        record_request(route.as_str(), status, elapsed);
        tracing::debug!(
            route = route.as_str(),
            status,
            elapsed_ms = elapsed.as_millis(),
            "Request completed"
        );

        if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        response
    }
    .instrument(span)
    .await
}

// =============================================================================
// Server
// =============================================================================

/// Proxy HTTP server.
pub struct ProxyServer<S: KlineSourcePort + 'static> {
    port: u16,
    translator: Arc<RequestTranslator<S>>,
    cancel: CancellationToken,
}

impl<S: KlineSourcePort + 'static> ProxyServer<S> {
    /// Create a new proxy server.
    #[must_use]
    pub const fn new(
        port: u16,
        translator: Arc<RequestTranslator<S>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            port,
            translator,
            cancel,
        }
    }

    /// Run the server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `ServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "Kline proxy listening");

        axum::serve(listener, create_router(self.translator))
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| ServerError::ServerFailed(e.to_string()))?;

        tracing::info!("Kline proxy stopped");
        Ok(())
    }
}

/// HTTP server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}
