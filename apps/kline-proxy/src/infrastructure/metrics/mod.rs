//! Prometheus Metrics Module
//!
//! Exposes application metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Requests**: Inbound request counts and latency by route
//! - **Upstream**: Outbound call counts by outcome and latency
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the health server port.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if the recorder cannot be installed.
#[allow(clippy::expect_used)]
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "kline_proxy_requests_total",
        "Total inbound requests by route and response status"
    );
    describe_histogram!(
        "kline_proxy_request_duration_seconds",
        "Time to answer an inbound request"
    );
    describe_counter!(
        "kline_proxy_upstream_requests_total",
        "Total upstream kline requests by outcome"
    );
    describe_histogram!(
        "kline_proxy_upstream_latency_seconds",
        "Upstream kline request latency"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Result of an upstream call, for metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamOutcome {
    /// 2xx reply.
    Success,
    /// Non-2xx reply.
    HttpError,
    /// No reply (connect failure, timeout, body read failure).
    TransportError,
}

impl UpstreamOutcome {
    /// Classify an upstream status code.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        if status >= 200 && status < 300 {
            Self::Success
        } else {
            Self::HttpError
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::HttpError => "http_error",
            Self::TransportError => "transport_error",
        }
    }
}

/// Record an answered inbound request.
pub fn record_request(route: &'static str, status: u16, duration: Duration) {
    counter!(
        "kline_proxy_requests_total",
        "route" => route,
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "kline_proxy_request_duration_seconds",
        "route" => route
    )
    .record(duration.as_secs_f64());
}

/// Record a completed or failed upstream call.
pub fn record_upstream(outcome: UpstreamOutcome, duration: Duration) {
    counter!(
        "kline_proxy_upstream_requests_total",
        "outcome" => outcome.as_str()
    )
    .increment(1);
    histogram!("kline_proxy_upstream_latency_seconds").record(duration.as_secs_f64());
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_outcome_from_status() {
        assert_eq!(UpstreamOutcome::from_status(200), UpstreamOutcome::Success);
        assert_eq!(UpstreamOutcome::from_status(299), UpstreamOutcome::Success);
        assert_eq!(UpstreamOutcome::from_status(418), UpstreamOutcome::HttpError);
        assert_eq!(UpstreamOutcome::from_status(500), UpstreamOutcome::HttpError);
    }

    #[test]
    fn upstream_outcome_as_str() {
        assert_eq!(UpstreamOutcome::Success.as_str(), "success");
        assert_eq!(UpstreamOutcome::HttpError.as_str(), "http_error");
        assert_eq!(UpstreamOutcome::TransportError.as_str(), "transport_error");
    }

    #[test]
    fn records_labelled_request_and_upstream_metrics() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            record_request("klines", 200, Duration::from_millis(5));
            record_request("klines", 200, Duration::from_millis(7));
            record_upstream(UpstreamOutcome::HttpError, Duration::from_millis(3));
        });

        let rendered = handle.render();
        let request_line = rendered
            .lines()
            .find(|line| line.starts_with("kline_proxy_requests_total{"))
            .unwrap();
        assert!(request_line.contains(r#"route="klines""#));
        assert!(request_line.contains(r#"status="200""#));
        assert!(request_line.ends_with(" 2"));

        assert!(
            rendered.contains(r#"kline_proxy_upstream_requests_total{outcome="http_error"} 1"#)
        );
        assert!(rendered.contains("kline_proxy_request_duration_seconds"));
        assert!(rendered.contains("kline_proxy_upstream_latency_seconds"));
    }
}
