//! HTTP client for the upstream klines endpoint.

use std::error::Error as _;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Url};

use crate::application::ports::{KlineSourcePort, UpstreamFetchError, UpstreamReply};
use crate::domain::kline::UpstreamQuery;
use crate::infrastructure::config::UpstreamSettings;
use crate::infrastructure::metrics::{UpstreamOutcome, record_upstream};

/// Path of the klines endpoint, relative to the base URL.
pub const KLINES_PATH: &str = "/api/v3/klines";

/// Single-shot HTTP client for `GET /api/v3/klines`.
#[derive(Debug, Clone)]
pub struct BinanceKlineClient {
    client: Client,
    endpoint: Url,
    timeout: Duration,
    source: String,
}

impl BinanceKlineClient {
    /// Create a client from settings.
    ///
    /// # Errors
    ///
    /// Returns `UpstreamFetchError::Transport` if the TLS backend cannot be
    /// initialized or the endpoint URL cannot be built.
    pub fn new(settings: &UpstreamSettings) -> Result<Self, UpstreamFetchError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| UpstreamFetchError::Transport {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint: klines_endpoint(&settings.base_url)?,
            timeout: settings.timeout,
            source: settings.source.clone(),
        })
    }

    /// Full URL of the klines endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn map_error(&self, error: &reqwest::Error) -> UpstreamFetchError {
        if error.is_timeout() {
            UpstreamFetchError::Timeout {
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }
        } else {
            UpstreamFetchError::Transport {
                message: describe(error),
            }
        }
    }
}

#[async_trait]
impl KlineSourcePort for BinanceKlineClient {
    fn source(&self) -> &str {
        &self.source
    }

    async fn fetch_klines(
        &self,
        query: &UpstreamQuery,
    ) -> Result<UpstreamReply, UpstreamFetchError> {
        let started = Instant::now();

        let result = async {
            let response = self
                .client
                .get(self.endpoint.clone())
                .query(&query.pairs())
                .send()
                .await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>(UpstreamReply { status, body })
        }
        .await;

        match result {
            Ok(reply) => {
                record_upstream(UpstreamOutcome::from_status(reply.status), started.elapsed());
                Ok(reply)
            }
            Err(e) => {
                record_upstream(UpstreamOutcome::TransportError, started.elapsed());
                Err(self.map_error(&e))
            }
        }
    }
}

/// Append the klines path to a base URL, keeping any path prefix it has.
fn klines_endpoint(base_url: &Url) -> Result<Url, UpstreamFetchError> {
    let prefix = base_url.path().trim_end_matches('/');
    let mut endpoint = base_url.clone();
    endpoint.set_path(&format!("{prefix}{KLINES_PATH}"));
    endpoint.set_query(None);

    if endpoint.cannot_be_a_base() {
        return Err(UpstreamFetchError::Transport {
            message: format!("invalid upstream base URL: {base_url}"),
        });
    }
    Ok(endpoint)
}

/// Flatten a reqwest error and its sources into one line.
fn describe(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
