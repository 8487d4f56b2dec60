//! Listing-page fetches for the live adapter.
//!
//! A fetch gets one overall budget. Each attempt is given a slice of it small
//! enough that every retry, plus the backoff between retries, still fits, so a
//! hung upstream is retried instead of eating the whole budget on attempt one.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, info_span, warn, Instrument};

const MIN_ATTEMPT_TIMEOUT: Duration = Duration::from_millis(250);

/// 5xx and 429 are worth another try; any other status is final.
pub fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

pub fn is_transient_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Pause before retry number `retry` (0-based): doubles each time, capped.
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Time spent sleeping if every retry is used.
    pub fn total_backoff(&self) -> Duration {
        (0..self.max_retries).map(|r| self.delay_before_retry(r)).sum()
    }

    /// Per-attempt request timeout such that all attempts and their backoff
    /// fit inside `budget`.
    pub fn attempt_timeout(&self, budget: Duration) -> Duration {
        (budget.saturating_sub(self.total_backoff()) / self.attempts()).max(MIN_ATTEMPT_TIMEOUT)
    }
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Wall-clock allowance for one fetch, retries included.
    pub fetch_budget: Duration,
    pub user_agent: Option<String>,
    pub accept_language: Option<String>,
    pub retry: RetryPolicy,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            fetch_budget: Duration::from_secs(30),
            user_agent: None,
            accept_language: Some("ko-KR,ko;q=0.9,en-US;q=0.5".to_string()),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub status: StatusCode,
    pub final_url: String,
    pub body: Vec<u8>,
}

impl FetchedResponse {
    /// Government boards occasionally serve stray non-UTF-8 bytes.
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed after {attempts} attempt(s): {source}")]
    Request {
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },
    #[error("http status {status} for {url}")]
    HttpStatus { status: u16, url: String },
    #[error("failed to build http client: {0}")]
    Client(String),
}

enum Attempt {
    Done(FetchedResponse),
    Transient(FetchError),
    Final(FetchError),
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    retry: RetryPolicy,
    attempt_timeout: Duration,
}

impl HttpFetcher {
    pub fn new(config: HttpClientConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
        );
        if let Some(lang) = &config.accept_language {
            let value = HeaderValue::from_str(lang).map_err(|e| FetchError::Client(e.to_string()))?;
            headers.insert(ACCEPT_LANGUAGE, value);
        }

        let mut builder = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .default_headers(headers);
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let client = builder.build().map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            retry: config.retry,
            attempt_timeout: config.retry.attempt_timeout(config.fetch_budget),
        })
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    /// GET `url`, retrying transient failures with capped exponential backoff.
    pub async fn fetch_bytes(&self, source_id: &str, url: &str) -> Result<FetchedResponse, FetchError> {
        let span = info_span!("http_fetch", source_id, url);
        async move {
            let mut retry = 0u32;
            loop {
                let attempts = retry + 1;
                match self.attempt(url, attempts).await {
                    Attempt::Done(response) => return Ok(response),
                    Attempt::Final(err) => return Err(err),
                    Attempt::Transient(err) if retry >= self.retry.max_retries => return Err(err),
                    Attempt::Transient(err) => {
                        let pause = self.retry.delay_before_retry(retry);
                        warn!(error = %err, attempt = attempts, pause_ms = pause.as_millis() as u64, "transient fetch failure");
                        tokio::time::sleep(pause).await;
                        retry += 1;
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn attempt(&self, url: &str, attempts: u32) -> Attempt {
        let request_error = |source: reqwest::Error| FetchError::Request {
            url: url.to_string(),
            attempts,
            source,
        };
        let response = match self.client.get(url).timeout(self.attempt_timeout).send().await {
            Ok(response) => response,
            Err(err) if is_transient_error(&err) => return Attempt::Transient(request_error(err)),
            Err(err) => return Attempt::Final(request_error(err)),
        };

        let status = response.status();
        let final_url = response.url().to_string();
        if !status.is_success() {
            let err = FetchError::HttpStatus {
                status: status.as_u16(),
                url: final_url,
            };
            return if is_transient_status(status) {
                Attempt::Transient(err)
            } else {
                Attempt::Final(err)
            };
        }

        match response.bytes().await {
            Ok(body) => {
                debug!(status = status.as_u16(), bytes = body.len(), attempts, "fetched");
                Attempt::Done(FetchedResponse {
                    status,
                    final_url,
                    body: body.to_vec(),
                })
            }
            Err(err) if is_transient_error(&err) => Attempt::Transient(request_error(err)),
            Err(err) => Attempt::Final(request_error(err)),
        }
    }
}
