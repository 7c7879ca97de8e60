//! CME Group outright margin feed.
//!
//! Downloads the public `OUTRIGHT.csv` over HTTP with a request timeout and
//! retries transient failures (connect errors, timeouts, 429, 5xx) with
//! exponential backoff. Any other HTTP status fails immediately.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::provider::{parse_snapshot, FetchError, MarginFeed};
use crate::config::FeedConfig;
use crate::table::MarginTable;

/// CME outright margin feed.
pub struct CmeMarginFeed {
    client: reqwest::blocking::Client,
    url: String,
    max_retries: u32,
    base_delay: Duration,
}

impl CmeMarginFeed {
    pub fn new(config: &FeedConfig) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            max_retries: config.max_retries,
            base_delay: config.retry_base_delay(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Backoff before retry `attempt` (1-based).
    fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }

    /// One GET; returns the body text or a classified error.
    fn get_once(&self) -> Result<String, FetchError> {
        let resp = self.client.get(&self.url).send().map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                FetchError::NetworkUnreachable(e.to_string())
            } else {
                FetchError::ResponseFormat(format!("request failed: {e}"))
            }
        })?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(FetchError::RateLimited {
                retry_after_secs: retry_after,
            });
        }
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }

        let bytes = resp
            .bytes()
            .map_err(|e| FetchError::NetworkUnreachable(format!("reading body: {e}")))?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| FetchError::ResponseFormat(format!("body is not UTF-8: {e}")))
    }

    fn fetch_with_retry(&self) -> Result<String, FetchError> {
        let mut attempt = 0;
        loop {
            if attempt > 0 {
                let delay = self.backoff(attempt);
                debug!(attempt, delay_ms = delay.as_millis() as u64, "backing off");
                std::thread::sleep(delay);
            }

            match self.get_once() {
                Ok(body) => return Ok(body),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    warn!(url = %self.url, attempt, error = %e, "margin feed request failed, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl MarginFeed for CmeMarginFeed {
    fn name(&self) -> &str {
        "cme_outright"
    }

    fn fetch(&self) -> Result<MarginTable, FetchError> {
        let body = self.fetch_with_retry()?;
        let table = parse_snapshot(&body, Utc::now())?;
        info!(url = %self.url, rows = table.len(), "fetched margin snapshot");
        Ok(table)
    }
}
