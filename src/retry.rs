//! Transport-level retry with exponential backoff.
//!
//! Every outbound HTTP call (feed fetch, text generation) goes through
//! [`send_with_retry`]. Retryable: configured status codes, timeouts, and connection
//! failures. Anything else fails on the first attempt.

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};

use crate::config::NetworkConfig;
use crate::error::{Result, StyleError};

/// Upper bound on a single backoff sleep.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub attempts: usize,
    pub exp_base: f64,
    pub initial_delay: Duration,
    pub retry_status_codes: Vec<u16>,
}

impl RetryPolicy {
    pub fn from_config(config: &NetworkConfig) -> Self {
        Self {
            attempts: config.retry_attempts.max(1),
            exp_base: config.retry_base,
            initial_delay: Duration::from_secs_f64(config.initial_delay_secs.max(0.0)),
            retry_status_codes: config.retry_status_codes.clone(),
        }
    }

    /// No retries at all.
    pub fn none() -> Self {
        Self {
            attempts: 1,
            exp_base: 1.0,
            initial_delay: Duration::ZERO,
            retry_status_codes: Vec::new(),
        }
    }

    /// Sleep before retry number `retry` (1-based): `initial_delay * base^(retry - 1)`.
    pub fn backoff(&self, retry: usize) -> Duration {
        let exponent = retry.saturating_sub(1).min(32) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.exp_base.powi(exponent);
        if !secs.is_finite() || secs >= MAX_BACKOFF.as_secs_f64() {
            MAX_BACKOFF
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    pub fn should_retry_status(&self, status: StatusCode) -> bool {
        self.retry_status_codes.contains(&status.as_u16())
    }
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

/// Send a request built by `make_request`, retrying per `policy`.
///
/// Returns the first successful response. A non-success status that is not retryable,
/// or that persists past the last attempt, becomes [`StyleError::Network`].
pub async fn send_with_retry<F>(policy: &RetryPolicy, what: &str, make_request: F) -> Result<Response>
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt = 1usize;
    loop {
        match make_request().send().await {
            Ok(resp) if resp.status().is_success() => return Ok(resp),
            Ok(resp) => {
                let status = resp.status();
                if policy.should_retry_status(status) && attempt < policy.attempts {
                    let delay = policy.backoff(attempt);
                    tracing::warn!(%status, attempt, delay_ms = delay.as_millis() as u64, "{what} failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    continue;
                }
                let body = resp
                    .text()
                    .await
                    .unwrap_or_else(|_| "<body unavailable>".to_string());
                return Err(StyleError::Network(format!(
                    "{what} failed ({status}) after {attempt} attempt(s): {}",
                    truncate_for_log(&body, 300)
                )));
            }
            Err(err) => {
                if is_retryable_error(&err) && attempt < policy.attempts {
                    let delay = policy.backoff(attempt);
                    tracing::warn!(error = %err, attempt, delay_ms = delay.as_millis() as u64, "{what} failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    continue;
                }
                return Err(StyleError::Network(format!(
                    "{what} failed after {attempt} attempt(s): {err}"
                )));
            }
        }
    }
}

fn truncate_for_log(text: &str, max_chars: usize) -> String {
    let head = crate::text::truncate_chars(text, max_chars);
    if head.len() < text.len() {
        format!("{head}...")
    } else {
        head.to_string()
    }
}
