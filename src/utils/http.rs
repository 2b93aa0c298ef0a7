// src/utils/http.rs

//! HTTP client utilities.
//!
//! All upstream calls go through [`fetch_text`], which owns the
//! rate-limit discipline: HTTP 429 is retried with quadratic backoff up
//! to a hard attempt cap, any other non-success status fails the call
//! immediately, and transport errors propagate to the caller.

use std::time::Duration;

use reqwest::StatusCode;

use crate::error::{AppError, Result};
use crate::models::ApiConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_client(config: &ApiConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Fetch a URL as text, retrying on rate limiting.
///
/// The backoff delay is `backoff_base_ms * n²` for the n-th consecutive
/// 429, so a persistently throttled upstream is waited out politely but
/// the loop always terminates within `max_attempts`.
pub async fn fetch_text(client: &reqwest::Client, url: &str, config: &ApiConfig) -> Result<String> {
    let mut rate_limit_hits: u64 = 0;

    for _ in 0..config.max_attempts {
        let response = client.get(url).send().await?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            rate_limit_hits += 1;
            let backoff_ms = config.backoff_base_ms * rate_limit_hits * rate_limit_hits;
            log::info!("Rate limited, backing off for {}ms, URL: {}", backoff_ms, url);
            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            continue;
        }

        if !response.status().is_success() {
            return Err(AppError::upstream(response.status().as_u16(), url));
        }

        return Ok(response.text().await?);
    }

    Err(AppError::rate_limited(url))
}
