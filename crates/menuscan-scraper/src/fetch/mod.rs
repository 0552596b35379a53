//! Static fetcher: one GET without executing scripts.

mod origin;

use std::time::Duration;

use reqwest::Client;

use crate::error::ScraperError;
use crate::rate_limit::retry_with_backoff;

pub use origin::{extract_domain, parse_menu_url, strip_query};

/// A fetched document. `body` is HTML or JSON depending on `content_type`.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub final_url: String,
    pub content_type: String,
    pub body: String,
}

impl FetchedPage {
    /// `true` when the server labelled the body JSON, or the body looks like a
    /// bare JSON document despite the label.
    #[must_use]
    pub fn is_json(&self) -> bool {
        if self.content_type.contains("json") {
            return true;
        }
        let trimmed = self.body.trim_start();
        trimmed.starts_with('{') || trimmed.starts_with('[')
    }
}

/// HTTP client for menu pages.
///
/// 429 becomes [`ScraperError::RateLimited`], any other non-2xx becomes
/// [`ScraperError::UnexpectedStatus`]. Transient failures are retried with
/// exponential backoff up to `max_retries` extra attempts.
pub struct StaticFetcher {
    client: Client,
    max_retries: u32,
    backoff_base_secs: u64,
}

impl StaticFetcher {
    /// Builds a fetcher with the given timeout, `User-Agent` and retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Network`] if the `reqwest::Client` cannot be
    /// constructed.
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            max_retries,
            backoff_base_secs,
        })
    }

    /// The underlying client, shared with the screenshot API fallback.
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Fetches `url` and returns the body as text.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::InvalidUrl`]: the URL is not absolute `http(s)`.
    /// - [`ScraperError::RateLimited`]: HTTP 429 after all retries.
    /// - [`ScraperError::UnexpectedStatus`]: any other non-2xx status.
    /// - [`ScraperError::Network`]: connection or body read failure.
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, ScraperError> {
        let parsed = parse_menu_url(url)?;
        let url = parsed.to_string();

        retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            let url = url.clone();
            async move {
                let response = self
                    .client
                    .get(&url)
                    .header(
                        reqwest::header::ACCEPT,
                        "text/html,application/xhtml+xml,application/json;q=0.9,*/*;q=0.8",
                    )
                    .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
                    .send()
                    .await?;
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(60);
                    return Err(ScraperError::RateLimited {
                        domain: extract_domain(&url),
                        retry_after_secs,
                    });
                }

                if !status.is_success() {
                    return Err(ScraperError::UnexpectedStatus {
                        status: status.as_u16(),
                        url,
                    });
                }

                let final_url = response.url().to_string();
                let content_type = response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_ascii_lowercase();
                let body = response.text().await?;

                tracing::debug!(url, final_url, bytes = body.len(), "static fetch complete");
                Ok(FetchedPage {
                    final_url,
                    content_type,
                    body,
                })
            }
        })
        .await
    }
}

#[cfg(test)]
#[path = "../fetch_test.rs"]
mod tests;
