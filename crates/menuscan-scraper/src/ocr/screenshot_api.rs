use reqwest::Client;

use crate::error::ScraperError;

/// Remote screenshot service used when no local browser can render the page.
///
/// Speaks the `screenshotmachine` query API: `key`, `url`, `dimension`,
/// `format` and `cacheLimit` as query parameters, PNG bytes back.
#[derive(Debug, Clone)]
pub struct ScreenshotApi {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl ScreenshotApi {
    #[must_use]
    pub fn new(client: Client, endpoint: &str, api_key: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_owned(),
            api_key: api_key.to_owned(),
        }
    }

    /// Fetches a PNG of `target_url`.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::UnexpectedStatus`] on a non-2xx reply
    /// - [`ScraperError::CaptureEmpty`] when the reply is not an image or is empty
    /// - [`ScraperError::Network`] on transport failure
    pub async fn capture(&self, target_url: &str) -> Result<Vec<u8>, ScraperError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", self.api_key.as_str()),
                ("url", target_url),
                ("dimension", "1280x720"),
                ("format", "png"),
                ("cacheLimit", "0"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: self.endpoint.clone(),
            });
        }

        let is_image = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("image"));
        if !is_image {
            return Err(ScraperError::CaptureEmpty {
                url: target_url.to_owned(),
            });
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(ScraperError::CaptureEmpty {
                url: target_url.to_owned(),
            });
        }
        tracing::debug!(url = target_url, bytes = bytes.len(), "screenshot api capture");
        Ok(bytes.to_vec())
    }
}
