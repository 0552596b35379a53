use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("parse error for {context}: {reason}")]
    Parse { context: String, reason: String },

    #[error("{stage} timed out after {secs}s")]
    Timeout { stage: String, secs: u64 },

    #[error("no capture produced for {url}")]
    CaptureEmpty { url: String },

    #[error("text recognition failed: {0}")]
    Recognition(String),

    #[error("browser error: {0}")]
    Browser(String),

    #[error("browser provisioning failed: {0}")]
    Provisioning(String),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("rate limited by {domain} (retry after {retry_after_secs}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: u64,
    },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl From<chromiumoxide::error::CdpError> for ScraperError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        ScraperError::Browser(err.to_string())
    }
}
