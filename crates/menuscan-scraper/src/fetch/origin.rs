//! URL validation and host extraction for menu URLs.

use crate::error::ScraperError;

/// Parses a menu URL, rejecting anything that is not absolute `http(s)`.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidUrl`] when the URL is empty, relative, or
/// uses another scheme.
pub fn parse_menu_url(raw: &str) -> Result<reqwest::Url, ScraperError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ScraperError::InvalidUrl {
            url: raw.to_owned(),
            reason: "URL is empty".to_owned(),
        });
    }
    let url = reqwest::Url::parse(trimmed).map_err(|e| ScraperError::InvalidUrl {
        url: raw.to_owned(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ScraperError::InvalidUrl {
            url: raw.to_owned(),
            reason: format!("unsupported scheme \"{other}\""),
        }),
    }
}

/// Extracts the lower-cased hostname from a URL for error messages and
/// engine hints. Falls back to the input when parsing fails.
#[must_use]
pub fn extract_domain(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
        .unwrap_or_else(|| url.to_owned())
}

/// Removes the query string and fragment, keeping scheme, host and path.
#[must_use]
pub fn strip_query(url: &str) -> String {
    url.split(['?', '#']).next().unwrap_or(url).to_owned()
}
