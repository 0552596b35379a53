//! Headless-browser capture.
//!
//! A [`CaptureEngine`] opens isolated [`CaptureSession`]s. While a session is
//! open, a listener task forwards matching network responses over an `mpsc`
//! channel; the session exposes the receiving end as a [`ResponseStream`].

mod age_gate;
mod chromium;
mod provision;

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::error::ScraperError;

pub use chromium::{ChromiumEngine, ChromiumSettings};
pub use provision::{is_missing_browser_error, BrowserProvisioner, MISSING_BROWSER_WARNING};

/// One network response observed while a session was open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedResponse {
    pub endpoint_url: String,
    pub http_status: u16,
    pub body: String,
    /// Position in capture order, starting at 0 for each session.
    pub captured_at_sequence: u64,
}

impl CapturedResponse {
    /// The body parsed as JSON.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the body is not JSON.
    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }

    #[must_use]
    pub fn summary(&self, json_ok: bool) -> CapturedEndpoint {
        CapturedEndpoint {
            url: self.endpoint_url.clone(),
            status: self.http_status,
            body_len: self.body.len(),
            json_ok,
        }
    }
}

/// Diagnostic view of a captured response without its body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapturedEndpoint {
    pub url: String,
    pub status: u16,
    pub body_len: usize,
    /// Whether the body parsed as JSON.
    pub json_ok: bool,
}

/// Producer half of the capture channel. Assigns capture sequence numbers.
#[derive(Debug)]
pub struct ResponseSender {
    tx: mpsc::UnboundedSender<CapturedResponse>,
    next_sequence: u64,
}

impl ResponseSender {
    /// Forwards a response. Returns `false` once the stream has been dropped.
    pub fn push(&mut self, endpoint_url: String, http_status: u16, body: String) -> bool {
        let response = CapturedResponse {
            endpoint_url,
            http_status,
            body,
            captured_at_sequence: self.next_sequence,
        };
        self.next_sequence += 1;
        self.tx.send(response).is_ok()
    }
}

/// Lazily growing, capture-ordered sequence of responses. Finite once the
/// session's listener stops.
#[derive(Debug)]
pub struct ResponseStream {
    rx: mpsc::UnboundedReceiver<CapturedResponse>,
}

impl ResponseStream {
    #[must_use]
    pub fn channel() -> (ResponseSender, ResponseStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            ResponseSender {
                tx,
                next_sequence: 0,
            },
            ResponseStream { rx },
        )
    }

    /// Everything already captured, without waiting.
    pub fn drain_ready(&mut self) -> Vec<CapturedResponse> {
        let mut out = Vec::new();
        while let Ok(response) = self.rx.try_recv() {
            out.push(response);
        }
        out
    }

    /// Collects responses until none arrives for `quiet`, `max_wait` has
    /// elapsed, or the stream ends.
    pub async fn settle(&mut self, quiet: Duration, max_wait: Duration) -> Vec<CapturedResponse> {
        let deadline = Instant::now() + max_wait;
        let mut out = self.drain_ready();
        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let wait = quiet.min(deadline - now);
            match tokio::time::timeout(wait, self.rx.recv()).await {
                Ok(Some(response)) => out.push(response),
                Ok(None) | Err(_) => break,
            }
        }
        out
    }
}

impl futures::Stream for ResponseStream {
    type Item = CapturedResponse;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// An open browser session on one target. Dropping a session kills the
/// browser; [`CaptureSession::close`] shuts it down gracefully.
#[async_trait]
pub trait CaptureSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), ScraperError>;

    async fn rendered_html(&mut self) -> Result<String, ScraperError>;

    /// Full-page PNG screenshot.
    async fn screenshot(&mut self) -> Result<Vec<u8>, ScraperError>;

    /// Scrolls down `steps` viewport-heights to trigger lazy loading.
    async fn scroll(&mut self, steps: u32) -> Result<(), ScraperError>;

    async fn current_url(&mut self) -> Option<String>;

    fn captured_responses(&mut self) -> &mut ResponseStream;

    /// `true` once the session's wall-clock deadline has passed.
    fn is_expired(&self) -> bool;

    /// Closes the browser. Safe to call more than once.
    async fn close(&mut self) -> Result<(), ScraperError>;
}

#[async_trait]
pub trait CaptureEngine: Send + Sync {
    /// Launches an isolated browser, seeds age-gate storage, navigates to
    /// `url` with the response listener already attached, and tries to
    /// dismiss any age gate.
    async fn open_session(&self, url: &str) -> Result<Box<dyn CaptureSession>, ScraperError>;
}

/// Decides what happens to a freshly launched session after its first
/// navigation. `Ok(true)` means the page loaded; `Ok(false)` means the session
/// deadline passed mid-load and the session is still handed out so its
/// captured responses can be drained. Any other failure is returned.
pub(crate) fn keep_after_initial_navigation(
    result: Result<(), ScraperError>,
) -> Result<bool, ScraperError> {
    match result {
        Ok(()) => Ok(true),
        Err(ScraperError::Timeout { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}

const CAPTURE_URL_PATTERNS: &[&str] = &[
    "dutchie",
    "graphql",
    "iheartjane",
    "jane.menu",
    "weedmaps",
    "dispenseapp",
    "dispense.io",
    "tymberapp",
    "/api/",
    "/menu/",
    "/products",
    "/catalog",
];

/// Whether a response should be forwarded to the capture stream.
///
/// GraphQL endpoints are kept regardless of content type. Other responses
/// must be JSON, or plain text from a known menu API.
#[must_use]
pub fn should_capture(url: &str, mime_type: &str) -> bool {
    let url_lower = url.to_ascii_lowercase();
    if url_lower.contains("graphql") || url_lower.contains("operationname") {
        return true;
    }
    let mime = mime_type.to_ascii_lowercase();
    if mime.contains("json") || mime.contains("graphql") {
        return true;
    }
    mime.starts_with("text/plain") && CAPTURE_URL_PATTERNS.iter().any(|p| url_lower.contains(p))
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    #[test]
    fn capture_filter_keeps_graphql_and_json() {
        assert!(should_capture(
            "https://dutchie.com/graphql?operationName=FilteredProducts",
            "text/html"
        ));
        assert!(should_capture("https://api.example.com/v1/items", "application/json"));
        assert!(should_capture("https://example.com/api/menu", "text/plain"));
        assert!(!should_capture("https://example.com/logo.png", "image/png"));
        assert!(!should_capture("https://example.com/blog", "text/plain"));
    }

    #[test]
    fn initial_navigation_timeout_keeps_the_session() {
        assert!(keep_after_initial_navigation(Ok(())).unwrap());
        let timed_out = Err(ScraperError::Timeout {
            stage: "browser session".to_owned(),
            secs: 45,
        });
        assert!(!keep_after_initial_navigation(timed_out).unwrap());
        let failed = Err(ScraperError::Navigation {
            url: "https://example.com".to_owned(),
            reason: "net::ERR_NAME_NOT_RESOLVED".to_owned(),
        });
        assert!(matches!(
            keep_after_initial_navigation(failed),
            Err(ScraperError::Navigation { .. })
        ));
    }

    #[test]
    fn sender_assigns_sequence_in_capture_order() {
        let (mut tx, mut stream) = ResponseStream::channel();
        assert!(tx.push("a".into(), 200, "{}".into()));
        assert!(tx.push("b".into(), 200, "{}".into()));
        let got = stream.drain_ready();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].captured_at_sequence, 0);
        assert_eq!(got[1].endpoint_url, "b");
        assert_eq!(got[1].captured_at_sequence, 1);
    }

    #[test]
    fn summary_reports_json_readability() {
        let (mut tx, mut stream) = ResponseStream::channel();
        tx.push("a".into(), 200, "{\"data\":{}}".into());
        tx.push("b".into(), 200, "<html>".into());
        let got = stream.drain_ready();
        assert!(got[0].json().is_ok());
        assert!(got[1].json().is_err());
        let endpoint = got[1].summary(false);
        assert_eq!(endpoint.url, "b");
        assert_eq!(endpoint.body_len, 6);
        assert!(!endpoint.json_ok);
    }

    #[test]
    fn push_reports_dropped_stream() {
        let (mut tx, stream) = ResponseStream::channel();
        drop(stream);
        assert!(!tx.push("a".into(), 200, "{}".into()));
    }

    #[tokio::test]
    async fn settle_returns_after_quiet_period() {
        let (mut tx, mut stream) = ResponseStream::channel();
        tx.push("a".into(), 200, "{}".into());
        let got = stream
            .settle(Duration::from_millis(20), Duration::from_secs(5))
            .await;
        assert_eq!(got.len(), 1);
        drop(tx);
    }

    #[tokio::test]
    async fn stream_ends_when_sender_is_dropped() {
        let (mut tx, stream) = ResponseStream::channel();
        tx.push("a".into(), 200, "{}".into());
        drop(tx);
        let all: Vec<CapturedResponse> = stream.collect().await;
        assert_eq!(all.len(), 1);
    }
}
