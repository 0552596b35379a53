//! OCR fallback: screenshot in, loosely parsed product lines out.

mod screenshot_api;

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::ScraperError;
use crate::parse::{find_dollar_price, find_thc, has_letters, DollarMatch, ThcMatch};
use crate::raw::RawProductRecord;

pub use screenshot_api::ScreenshotApi;

const NAME_TRIM: &[char] = &[' ', '-', '•', '|', '\t'];

/// Image-to-text recognition. Implementations are treated as a black box.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Recognizes the text in a PNG image.
    async fn recognize(&self, png: &[u8]) -> Result<String, ScraperError>;
}

/// Runs the `tesseract` command-line tool, feeding the image on stdin.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    path: String,
}

impl TesseractCli {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TextRecognizer for TesseractCli {
    async fn recognize(&self, png: &[u8]) -> Result<String, ScraperError> {
        let mut child = tokio::process::Command::new(&self.path)
            .args(["stdin", "stdout"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ScraperError::Recognition(format!("could not run {}: {e}", self.path)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(png)
                .await
                .map_err(|e| ScraperError::Recognition(format!("writing image failed: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ScraperError::Recognition(e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ScraperError::Recognition(format!(
                "{} exited with {}: {}",
                self.path,
                output.status,
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Runs one recognition pass and parses the result.
///
/// # Errors
///
/// Returns [`ScraperError::Recognition`] when the recognizer fails.
pub async fn extract(
    recognizer: &dyn TextRecognizer,
    screenshot: &[u8],
) -> Result<Vec<RawProductRecord>, ScraperError> {
    let text = recognizer.recognize(screenshot).await?;
    let records = parse_ocr_text(&text);
    tracing::debug!(chars = text.len(), records = records.len(), "ocr pass complete");
    Ok(records)
}

/// Turns recognized text into product records.
///
/// A line holding a `$` price and some letters becomes one record named by
/// the rest of the line. A line holding only a price is paired with the
/// closest earlier text line that has not been used yet. Everything else is
/// ignored.
#[must_use]
pub fn parse_ocr_text(text: &str) -> Vec<RawProductRecord> {
    let mut records = Vec::new();
    let mut pending_name: Option<&str> = None;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        let Some(price) = find_dollar_price(line) else {
            if has_letters(line) {
                pending_name = Some(line);
            }
            continue;
        };

        let thc = find_thc(line);
        let name = strip_matches(line, &price, thc.as_ref());
        if has_letters(&name) {
            records.push(RawProductRecord {
                price: Some(price.amount),
                thc: thc.map(|t| t.value),
                ..RawProductRecord::named(name)
            });
            pending_name = None;
        } else if let Some(text_line) = pending_name.take() {
            let text_thc = find_thc(text_line);
            let name = match &text_thc {
                Some(t) => remove_range(text_line, t.range.clone()),
                None => tidy_name(text_line),
            };
            records.push(RawProductRecord {
                price: Some(price.amount),
                thc: thc.or(text_thc).map(|t| t.value),
                ..RawProductRecord::named(name)
            });
        }
    }
    records
}

fn strip_matches(line: &str, price: &DollarMatch, thc: Option<&ThcMatch>) -> String {
    let mut ranges = vec![price.range.clone()];
    if let Some(t) = thc {
        if t.range.end <= price.range.start || t.range.start >= price.range.end {
            ranges.push(t.range.clone());
        }
    }
    ranges.sort_by_key(|r| std::cmp::Reverse(r.start));
    let mut out = line.to_owned();
    for range in ranges {
        out.replace_range(range, " ");
    }
    tidy_name(&out)
}

fn remove_range(line: &str, range: std::ops::Range<usize>) -> String {
    let mut out = line.to_owned();
    out.replace_range(range, " ");
    tidy_name(&out)
}

fn tidy_name(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(NAME_TRIM)
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_line_becomes_product() {
        let records = parse_ocr_text("Blue Dream $45");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Blue Dream");
        assert_eq!(records[0].price.as_deref(), Some("45"));
        assert_eq!(records[0].thc, None);
        assert_eq!(records[0].category, None);
    }

    #[test]
    fn thc_on_same_line_is_captured_and_removed_from_name() {
        let records = parse_ocr_text("Sour Diesel 24.1% THC - $40.00");
        assert_eq!(records[0].name, "Sour Diesel");
        assert_eq!(records[0].thc.as_deref(), Some("24.1%"));
        assert_eq!(records[0].price.as_deref(), Some("40.00"));
    }

    #[test]
    fn price_only_line_pairs_with_preceding_text() {
        let text = "Menu\nGelato Cake\n$35\n$99\nPre-Roll | $8";
        let records = parse_ocr_text(text);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Gelato Cake");
        assert_eq!(records[0].price.as_deref(), Some("35"));
        assert_eq!(records[1].name, "Pre-Roll");
        assert_eq!(records[1].price.as_deref(), Some("8"));
    }

    #[test]
    fn lines_without_prices_are_ignored() {
        assert!(parse_ocr_text("Welcome!\nOpen 9am-9pm\n").is_empty());
    }

    struct FixedText(&'static str);

    #[async_trait]
    impl TextRecognizer for FixedText {
        async fn recognize(&self, _png: &[u8]) -> Result<String, ScraperError> {
            Ok(self.0.to_owned())
        }
    }

    #[tokio::test]
    async fn extract_runs_one_recognition_pass() {
        let records = extract(&FixedText("Blue Dream $45\n"), b"png").await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_recognizer_command_is_a_recognition_error() {
        let err = TesseractCli::new("false").recognize(b"png").await.unwrap_err();
        assert!(matches!(err, ScraperError::Recognition(_)));
    }

    #[tokio::test]
    async fn missing_recognizer_binary_is_a_recognition_error() {
        let err = TesseractCli::new("/nonexistent/menuscan-tesseract")
            .recognize(b"png")
            .await
            .unwrap_err();
        assert!(matches!(err, ScraperError::Recognition(_)));
    }
}
