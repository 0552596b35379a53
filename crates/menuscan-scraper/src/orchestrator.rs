//! Strategy orchestration: structured data, then the GraphQL crawl, then OCR.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use menuscan_core::{AppConfig, CanonicalRow, ScanRequest};
use serde::Serialize;
use thiserror::Error;

use crate::browser::{CaptureEngine, CapturedEndpoint, ChromiumEngine, ChromiumSettings};
use crate::crawler::{self, CategoryPages, CrawlSettings};
use crate::engine::{detect_engine, Engine};
use crate::error::ScraperError;
use crate::fetch::StaticFetcher;
use crate::normalize::{dedup_rows, normalize_all};
use crate::ocr::{self, ScreenshotApi, TesseractCli, TextRecognizer};
use crate::raw::RawProductRecord;
use crate::structured;

/// Scroll steps before the OCR screenshot, to trigger lazy-loaded cards.
const OCR_SCROLL_STEPS: u32 = 3;

/// The stage that produced a set of rows. Doubles as the `Source` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    #[serde(rename = "structured-data")]
    StructuredData,
    #[serde(rename = "graphql")]
    GraphQl,
    #[serde(rename = "ocr")]
    Ocr,
}

impl Stage {
    #[must_use]
    pub fn as_tag(self) -> &'static str {
        match self {
            Stage::StructuredData => "structured-data",
            Stage::GraphQl => "graphql",
            Stage::Ocr => "ocr",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// What one stage of the fallback chain returned.
#[derive(Debug)]
pub enum StageOutput {
    StructuredData(Vec<RawProductRecord>),
    GraphQl(Vec<RawProductRecord>),
    Ocr(Vec<RawProductRecord>),
}

impl StageOutput {
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            StageOutput::StructuredData(_) => Stage::StructuredData,
            StageOutput::GraphQl(_) => Stage::GraphQl,
            StageOutput::Ocr(_) => Stage::Ocr,
        }
    }

    #[must_use]
    pub fn records(&self) -> &[RawProductRecord] {
        match self {
            StageOutput::StructuredData(r) | StageOutput::GraphQl(r) | StageOutput::Ocr(r) => r,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    pub rows: usize,
    pub categories: Vec<String>,
    pub pages_per_category: Vec<CategoryPages>,
    pub note: String,
}

impl StageReport {
    fn new(stage: Stage) -> Self {
        Self {
            stage,
            rows: 0,
            categories: Vec::new(),
            pages_per_category: Vec::new(),
            note: String::new(),
        }
    }

    fn note(&mut self, text: impl Into<String>) {
        let text = text.into();
        if self.note.is_empty() {
            self.note = text;
        } else {
            self.note.push_str("; ");
            self.note.push_str(&text);
        }
    }
}

/// Per-scan debugging detail. Only returned for requests with debug enabled.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    pub stages: Vec<StageReport>,
    pub initial_engine: Option<Engine>,
    pub rendered_engine: Option<Engine>,
    pub final_url: Option<String>,
    pub captured_endpoints: Vec<CapturedEndpoint>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub rows: Vec<CanonicalRow>,
    pub diagnostics: Option<Diagnostics>,
}

/// Shared cancellation switch, checked between stages.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Error)]
#[error("scan of {url} was cancelled")]
pub struct ScanCancelled {
    pub url: String,
}

/// Runs the fallback chain for one request at a time.
pub struct Scanner {
    fetcher: StaticFetcher,
    capture: Option<Arc<dyn CaptureEngine>>,
    recognizer: Arc<dyn TextRecognizer>,
    screenshot_api: Option<ScreenshotApi>,
    crawl: CrawlSettings,
}

impl Scanner {
    /// A scanner without a browser; the GraphQL stage is skipped until
    /// [`Scanner::with_capture_engine`] supplies one.
    #[must_use]
    pub fn new(fetcher: StaticFetcher, recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self {
            fetcher,
            capture: None,
            recognizer,
            screenshot_api: None,
            crawl: CrawlSettings::default(),
        }
    }

    /// Wires the Chromium engine, the `tesseract` recognizer and, when an API
    /// key is configured, the screenshot API.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Network`] if the HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, ScraperError> {
        let fetcher = StaticFetcher::new(
            config.request_timeout_secs,
            &config.user_agent,
            config.max_retries,
            config.retry_backoff_base_secs,
        )?;
        let screenshot_api = config
            .screenshot_api_key
            .as_deref()
            .map(|key| ScreenshotApi::new(fetcher.client().clone(), &config.screenshot_api_url, key));
        let recognizer = Arc::new(TesseractCli::new(config.tesseract_path.clone()));

        let mut scanner = Self::new(fetcher, recognizer)
            .with_capture_engine(Arc::new(ChromiumEngine::new(ChromiumSettings::from_config(
                config,
            ))))
            .with_crawl_settings(CrawlSettings {
                max_pages: config.max_pages,
                ..CrawlSettings::default()
            });
        scanner.screenshot_api = screenshot_api;
        Ok(scanner)
    }

    #[must_use]
    pub fn with_capture_engine(mut self, engine: Arc<dyn CaptureEngine>) -> Self {
        self.capture = Some(engine);
        self
    }

    #[must_use]
    pub fn with_screenshot_api(mut self, api: ScreenshotApi) -> Self {
        self.screenshot_api = Some(api);
        self
    }

    #[must_use]
    pub fn with_crawl_settings(mut self, settings: CrawlSettings) -> Self {
        self.crawl = settings;
        self
    }

    /// Scans one menu URL. Stage failures become diagnostic notes; an empty
    /// result means every stage came back empty.
    pub async fn scan(&self, req: &ScanRequest) -> ScanOutcome {
        self.scan_with_cancel(req, &CancelFlag::new())
            .await
            .unwrap_or_default()
    }

    /// Like [`Scanner::scan`], checking `cancel` before each stage and before
    /// returning.
    ///
    /// # Errors
    ///
    /// Returns [`ScanCancelled`] once the flag is set; rows found so far are
    /// discarded.
    pub async fn scan_with_cancel(
        &self,
        req: &ScanRequest,
        cancel: &CancelFlag,
    ) -> Result<ScanOutcome, ScanCancelled> {
        let checkpoint = || {
            if cancel.is_cancelled() {
                tracing::info!(url = %req.url, "scan cancelled");
                Err(ScanCancelled {
                    url: req.url.clone(),
                })
            } else {
                Ok(())
            }
        };
        let mut diag = Diagnostics::default();

        if req.url.trim().is_empty() {
            diag.notes.push("no URL given".to_owned());
            return Ok(finish(req, Vec::new(), diag));
        }

        checkpoint()?;
        let (structured, initial_engine) = self.structured_stage(req, &mut diag).await;
        let structured_rows = finalize(req, &structured, initial_engine, &mut diag);
        if !structured_rows.is_empty() && !req.force_browser {
            checkpoint()?;
            return Ok(finish(req, structured_rows, diag));
        }

        checkpoint()?;
        if req.browser_mode_enabled {
            if let Some(capture) = &self.capture {
                let crawled = self.graphql_stage(capture.as_ref(), req, &mut diag).await;
                let engine = diag.rendered_engine.unwrap_or(initial_engine);
                let rows = finalize(req, &crawled, engine, &mut diag);
                if !rows.is_empty() {
                    checkpoint()?;
                    return Ok(finish(req, rows, diag));
                }
            } else {
                diag.notes
                    .push("browser mode is on but no capture engine is available".to_owned());
            }
        } else if initial_engine.is_script_rendered() {
            diag.notes.push(format!(
                "{initial_engine} menus render client-side; enable browser mode for full results"
            ));
        }

        if !structured_rows.is_empty() {
            checkpoint()?;
            return Ok(finish(req, structured_rows, diag));
        }

        checkpoint()?;
        let recognized = self.ocr_stage(req, &mut diag).await;
        let engine = diag.rendered_engine.unwrap_or(initial_engine);
        let rows = finalize(req, &recognized, engine, &mut diag);
        if rows.is_empty() {
            tracing::warn!(url = %req.url, "all strategies exhausted without products");
            diag.notes
                .push("all strategies exhausted with zero rows".to_owned());
        }

        checkpoint()?;
        Ok(finish(req, rows, diag))
    }

    async fn structured_stage(
        &self,
        req: &ScanRequest,
        diag: &mut Diagnostics,
    ) -> (StageOutput, Engine) {
        let mut report = StageReport::new(Stage::StructuredData);
        let (records, engine) = match self.fetcher.fetch(&req.url).await {
            Ok(page) => {
                let engine = detect_engine(&page.final_url, &page.body);
                let extraction = structured::extract(&page.body, page.is_json());
                report.note(extraction.source.to_string());
                if let Some(e) = &extraction.parse_error {
                    report.note(e.to_string());
                }
                for skipped in &extraction.skipped_blocks {
                    report.note(skipped.as_str());
                }
                diag.final_url = Some(page.final_url);
                (extraction.records, engine)
            }
            Err(e) => {
                tracing::warn!(url = %req.url, error = %e, "static fetch failed");
                report.note(e.to_string());
                (Vec::new(), detect_engine(&req.url, ""))
            }
        };
        diag.initial_engine = Some(engine);
        diag.stages.push(report);
        (StageOutput::StructuredData(records), engine)
    }

    async fn graphql_stage(
        &self,
        capture: &dyn CaptureEngine,
        req: &ScanRequest,
        diag: &mut Diagnostics,
    ) -> StageOutput {
        let mut report = StageReport::new(Stage::GraphQl);
        let mut session = match capture.open_session(&req.url).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(url = %req.url, error = %e, "browser session failed to open");
                report.note(e.to_string());
                diag.stages.push(report);
                return StageOutput::GraphQl(Vec::new());
            }
        };

        if let Ok(html) = session.rendered_html().await {
            let url = session
                .current_url()
                .await
                .unwrap_or_else(|| req.url.clone());
            diag.rendered_engine = Some(detect_engine(&url, &html));
            diag.final_url = Some(url);
        }

        let settings = CrawlSettings {
            menu_type: req.effective_menu_type(),
            ..self.crawl.clone()
        };
        let outcome = crawler::crawl(&mut *session, &req.url, &settings).await;
        if let Err(e) = session.close().await {
            tracing::debug!(error = %e, "browser close failed");
        }

        report.categories = outcome
            .categories
            .iter()
            .map(|c| c.display_name.clone())
            .collect();
        report.pages_per_category = outcome.pages_per_category;
        for note in outcome.notes {
            report.note(note);
        }
        if outcome.timed_out {
            report.note("session timed out; partial results kept");
        }
        diag.captured_endpoints.extend(outcome.captured);
        diag.stages.push(report);
        StageOutput::GraphQl(outcome.records)
    }

    async fn ocr_stage(&self, req: &ScanRequest, diag: &mut Diagnostics) -> StageOutput {
        let mut report = StageReport::new(Stage::Ocr);
        let Some(png) = self.screenshot(req, &mut report).await else {
            report.note("no screenshot available");
            diag.stages.push(report);
            return StageOutput::Ocr(Vec::new());
        };

        let records = match ocr::extract(self.recognizer.as_ref(), &png).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(url = %req.url, error = %e, "ocr failed");
                report.note(e.to_string());
                Vec::new()
            }
        };
        diag.stages.push(report);
        StageOutput::Ocr(records)
    }

    /// Browser screenshot first (only with browser mode on), then the
    /// screenshot API when configured.
    async fn screenshot(&self, req: &ScanRequest, report: &mut StageReport) -> Option<Vec<u8>> {
        if req.browser_mode_enabled {
            if let Some(capture) = &self.capture {
                match capture.open_session(&req.url).await {
                    Ok(mut session) => {
                        if let Err(e) = session.scroll(OCR_SCROLL_STEPS).await {
                            tracing::debug!(error = %e, "scroll before screenshot failed");
                        }
                        let shot = session.screenshot().await;
                        if let Err(e) = session.close().await {
                            tracing::debug!(error = %e, "browser close failed");
                        }
                        match shot {
                            Ok(png) => return Some(png),
                            Err(e) => report.note(format!("browser screenshot: {e}")),
                        }
                    }
                    Err(e) => report.note(format!("browser screenshot: {e}")),
                }
            }
        }

        let api = self.screenshot_api.as_ref()?;
        match api.capture(&req.url).await {
            Ok(png) => Some(png),
            Err(e) => {
                report.note(format!("screenshot api: {e}"));
                None
            }
        }
    }
}

/// Normalizes and deduplicates a stage's records and stamps the row count on
/// its report.
fn finalize(
    req: &ScanRequest,
    output: &StageOutput,
    engine: Engine,
    diag: &mut Diagnostics,
) -> Vec<CanonicalRow> {
    let stage = output.stage();
    let rows = dedup_rows(normalize_all(
        output.records(),
        req,
        stage.as_tag(),
        engine.as_tag(),
    ));
    if let Some(report) = diag.stages.iter_mut().rev().find(|r| r.stage == stage) {
        report.rows = rows.len();
    }
    tracing::info!(url = %req.url, %stage, rows = rows.len(), "stage complete");
    rows
}

fn finish(req: &ScanRequest, rows: Vec<CanonicalRow>, diag: Diagnostics) -> ScanOutcome {
    ScanOutcome {
        rows,
        diagnostics: req.debug_enabled.then_some(diag),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_tags_match_source_column_values() {
        assert_eq!(Stage::StructuredData.as_tag(), "structured-data");
        assert_eq!(Stage::GraphQl.as_tag(), "graphql");
        assert_eq!(Stage::Ocr.as_tag(), "ocr");
        assert_eq!(
            serde_json::to_value(Stage::GraphQl).unwrap(),
            serde_json::json!("graphql")
        );
    }

    #[test]
    fn stage_output_reports_emptiness() {
        assert!(StageOutput::GraphQl(Vec::new()).is_empty());
        let out = StageOutput::Ocr(vec![RawProductRecord::named("Blue Dream")]);
        assert!(!out.is_empty());
        assert_eq!(out.stage(), Stage::Ocr);
    }

    #[test]
    fn cancel_flag_is_shared_between_clones() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        clone.cancel();
        assert!(flag.is_cancelled());
    }

    #[test]
    fn report_notes_accumulate() {
        let mut report = StageReport::new(Stage::GraphQl);
        report.note("first");
        report.note("second");
        assert_eq!(report.note, "first; second");
    }
}
