pub mod browser;
pub mod crawler;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod normalize;
pub mod ocr;
pub mod orchestrator;
pub mod parse;
mod rate_limit;
pub mod raw;
pub mod structured;

pub use browser::{
    CaptureEngine, CaptureSession, CapturedEndpoint, CapturedResponse, ChromiumEngine,
    ChromiumSettings, ResponseSender, ResponseStream,
};
pub use crawler::{crawl, CategoryDescriptor, CategoryPages, CrawlOutcome, CrawlSettings};
pub use engine::{detect_engine, Engine};
pub use error::ScraperError;
pub use fetch::{FetchedPage, StaticFetcher};
pub use normalize::{dedup_rows, normalize, normalize_all};
pub use ocr::{parse_ocr_text, ScreenshotApi, TesseractCli, TextRecognizer};
pub use orchestrator::{
    CancelFlag, Diagnostics, ScanCancelled, ScanOutcome, Scanner, Stage, StageOutput, StageReport,
};
pub use raw::RawProductRecord;
