//! Shared data model and configuration for the menu scanner.
//!
//! Everything here is free of network or browser concerns so the CLI and the
//! scraper pipeline can agree on one schema.

pub mod app_config;
pub mod config;
pub mod request;
pub mod row;
pub mod table;

use thiserror::Error;

pub use app_config::AppConfig;
pub use config::{load_app_config, load_app_config_from_env};
pub use request::{MenuType, ScanRequest};
pub use row::{CanonicalRow, RowKey, COLUMNS};
pub use table::{ExportFormat, ResultTable, RowAccumulator, TableError, TableSummary};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for env var {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
