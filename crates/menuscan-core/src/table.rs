//! The accumulated result table and its exports.

use std::collections::HashSet;
use std::io::Write;

use thiserror::Error;

use crate::row::{CanonicalRow, COLUMNS};

#[derive(Debug, Error)]
pub enum TableError {
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error during export: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage for rows emitted by completed scans.
///
/// Appends preserve order and never deduplicate: MED and REC scans of the
/// same dispensary legitimately produce rows with the same product key.
pub trait RowAccumulator {
    fn append(&mut self, rows: Vec<CanonicalRow>);
    fn clear(&mut self);
    fn rows(&self) -> &[CanonicalRow];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(format!("unsupported export format \"{other}\"")),
        }
    }
}

/// Aggregate figures shown after each run.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSummary {
    pub total_rows: usize,
    pub unique_dispensaries: usize,
    /// Mean of all parseable prices; `None` when no row has a price.
    pub average_price: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct ResultTable {
    rows: Vec<CanonicalRow>,
}

impl ResultTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn summary(&self) -> TableSummary {
        let unique_dispensaries = self
            .rows
            .iter()
            .map(|r| r.dispensary.as_str())
            .collect::<HashSet<_>>()
            .len();

        let prices: Vec<f64> = self
            .rows
            .iter()
            .filter_map(CanonicalRow::price_value)
            .collect();
        #[allow(clippy::cast_precision_loss)]
        let average_price = if prices.is_empty() {
            None
        } else {
            Some(prices.iter().sum::<f64>() / prices.len() as f64)
        };

        TableSummary {
            total_rows: self.rows.len(),
            unique_dispensaries,
            average_price,
        }
    }

    /// Writes the table as CSV with a header row in [`COLUMNS`] order.
    ///
    /// An empty table still produces the header.
    ///
    /// # Errors
    ///
    /// Returns [`TableError`] if a record cannot be written.
    pub fn export_csv<W: Write>(&self, writer: W) -> Result<(), TableError> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(COLUMNS)?;
        for row in &self.rows {
            wtr.write_record(row.values())?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Writes the table as a pretty-printed JSON array of row objects.
    ///
    /// # Errors
    ///
    /// Returns [`TableError`] if serialization or the write fails.
    pub fn export_json<W: Write>(&self, mut writer: W) -> Result<(), TableError> {
        serde_json::to_writer_pretty(&mut writer, &self.rows)?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    /// Dispatches to the exporter for `format`.
    ///
    /// # Errors
    ///
    /// Returns [`TableError`] from the chosen exporter.
    pub fn export<W: Write>(&self, format: ExportFormat, writer: W) -> Result<(), TableError> {
        match format {
            ExportFormat::Csv => self.export_csv(writer),
            ExportFormat::Json => self.export_json(writer),
        }
    }
}

impl RowAccumulator for ResultTable {
    fn append(&mut self, rows: Vec<CanonicalRow>) {
        self.rows.extend(rows);
    }

    fn clear(&mut self) {
        self.rows.clear();
    }

    fn rows(&self) -> &[CanonicalRow] {
        &self.rows
    }
}
