//! Structured-data extraction from a statically fetched document.
//!
//! Sources are tried in order (JSON-LD, embedded JSON payloads, generic HTML
//! cards) and the first one that yields records wins. A document that is
//! itself JSON is searched directly.

mod cards;
mod embedded;
mod jsonld;

use serde_json::Value;

use crate::error::ScraperError;
use crate::raw::RawProductRecord;

use cards::extract_card_products;
use embedded::{extract_embedded_products, search_products};
use jsonld::{extract_jsonld_products, products_from_jsonld_value};

/// Which structured source produced the records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuredSource {
    JsonLd,
    EmbeddedJson,
    JsonDocument,
    HtmlCards,
    Nothing,
}

impl std::fmt::Display for StructuredSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            StructuredSource::JsonLd => "JSON-LD",
            StructuredSource::EmbeddedJson => "embedded JSON",
            StructuredSource::JsonDocument => "JSON document",
            StructuredSource::HtmlCards => "HTML cards",
            StructuredSource::Nothing => "no structured data",
        };
        f.write_str(label)
    }
}

#[derive(Debug)]
pub struct StructuredExtraction {
    pub records: Vec<RawProductRecord>,
    pub source: StructuredSource,
    /// Set when the whole document was unreadable.
    pub parse_error: Option<ScraperError>,
    /// One note per embedded block that was skipped as malformed.
    pub skipped_blocks: Vec<String>,
}

fn found(
    records: Vec<RawProductRecord>,
    source: StructuredSource,
    skipped_blocks: Vec<String>,
) -> StructuredExtraction {
    StructuredExtraction {
        records,
        source,
        parse_error: None,
        skipped_blocks,
    }
}

/// Extracts candidate records from an HTML page or a JSON body.
///
/// Malformed blocks are skipped; the result is empty rather than an error when
/// nothing product-like is found.
#[must_use]
pub fn extract(body: &str, is_json: bool) -> StructuredExtraction {
    if is_json {
        return extract_json_document(body);
    }

    let mut skipped_blocks = Vec::new();

    let jsonld = extract_jsonld_products(body, &mut skipped_blocks);
    if !jsonld.is_empty() {
        tracing::debug!(count = jsonld.len(), "JSON-LD products found");
        return found(jsonld, StructuredSource::JsonLd, skipped_blocks);
    }

    let embedded = extract_embedded_products(body, &mut skipped_blocks);
    if !embedded.is_empty() {
        tracing::debug!(count = embedded.len(), "embedded JSON products found");
        return found(embedded, StructuredSource::EmbeddedJson, skipped_blocks);
    }

    let cards = extract_card_products(body);
    if !cards.is_empty() {
        tracing::debug!(count = cards.len(), "HTML card products found");
        return found(cards, StructuredSource::HtmlCards, skipped_blocks);
    }

    found(Vec::new(), StructuredSource::Nothing, skipped_blocks)
}

fn extract_json_document(body: &str) -> StructuredExtraction {
    let value: Value = match serde_json::from_str(body.trim()) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(error = %e, "JSON body did not parse");
            return StructuredExtraction {
                records: Vec::new(),
                source: StructuredSource::Nothing,
                parse_error: Some(ScraperError::Parse {
                    context: "JSON document".to_owned(),
                    reason: e.to_string(),
                }),
                skipped_blocks: Vec::new(),
            };
        }
    };

    let mut records = products_from_jsonld_value(&value);
    if records.is_empty() {
        search_products(&value, 0, &mut records);
    }
    let source = if records.is_empty() {
        StructuredSource::Nothing
    } else {
        StructuredSource::JsonDocument
    };
    StructuredExtraction {
        records,
        source,
        parse_error: None,
        skipped_blocks: Vec::new(),
    }
}

#[cfg(test)]
#[path = "../structured_test.rs"]
mod tests;
