//! Conversion from [`RawProductRecord`] to the canonical row schema.

use std::collections::HashMap;

use menuscan_core::{CanonicalRow, RowKey, ScanRequest};

use crate::parse::{coerce_price, collapse_whitespace};
use crate::raw::RawProductRecord;

/// Normalizes one record for `req`.
///
/// Pure: trims and collapses whitespace, coerces the price to `$N.NN`, keeps
/// THC/CBD text as given, and leaves anything unresolvable blank. The
/// `Source_URL` falls back to the request URL.
#[must_use]
pub fn normalize(
    raw: &RawProductRecord,
    req: &ScanRequest,
    source_tag: &str,
    engine_tag: &str,
) -> CanonicalRow {
    let clean = |v: Option<&String>| v.map(|s| collapse_whitespace(s)).unwrap_or_default();

    let source_url = raw
        .source_url
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(&req.url)
        .to_owned();

    CanonicalRow {
        dispensary: collapse_whitespace(&req.dispensary_label),
        menu_type: req.effective_menu_type().as_column().to_owned(),
        category: clean(raw.category.as_ref()),
        product: collapse_whitespace(&raw.name),
        price: raw
            .price
            .as_deref()
            .and_then(coerce_price)
            .unwrap_or_default(),
        brand: clean(raw.brand.as_ref()),
        thc: clean(raw.thc.as_ref()),
        cbd: clean(raw.cbd.as_ref()),
        size: clean(raw.size.as_ref()),
        sku: clean(raw.sku.as_ref()),
        source: source_tag.to_owned(),
        source_url,
        engine: engine_tag.to_owned(),
    }
}

/// Normalizes a batch, dropping records whose name is blank after cleanup.
#[must_use]
pub fn normalize_all(
    records: &[RawProductRecord],
    req: &ScanRequest,
    source_tag: &str,
    engine_tag: &str,
) -> Vec<CanonicalRow> {
    records
        .iter()
        .map(|r| normalize(r, req, source_tag, engine_tag))
        .filter(|row| !row.product.is_empty())
        .collect()
}

/// Deduplicates one scan's rows on `(Product, Size, SKU, Source_URL)`.
///
/// The surviving row sits at the position of the first occurrence and carries
/// the content of the most complete occurrence (fewest blank optional
/// fields). Ties keep the earlier row.
#[must_use]
pub fn dedup_rows(rows: Vec<CanonicalRow>) -> Vec<CanonicalRow> {
    let mut index: HashMap<RowKey, usize> = HashMap::with_capacity(rows.len());
    let mut out: Vec<CanonicalRow> = Vec::with_capacity(rows.len());

    for row in rows {
        let key = row.dedup_key();
        match index.get(&key) {
            Some(&pos) => {
                if row.blank_optional_count() < out[pos].blank_optional_count() {
                    out[pos] = row;
                }
            }
            None => {
                index.insert(key, out.len());
                out.push(row);
            }
        }
    }

    out
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
