//! Product-like objects inside embedded JSON payloads (`__NEXT_DATA__`,
//! `application/json` script blocks) and bare JSON documents.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::parse::json_scalar_text;
use crate::raw::RawProductRecord;

/// Maximum nesting depth searched for product objects.
const MAX_DEPTH: usize = 8;

static JSON_SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]+type\s*=\s*["']application/json["'][^>]*>(.*?)</script>"#)
        .expect("valid regex")
});
static NEXT_DATA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]+id\s*=\s*["']__NEXT_DATA__["'][^>]*>(.*?)</script>"#)
        .expect("valid regex")
});

const NAME_KEYS: &[&str] = &["name", "title", "productname", "product_name", "displayname"];
const PRICE_KEYS: &[&str] = &[
    "price",
    "baseprice",
    "unitprice",
    "amount",
    "cost",
    "discountedprice",
    "saleprice",
    "listprice",
];
const THC_KEYS: &[&str] = &["thc", "thccontent", "thcpercentage", "thclevel", "thcmax"];
const CBD_KEYS: &[&str] = &["cbd", "cbdcontent", "cbdpercentage", "cbdlevel", "cbdmax"];
const CATEGORY_KEYS: &[&str] = &["category", "type", "producttype", "subcategory", "kind"];
const BRAND_KEYS: &[&str] = &["brand", "brandname", "brand_name", "vendor"];
const SIZE_KEYS: &[&str] = &["size", "weight", "option", "unitsize"];
const SKU_KEYS: &[&str] = &["sku", "productid", "product_id"];

/// Searches every embedded JSON block in `html`. Blocks that fail to parse are
/// described in `skipped`.
pub(crate) fn extract_embedded_products(
    html: &str,
    skipped: &mut Vec<String>,
) -> Vec<RawProductRecord> {
    let mut blocks: Vec<&str> = JSON_SCRIPT_RE
        .captures_iter(html)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    for cap in NEXT_DATA_RE.captures_iter(html) {
        if let Some(m) = cap.get(1) {
            if !blocks.contains(&m.as_str()) {
                blocks.push(m.as_str());
            }
        }
    }

    let mut records = Vec::new();
    for block in blocks {
        match serde_json::from_str::<Value>(block.trim()) {
            Ok(value) => search_products(&value, 0, &mut records),
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed embedded JSON block");
                skipped.push(format!("malformed embedded JSON block: {e}"));
            }
        }
    }
    records
}

/// Product-like objects anywhere in `value`, down to a bounded depth.
///
/// An object qualifies when it has both a name-like and a price-like key;
/// matched objects are not searched further so their variant lists do not
/// turn into standalone products.
pub(crate) fn search_products(value: &Value, depth: usize, out: &mut Vec<RawProductRecord>) {
    if depth > MAX_DEPTH {
        return;
    }
    match value {
        Value::Object(map) => {
            if let Some(record) = product_from_object(map) {
                out.push(record);
                return;
            }
            for child in map.values() {
                if child.is_object() || child.is_array() {
                    search_products(child, depth + 1, out);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                search_products(item, depth + 1, out);
            }
        }
        _ => {}
    }
}

fn product_from_object(map: &Map<String, Value>) -> Option<RawProductRecord> {
    let name = lookup(map, NAME_KEYS)
        .and_then(json_scalar_text)
        .filter(|n| n.chars().count() > 1)?;
    let price = lookup(map, PRICE_KEYS).and_then(price_text)?;

    Some(RawProductRecord {
        name,
        category: lookup(map, CATEGORY_KEYS).and_then(name_or_text),
        brand: lookup(map, BRAND_KEYS).and_then(name_or_text),
        price: Some(price),
        thc: lookup(map, THC_KEYS).and_then(json_scalar_text),
        cbd: lookup(map, CBD_KEYS).and_then(json_scalar_text),
        size: lookup(map, SIZE_KEYS).and_then(json_scalar_text),
        sku: lookup(map, SKU_KEYS).and_then(json_scalar_text),
        source_url: None,
    })
}

/// First value whose lower-cased key is in `keys`.
fn lookup<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    map.iter()
        .find(|(k, v)| !v.is_null() && keys.contains(&k.to_ascii_lowercase().as_str()))
        .map(|(_, v)| v)
}

fn price_text(value: &Value) -> Option<String> {
    match value {
        Value::Object(inner) => inner
            .get("amount")
            .or_else(|| inner.get("value"))
            .and_then(json_scalar_text),
        Value::Number(n) if n.as_f64().is_some_and(|f| f > 0.0) => json_scalar_text(value),
        Value::String(s) if s.chars().any(|c| c.is_ascii_digit()) => json_scalar_text(value),
        _ => None,
    }
}

fn name_or_text(value: &Value) -> Option<String> {
    match value {
        Value::Object(inner) => inner
            .get("name")
            .or_else(|| inner.get("title"))
            .and_then(json_scalar_text),
        other => json_scalar_text(other),
    }
}
