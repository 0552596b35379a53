//! schema.org JSON-LD `Product` extraction.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::parse::json_scalar_text;
use crate::raw::RawProductRecord;

static LD_SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]+type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
        .expect("valid regex")
});

/// Extracts product records from every `<script type="application/ld+json">`
/// block. Blocks that fail to parse are skipped and described in `skipped`.
pub(crate) fn extract_jsonld_products(
    html: &str,
    skipped: &mut Vec<String>,
) -> Vec<RawProductRecord> {
    let mut records = Vec::new();

    for cap in LD_SCRIPT_RE.captures_iter(html) {
        let Some(text) = cap.get(1).map(|m| m.as_str().trim()) else {
            continue;
        };
        let value: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed JSON-LD block");
                skipped.push(format!("malformed JSON-LD block: {e}"));
                continue;
            }
        };
        records.extend(products_from_jsonld_value(&value));
    }

    records
}

/// Product records from one parsed JSON-LD document: a single object, an
/// array, or a `@graph` container.
pub(crate) fn products_from_jsonld_value(value: &Value) -> Vec<RawProductRecord> {
    let mut candidates: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    let graph_items: Vec<&Value> = candidates
        .iter()
        .filter_map(|item| item.get("@graph").and_then(Value::as_array))
        .flatten()
        .collect();
    candidates.extend(graph_items);

    candidates
        .into_iter()
        .filter(|item| is_product_type(item))
        .flat_map(product_to_records)
        .collect()
}

/// `@type` may be a string or an array of strings.
fn is_product_type(item: &Value) -> bool {
    let matches = |s: &str| s.to_ascii_lowercase().contains("product");
    match item.get("@type") {
        Some(Value::String(s)) => matches(s),
        Some(Value::Array(types)) => types.iter().filter_map(Value::as_str).any(matches),
        _ => false,
    }
}

fn product_to_records(item: &Value) -> Vec<RawProductRecord> {
    let Some(name) = item.get("name").and_then(json_scalar_text) else {
        return Vec::new();
    };

    let (thc, cbd) = cannabinoids_from_properties(item);
    let parent = RawProductRecord {
        name,
        category: item.get("category").and_then(first_text),
        brand: item.get("brand").and_then(name_or_text),
        price: None,
        thc,
        cbd,
        size: item.get("size").and_then(json_scalar_text),
        sku: item
            .get("sku")
            .or_else(|| item.get("productID"))
            .and_then(json_scalar_text),
        source_url: item
            .get("url")
            .and_then(Value::as_str)
            .filter(|u| u.starts_with("http"))
            .map(str::to_owned),
    };

    let offers: Vec<&Value> = match item.get("offers") {
        Some(Value::Array(list)) => list.iter().filter(|o| o.is_object()).collect(),
        Some(offer @ Value::Object(_)) => vec![offer],
        _ => Vec::new(),
    };
    if offers.is_empty() {
        return vec![parent];
    }

    offers
        .into_iter()
        .map(|offer| {
            let mut record = parent.clone();
            record.price = offer_price(offer);
            if let Some(sku) = offer.get("sku").and_then(json_scalar_text) {
                record.sku = Some(sku);
            }
            if record.size.is_none() {
                record.size = offer_size(offer);
            }
            record
        })
        .collect()
}

/// An explicit offer size, or the `eligibleQuantity` value with its unit.
/// The offer's `name` usually repeats the product name and is not used.
fn offer_size(offer: &Value) -> Option<String> {
    if let Some(size) = offer.get("size").and_then(name_or_text) {
        return Some(size);
    }
    let quantity = offer.get("eligibleQuantity")?;
    let value = quantity.get("value").and_then(json_scalar_text)?;
    match quantity.get("unitText").and_then(json_scalar_text) {
        Some(unit) => Some(format!("{value}{unit}")),
        None => Some(value),
    }
}

/// `AggregateOffer` carries `lowPrice`; plain offers carry `price` directly
/// or inside `priceSpecification`.
fn offer_price(offer: &Value) -> Option<String> {
    let is_aggregate = offer
        .get("@type")
        .and_then(Value::as_str)
        .is_some_and(|t| t.eq_ignore_ascii_case("AggregateOffer"));
    if is_aggregate {
        if let Some(low) = offer.get("lowPrice").and_then(json_scalar_text) {
            return Some(low);
        }
    }
    offer
        .get("price")
        .and_then(json_scalar_text)
        .or_else(|| {
            offer
                .get("priceSpecification")
                .and_then(|spec| spec.get("price"))
                .and_then(json_scalar_text)
        })
}

fn cannabinoids_from_properties(item: &Value) -> (Option<String>, Option<String>) {
    let props = item
        .get("additionalProperty")
        .or_else(|| item.get("additionalProperties"))
        .and_then(Value::as_array);
    let Some(props) = props else {
        return (None, None);
    };

    let mut thc = None;
    let mut cbd = None;
    for prop in props {
        let label = prop
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_ascii_lowercase();
        let Some(value) = prop
            .get("value")
            .or_else(|| prop.get("valueReference"))
            .and_then(json_scalar_text)
        else {
            continue;
        };
        let unit = prop
            .get("unitText")
            .or_else(|| prop.get("unitCode"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_ascii_lowercase();
        let rendered = if !value.ends_with('%') && (unit.contains('%') || unit.contains("percent"))
        {
            format!("{value}%")
        } else {
            value
        };

        if thc.is_none() && label.contains("thc") {
            thc = Some(rendered);
        } else if cbd.is_none() && label.contains("cbd") {
            cbd = Some(rendered);
        }
    }
    (thc, cbd)
}

fn name_or_text(value: &Value) -> Option<String> {
    match value {
        Value::Object(_) => value.get("name").and_then(json_scalar_text),
        other => json_scalar_text(other),
    }
}

fn first_text(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => items.iter().find_map(json_scalar_text),
        other => json_scalar_text(other),
    }
}
