//! Navigation helpers over captured JSON payloads.

use serde_json::{Map, Value};

use crate::parse::json_scalar_text;

const MAX_LIST_SEARCH_DEPTH: usize = 6;

/// Known locations of the product array in menu GraphQL responses.
const PRODUCT_ARRAY_PATHS: &[&[&str]] = &[
    &["data", "filteredProducts", "products"],
    &["data", "products", "products"],
    &["data", "menuProducts"],
    &["data", "products"],
];

/// Case-insensitive key lookup, skipping nulls.
pub(super) fn get_ci<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|wanted| {
        map.iter()
            .find(|(k, v)| !v.is_null() && k.eq_ignore_ascii_case(wanted))
            .map(|(_, v)| v)
    })
}

/// Scalar text, or the `name`/`title` of an object.
pub(super) fn text_or_name(value: &Value) -> Option<String> {
    match value {
        Value::Object(inner) => get_ci(inner, &["name", "title", "displayName"]).and_then(json_scalar_text),
        other => json_scalar_text(other),
    }
}

/// Price text from a scalar or an `{amount}`/`{value}` object.
pub(super) fn price_text(value: &Value) -> Option<String> {
    match value {
        Value::Object(inner) => get_ci(inner, &["amount", "value"]).and_then(json_scalar_text),
        other => json_scalar_text(other),
    }
}

/// The product list inside one captured response body.
///
/// Known paths are tried first; otherwise the largest list of named objects
/// anywhere in the payload wins.
pub(super) fn products_in_payload(payload: &Value) -> Vec<&Map<String, Value>> {
    for path in PRODUCT_ARRAY_PATHS {
        let mut node = Some(payload);
        for key in *path {
            node = node.and_then(|n| n.get(*key));
        }
        if let Some(Value::Array(items)) = node {
            return items.iter().filter_map(Value::as_object).collect();
        }
    }
    largest_named_list(payload, 0)
        .map(|items| items.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default()
}

fn largest_named_list(value: &Value, depth: usize) -> Option<&Vec<Value>> {
    if depth > MAX_LIST_SEARCH_DEPTH {
        return None;
    }
    match value {
        Value::Object(map) => map
            .values()
            .filter_map(|v| largest_named_list(v, depth + 1))
            .max_by_key(|list| list.len()),
        Value::Array(items) => {
            let named = items
                .iter()
                .filter(|item| item.get("name").is_some() || item.get("title").is_some())
                .count();
            if named > 0 && named >= items.len().min(2) {
                return Some(items);
            }
            items
                .iter()
                .filter_map(|item| largest_named_list(item, depth + 1))
                .max_by_key(|list| list.len())
        }
        _ => None,
    }
}

/// An explicit pagination cursor anywhere in the payload
/// (`pageInfo.endCursor`, `nextCursor`, `cursor`).
pub(super) fn explicit_cursor(payload: &Value, depth: usize) -> Option<String> {
    if depth > MAX_LIST_SEARCH_DEPTH {
        return None;
    }
    match payload {
        Value::Object(map) => {
            if let Some(cursor) = get_ci(map, &["endCursor", "nextCursor", "cursor"])
                .and_then(Value::as_str)
                .filter(|c| !c.is_empty())
            {
                return Some(cursor.to_owned());
            }
            map.values().find_map(|v| explicit_cursor(v, depth + 1))
        }
        Value::Array(items) => items.iter().find_map(|v| explicit_cursor(v, depth + 1)),
        _ => None,
    }
}

const STOCK_KEYS: &[&str] = &[
    "instock",
    "isavailable",
    "available",
    "stockstatus",
    "inventorystatus",
    "quantityavailable",
    "quantity",
];

/// Reads the first recognised stock field. `None` when the object has none.
pub(super) fn stock_flag(map: &Map<String, Value>) -> Option<bool> {
    map.iter()
        .find(|(k, _)| STOCK_KEYS.contains(&k.to_ascii_lowercase().as_str()))
        .and_then(|(_, v)| match v {
            Value::Bool(b) => Some(*b),
            Value::String(s) => Some(!matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "false" | "0" | "out_of_stock" | "out of stock" | "unavailable" | "no"
            )),
            Value::Number(n) => Some(n.as_f64().is_some_and(|f| f > 0.0)),
            _ => None,
        })
}
