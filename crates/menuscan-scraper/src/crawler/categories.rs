//! Category discovery from captured payloads and rendered markup.

use std::collections::HashSet;
use std::sync::LazyLock;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use super::payload::get_ci;
use crate::parse::json_scalar_text;

const MAX_CATEGORY_SEARCH_DEPTH: usize = 6;

const CATEGORY_LIST_KEYS: &[&str] = &[
    "categories",
    "productcategories",
    "menucategories",
    "categorylist",
];

/// Unreserved characters stay literal in the category query value.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

static CATEGORY_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)dtche(?:%5B|\[)category(?:%5D|\])=([^&"'\s<>]+)"#).expect("valid regex")
});

/// A menu category the crawler paginates through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryDescriptor {
    pub category_id: String,
    pub display_name: String,
    /// Value placed in the `dtche[category]` query parameter.
    pub slug: String,
}

impl CategoryDescriptor {
    fn from_slug(slug: &str) -> Option<Self> {
        let slug = slug.trim();
        if slug.is_empty() {
            return None;
        }
        Some(Self {
            category_id: slug.to_owned(),
            display_name: title_case(slug),
            slug: slug.to_owned(),
        })
    }

    fn from_object(map: &Map<String, Value>) -> Option<Self> {
        let name = get_ci(map, &["name", "displayName", "label", "title"]).and_then(json_scalar_text);
        let slug = get_ci(map, &["slug", "key", "value"])
            .and_then(json_scalar_text)
            .or_else(|| name.as_deref().map(slugify))
            .filter(|s| !s.is_empty())?;
        let category_id = get_ci(map, &["id", "categoryId", "_id"])
            .and_then(json_scalar_text)
            .unwrap_or_else(|| slug.clone());
        Some(Self {
            category_id,
            display_name: name.unwrap_or_else(|| title_case(&slug)),
            slug,
        })
    }
}

/// Builds the URL for one page of one category.
///
/// Any query on `base_url` is dropped; page 1 carries no page parameter.
#[must_use]
pub fn category_page_url(base_url: &str, slug: &str, page: usize) -> String {
    let base = crate::fetch::strip_query(base_url);
    let mut url = format!(
        "{base}?dtche%5Bcategory%5D={}",
        utf8_percent_encode(slug, QUERY_VALUE)
    );
    if page > 1 {
        url.push_str(&format!("&dtche%5Bpage%5D={page}"));
    }
    url
}

/// Collects categories from every payload and from category links in the
/// rendered page. Order is first-seen; duplicates by id or slug are dropped.
pub(super) fn discover_categories(payloads: &[Value], rendered_html: &str) -> Vec<CategoryDescriptor> {
    let mut found = Vec::new();
    for payload in payloads {
        collect_from_value(payload, 0, &mut found);
    }
    for cap in CATEGORY_LINK_RE.captures_iter(rendered_html) {
        let raw = cap[1].replace('+', " ");
        let decoded = percent_decode_str(&raw).decode_utf8_lossy();
        found.extend(CategoryDescriptor::from_slug(&decoded));
    }

    let mut seen_ids = HashSet::new();
    let mut seen_slugs = HashSet::new();
    found
        .into_iter()
        .filter(|c| {
            let new_id = seen_ids.insert(c.category_id.clone());
            let new_slug = seen_slugs.insert(c.slug.to_ascii_lowercase());
            new_id && new_slug
        })
        .collect()
}

fn collect_from_value(value: &Value, depth: usize, out: &mut Vec<CategoryDescriptor>) {
    if depth > MAX_CATEGORY_SEARCH_DEPTH {
        return;
    }
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let is_category_list = CATEGORY_LIST_KEYS.contains(&key.to_ascii_lowercase().as_str());
                match child {
                    Value::Array(items) if is_category_list => {
                        for item in items {
                            match item {
                                Value::Object(obj) => out.extend(CategoryDescriptor::from_object(obj)),
                                Value::String(s) => out.extend(CategoryDescriptor::from_slug(s)),
                                _ => {}
                            }
                        }
                    }
                    other => collect_from_value(other, depth + 1, out),
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_from_value(item, depth + 1, out);
            }
        }
        _ => {}
    }
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_owned()
}

fn title_case(slug: &str) -> String {
    slug.split(['-', '_', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn page_url_encodes_category_and_omits_first_page() {
        assert_eq!(
            category_page_url("https://shop.example.com/menu?sort=a", "pre-rolls", 1),
            "https://shop.example.com/menu?dtche%5Bcategory%5D=pre-rolls"
        );
        assert_eq!(
            category_page_url("https://shop.example.com/menu", "edibles & more", 3),
            "https://shop.example.com/menu?dtche%5Bcategory%5D=edibles%20%26%20more&dtche%5Bpage%5D=3"
        );
    }

    #[test]
    fn discovers_categories_from_payload_objects() {
        let payload = json!({
            "data": {
                "menu": {
                    "productCategories": [
                        {"id": "c1", "name": "Flower", "slug": "flower"},
                        {"name": "Pre Rolls"}
                    ]
                }
            }
        });
        let cats = discover_categories(&[payload], "");
        assert_eq!(cats.len(), 2);
        assert_eq!(cats[0].category_id, "c1");
        assert_eq!(cats[0].slug, "flower");
        assert_eq!(cats[1].slug, "pre-rolls");
        assert_eq!(cats[1].display_name, "Pre Rolls");
    }

    #[test]
    fn discovers_categories_from_links_without_duplicates() {
        let html = r#"
            <a href="/menu?dtche%5Bcategory%5D=flower">Flower</a>
            <a href="/menu?dtche[category]=vaporizers&x=1">Vapes</a>
            <a href="/menu?dtche%5Bcategory%5D=flower">Flower again</a>
        "#;
        let payload = json!({"categories": ["flower"]});
        let cats = discover_categories(&[payload], html);
        let slugs: Vec<&str> = cats.iter().map(|c| c.slug.as_str()).collect();
        assert_eq!(slugs, vec!["flower", "vaporizers"]);
        assert_eq!(cats[1].display_name, "Vaporizers");
    }

    #[test]
    fn nothing_found_yields_empty_list() {
        assert!(discover_categories(&[json!({"data": {}})], "<html></html>").is_empty());
    }
}
