//! Generic HTML product-card parsing.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};

use crate::parse::{collapse_whitespace, find_dollar_price, find_thc};
use crate::raw::RawProductRecord;

const CARD_SELECTORS: &[&str] = &[
    "[class*='product-card']",
    "[class*='ProductCard']",
    "[class*='menu-item']",
    "[class*='MenuItem']",
    "[data-product-name]",
];

/// Parses card grids. A card needs a name, from `data-product-name` or its
/// first heading; price and THC come from the card's visible text.
pub(crate) fn extract_card_products(html: &str) -> Vec<RawProductRecord> {
    let document = Html::parse_document(html);
    let Ok(heading) = Selector::parse("h1, h2, h3, h4") else {
        return Vec::new();
    };

    let mut records = Vec::new();
    let mut visited = HashSet::new();
    for raw_selector in CARD_SELECTORS {
        let Ok(selector) = Selector::parse(raw_selector) else {
            continue;
        };
        for card in document.select(&selector) {
            // an element matching several selectors is parsed once
            if !visited.insert(card.id()) {
                continue;
            }
            if let Some(record) = card_to_record(card, &heading) {
                records.push(record);
            }
        }
    }
    records
}

fn card_to_record(card: ElementRef<'_>, heading: &Selector) -> Option<RawProductRecord> {
    let name = card
        .value()
        .attr("data-product-name")
        .map(collapse_whitespace)
        .filter(|n| !n.is_empty())
        .or_else(|| {
            card.select(heading)
                .next()
                .map(|h| collapse_whitespace(&h.text().collect::<Vec<_>>().join(" ")))
                .filter(|n| !n.is_empty())
        })?;

    let text = collapse_whitespace(&card.text().collect::<Vec<_>>().join(" "));

    Some(RawProductRecord {
        price: find_dollar_price(&text).map(|m| m.amount),
        thc: find_thc(&text).map(|m| m.value),
        brand: card
            .value()
            .attr("data-brand")
            .map(collapse_whitespace)
            .filter(|b| !b.is_empty()),
        ..RawProductRecord::named(name)
    })
}
