//! GraphQL catalog crawl over an open capture session.
//!
//! The crawler discovers the menu's categories, then walks each category's
//! pages through `dtche[category]` / `dtche[page]` URLs, reading products from
//! whatever JSON the page fetched in the background.

mod categories;
mod payload;
mod variants;

use std::collections::HashSet;
use std::time::Duration;

use menuscan_core::MenuType;
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::browser::{CaptureSession, CapturedEndpoint, CapturedResponse};
use crate::error::ScraperError;
use crate::raw::RawProductRecord;

use payload::{explicit_cursor, get_ci, products_in_payload};
use variants::{product_in_stock, product_records};

pub use categories::{category_page_url, CategoryDescriptor};

#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Page cap per category.
    pub max_pages: usize,
    /// A page is considered loaded once no response arrives for this long.
    pub settle_quiet: Duration,
    /// Upper bound on waiting for one page to go quiet.
    pub settle_max: Duration,
    /// Selects the price list for catalogs that carry separate med/rec prices.
    pub menu_type: MenuType,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            max_pages: 20,
            settle_quiet: Duration::from_millis(1500),
            settle_max: Duration::from_secs(8),
            menu_type: MenuType::Unspecified,
        }
    }
}

/// Pages fetched for one category before pagination stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryPages {
    pub category: String,
    pub pages: usize,
}

#[derive(Debug, Clone, Default)]
pub struct CrawlOutcome {
    pub records: Vec<RawProductRecord>,
    pub categories: Vec<CategoryDescriptor>,
    pub pages_per_category: Vec<CategoryPages>,
    pub captured: Vec<CapturedEndpoint>,
    pub notes: Vec<String>,
    /// The session deadline passed before every category was walked.
    pub timed_out: bool,
}

impl CrawlOutcome {
    /// Records endpoint summaries and returns the bodies that parsed as JSON.
    /// Unreadable bodies leave a note.
    fn absorb(&mut self, responses: &[CapturedResponse]) -> Vec<Value> {
        let mut payloads = Vec::with_capacity(responses.len());
        for response in responses {
            match response.json() {
                Ok(value) => {
                    self.captured.push(response.summary(true));
                    payloads.push(value);
                }
                Err(e) => {
                    tracing::debug!(
                        url = %response.endpoint_url,
                        error = %e,
                        "captured body is not JSON"
                    );
                    self.captured.push(response.summary(false));
                    self.notes.push(format!(
                        "unreadable response from {}: {e}",
                        response.endpoint_url
                    ));
                }
            }
        }
        payloads
    }
}

/// Crawls the catalog behind an already-navigated session.
///
/// Never fails: navigation errors and an expiring session end the crawl early
/// and keep whatever was collected, with the reason in
/// [`CrawlOutcome::notes`]. Records may repeat across pages; the normalizer
/// deduplicates them.
pub async fn crawl(
    session: &mut dyn CaptureSession,
    menu_url: &str,
    settings: &CrawlSettings,
) -> CrawlOutcome {
    let mut outcome = CrawlOutcome::default();

    let initial = session
        .captured_responses()
        .settle(settings.settle_quiet, settings.settle_max)
        .await;
    let mut payloads = outcome.absorb(&initial);

    let html = rendered_html_or_note(session, &mut outcome).await;
    let mut found = categories::discover_categories(&payloads, &html);

    if found.is_empty() && !session.is_expired() {
        tracing::debug!(url = menu_url, "no categories yet, scrolling");
        if let Err(e) = session.scroll(1).await {
            outcome.notes.push(format!("scroll failed: {e}"));
        }
        let more = session
            .captured_responses()
            .settle(settings.settle_quiet, settings.settle_max)
            .await;
        payloads.extend(outcome.absorb(&more));
        let html = rendered_html_or_note(session, &mut outcome).await;
        found = categories::discover_categories(&payloads, &html);
    }

    if session.is_expired() {
        keep_initial_products(&payloads, settings.menu_type, &mut outcome);
        outcome.categories = found;
        return outcome;
    }

    if found.is_empty() {
        outcome
            .notes
            .push("no menu categories discovered".to_owned());
        return outcome;
    }
    tracing::info!(url = menu_url, count = found.len(), "categories discovered");

    for category in &found {
        if crawl_category(session, menu_url, category, settings, &mut outcome).await
            == CategoryEnd::SessionOver
        {
            break;
        }
    }

    outcome.categories = found;
    outcome
}

#[derive(Debug, PartialEq, Eq)]
enum CategoryEnd {
    Finished,
    SessionOver,
}

/// Walks one category's pages until a stop condition, recording the page
/// count either way.
async fn crawl_category(
    session: &mut dyn CaptureSession,
    menu_url: &str,
    category: &CategoryDescriptor,
    settings: &CrawlSettings,
    outcome: &mut CrawlOutcome,
) -> CategoryEnd {
    let mut seen_cursors: HashSet<String> = HashSet::new();
    let mut seen_items: HashSet<String> = HashSet::new();
    let mut pages = 0usize;
    let mut end = CategoryEnd::Finished;

    for page in 1..=settings.max_pages {
        if session.is_expired() {
            outcome.timed_out = true;
            outcome.notes.push(format!(
                "session deadline reached during \"{}\"",
                category.display_name
            ));
            end = CategoryEnd::SessionOver;
            break;
        }

        let url = category_page_url(menu_url, &category.slug, page);
        // Anything still queued belongs to the previous page.
        let stale = session.captured_responses().drain_ready();
        outcome.absorb(&stale);

        if let Err(e) = session.navigate(&url).await {
            tracing::warn!(url, error = %e, "category page navigation failed");
            outcome.notes.push(format!("{}: {e}", category.display_name));
            if matches!(e, ScraperError::Timeout { .. }) {
                outcome.timed_out = true;
                end = CategoryEnd::SessionOver;
            }
            break;
        }

        let responses = session
            .captured_responses()
            .settle(settings.settle_quiet, settings.settle_max)
            .await;
        let page_payloads = outcome.absorb(&responses);
        let products: Vec<&Map<String, Value>> =
            page_payloads.iter().flat_map(products_in_payload).collect();

        if products.is_empty() {
            tracing::debug!(url, "page returned no products");
            break;
        }

        if !seen_cursors.insert(page_cursor(&page_payloads, &products)) {
            outcome.notes.push(format!(
                "{}: page {page} repeated an earlier page",
                category.display_name
            ));
            break;
        }

        let records: Vec<RawProductRecord> = products
            .iter()
            .copied()
            .filter(|p| product_in_stock(p))
            .flat_map(|p| product_records(p, &category.display_name, settings.menu_type))
            .collect();
        let new_items = records
            .iter()
            .filter(|r| seen_items.insert(item_key(r)))
            .count();
        if new_items == 0 {
            tracing::debug!(url, "page added nothing new");
            break;
        }

        tracing::debug!(
            url,
            products = products.len(),
            records = records.len(),
            "page crawled"
        );
        outcome.records.extend(records);
        pages = page;
    }

    outcome.pages_per_category.push(CategoryPages {
        category: category.display_name.clone(),
        pages,
    });
    end
}

/// Products already present in the initial-load responses, used when the
/// session expired before any category page could be walked.
fn keep_initial_products(payloads: &[Value], menu_type: MenuType, outcome: &mut CrawlOutcome) {
    outcome.timed_out = true;
    outcome.records.extend(
        payloads
            .iter()
            .flat_map(products_in_payload)
            .filter(|p| product_in_stock(p))
            .flat_map(|p| product_records(p, "", menu_type)),
    );
    outcome.notes.push(format!(
        "session deadline reached before pagination; kept {} records from the initial load",
        outcome.records.len()
    ));
}

async fn rendered_html_or_note(session: &mut dyn CaptureSession, outcome: &mut CrawlOutcome) -> String {
    match session.rendered_html().await {
        Ok(html) => html,
        Err(e) => {
            outcome.notes.push(format!("could not read rendered page: {e}"));
            String::new()
        }
    }
}

/// An explicit cursor when the payload has one, otherwise a digest of the
/// page's product identities.
fn page_cursor(payloads: &[Value], products: &[&Map<String, Value>]) -> String {
    if let Some(cursor) = payloads.iter().find_map(|p| explicit_cursor(p, 0)) {
        return format!("cursor:{cursor}");
    }
    let mut identities: Vec<String> = products.iter().map(|p| product_identity(p)).collect();
    identities.sort_unstable();
    format!("sig:{:x}", Sha256::digest(identities.join("\n").as_bytes()))
}

fn product_identity(product: &Map<String, Value>) -> String {
    ["id", "productId", "_id", "name", "title"]
        .iter()
        .filter_map(|k| get_ci(product, &[*k]))
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join("|")
}

fn item_key(record: &RawProductRecord) -> String {
    format!(
        "{}|{}|{}|{}",
        record.name,
        record.size.as_deref().unwrap_or_default(),
        record.sku.as_deref().unwrap_or_default(),
        record.price.as_deref().unwrap_or_default()
    )
}

#[cfg(test)]
#[path = "../crawler_test.rs"]
mod tests;
