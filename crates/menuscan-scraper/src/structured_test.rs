use super::*;

fn page(body: &str) -> String {
    format!("<html><head><title>Menu</title></head><body>{body}</body></html>")
}

#[test]
fn jsonld_product_with_single_offer() {
    let html = page(
        r#"<script type="application/ld+json">
        {"@context":"https://schema.org","@type":"Product","name":"Blue Dream 3.5g",
         "brand":{"@type":"Brand","name":"Grassroots"},"sku":"BD-35",
         "offers":{"@type":"Offer","price":"45.00","priceCurrency":"USD"},
         "additionalProperty":[{"@type":"PropertyValue","name":"THC","value":24.1,"unitText":"%"}]}
        </script>"#,
    );
    let out = extract(&html, false);
    assert_eq!(out.source, StructuredSource::JsonLd);
    assert_eq!(out.records.len(), 1);
    let r = &out.records[0];
    assert_eq!(r.name, "Blue Dream 3.5g");
    assert_eq!(r.brand.as_deref(), Some("Grassroots"));
    assert_eq!(r.price.as_deref(), Some("45.00"));
    assert_eq!(r.thc.as_deref(), Some("24.1%"));
    assert_eq!(r.sku.as_deref(), Some("BD-35"));
    assert_eq!(r.cbd, None);
}

#[test]
fn jsonld_graph_and_type_array() {
    let html = page(
        r#"<script type="application/ld+json">
        {"@graph":[
            {"@type":"WebSite","name":"Solar"},
            {"@type":["Product","Thing"],"name":"Sour Diesel","offers":[
                {"@type":"Offer","price":30,"size":"1/8 oz"},
                {"@type":"Offer","price":55,"eligibleQuantity":{"value":7,"unitText":"g"}}]}
        ]}
        </script>"#,
    );
    let out = extract(&html, false);
    assert_eq!(out.records.len(), 2);
    assert_eq!(out.records[0].size.as_deref(), Some("1/8 oz"));
    assert_eq!(out.records[1].price.as_deref(), Some("55"));
    assert_eq!(out.records[1].size.as_deref(), Some("7g"));
}

#[test]
fn offer_name_is_not_taken_as_size() {
    let html = page(
        r#"<script type="application/ld+json">
        {"@type":"Product","name":"Blue Dream","offers":{"@type":"Offer","name":"Blue Dream","price":45}}
        </script>"#,
    );
    let out = extract(&html, false);
    assert_eq!(out.records.len(), 1);
    assert_eq!(out.records[0].size, None);
}

#[test]
fn jsonld_aggregate_offer_uses_low_price() {
    let html = page(
        r#"<script type='application/ld+json'>
        [{"@type":"Product","name":"Gummies","offers":{"@type":"AggregateOffer","lowPrice":"18","highPrice":"25"}}]
        </script>"#,
    );
    let out = extract(&html, false);
    assert_eq!(out.records[0].price.as_deref(), Some("18"));
}

#[test]
fn malformed_jsonld_block_is_skipped() {
    let html = page(
        r#"<script type="application/ld+json">{not json</script>
        <script type="application/ld+json">{"@type":"Product","name":"Pre-Roll"}</script>"#,
    );
    let out = extract(&html, false);
    assert_eq!(out.records.len(), 1);
    assert_eq!(out.records[0].name, "Pre-Roll");
    assert_eq!(out.records[0].price, None);
    assert_eq!(out.source, StructuredSource::JsonLd);
    assert_eq!(out.skipped_blocks.len(), 1);
    assert!(out.skipped_blocks[0].starts_with("malformed JSON-LD block"));
}

#[test]
fn malformed_embedded_block_is_noted() {
    let html = page(
        r#"<script type="application/json">{"props": [</script>
        <script id="__NEXT_DATA__" type="application/json">{"products":[{"name":"Mints","price":20}]}</script>"#,
    );
    let out = extract(&html, false);
    assert_eq!(out.source, StructuredSource::EmbeddedJson);
    assert_eq!(out.records.len(), 1);
    assert_eq!(out.skipped_blocks.len(), 1);
    assert!(out.skipped_blocks[0].starts_with("malformed embedded JSON block"));
}

#[test]
fn next_data_products_are_found() {
    let html = page(
        r#"<script id="__NEXT_DATA__" type="application/json">
        {"props":{"pageProps":{"menu":{"items":[
            {"id":"a1","name":"Wedding Cake","price":40,"category":{"name":"Flower"},"brand":"Cresco","thcContent":"21%"},
            {"id":"a2","name":"Mints","price":"$20","type":"Edible"}
        ]},"nav":[{"title":"Home"}]}}}
        </script>"#,
    );
    let out = extract(&html, false);
    assert_eq!(out.source, StructuredSource::EmbeddedJson);
    assert_eq!(out.records.len(), 2);
    assert_eq!(out.records[0].category.as_deref(), Some("Flower"));
    assert_eq!(out.records[0].brand.as_deref(), Some("Cresco"));
    assert_eq!(out.records[0].thc.as_deref(), Some("21%"));
    assert_eq!(out.records[1].category.as_deref(), Some("Edible"));
}

#[test]
fn product_cards_are_parsed_when_no_json_present() {
    let html = page(
        r#"<div class="grid">
            <div class="product-card"><h3>Blue Dream</h3><span>24% THC</span><span>$45.00</span></div>
            <div class="product-card" data-product-name="Sour Diesel"><p>$50</p></div>
            <div class="product-card"><p>no heading here $10</p></div>
        </div>"#,
    );
    let out = extract(&html, false);
    assert_eq!(out.source, StructuredSource::HtmlCards);
    assert_eq!(out.records.len(), 2);
    assert_eq!(out.records[0].name, "Blue Dream");
    assert_eq!(out.records[0].price.as_deref(), Some("45.00"));
    assert_eq!(out.records[0].thc.as_deref(), Some("24%"));
    assert_eq!(out.records[1].name, "Sour Diesel");
}

#[test]
fn bare_json_document_is_searched() {
    let body = r#"{"data":{"products":[{"name":"Live Resin","price":{"amount":60}}]}}"#;
    let out = extract(body, true);
    assert_eq!(out.source, StructuredSource::JsonDocument);
    assert_eq!(out.records.len(), 1);
    assert_eq!(out.records[0].price.as_deref(), Some("60"));
}

#[test]
fn page_without_products_yields_nothing() {
    let out = extract(&page("<p>Visit us in store!</p>"), false);
    assert!(out.records.is_empty());
    assert_eq!(out.source, StructuredSource::Nothing);
}

#[test]
fn unreadable_json_document_reports_parse_error() {
    let out = extract("{\"products\": [", true);
    assert!(out.records.is_empty());
    assert!(matches!(
        out.parse_error,
        Some(crate::error::ScraperError::Parse { .. })
    ));
}
