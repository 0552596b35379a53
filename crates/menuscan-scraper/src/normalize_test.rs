use menuscan_core::MenuType;

use super::*;

fn request(url: &str) -> ScanRequest {
    ScanRequest::new("Solar Cannabis", url, MenuType::Unspecified)
}

fn record(name: &str) -> RawProductRecord {
    RawProductRecord::named(name)
}

/// Feeds a canonical row back through the normalizer as if a strategy had
/// produced it.
fn as_raw(row: &CanonicalRow) -> RawProductRecord {
    let opt = |s: &str| (!s.is_empty()).then(|| s.to_owned());
    RawProductRecord {
        name: row.product.clone(),
        category: opt(&row.category),
        brand: opt(&row.brand),
        price: opt(&row.price),
        thc: opt(&row.thc),
        cbd: opt(&row.cbd),
        size: opt(&row.size),
        sku: opt(&row.sku),
        source_url: opt(&row.source_url),
    }
}

#[test]
fn normalize_trims_and_formats_price() {
    let req = request("https://example.com/menu");
    let raw = RawProductRecord {
        price: Some(" 45 ".to_owned()),
        thc: Some("24.1%".to_owned()),
        size: Some(" 3.5g".to_owned()),
        ..record("  Blue   Dream ")
    };
    let row = normalize(&raw, &req, "graphql", "dutchie");
    assert_eq!(row.product, "Blue Dream");
    assert_eq!(row.price, "$45.00");
    assert_eq!(row.thc, "24.1%");
    assert_eq!(row.size, "3.5g");
    assert_eq!(row.source, "graphql");
    assert_eq!(row.engine, "dutchie");
    assert_eq!(row.dispensary, "Solar Cannabis");
}

#[test]
fn normalize_leaves_unresolvable_fields_blank() {
    let req = request("https://example.com/menu");
    let raw = RawProductRecord {
        price: Some("call for price".to_owned()),
        ..record("Mystery Tin")
    };
    let row = normalize(&raw, &req, "ocr", "");
    assert_eq!(row.price, "");
    assert_eq!(row.brand, "");
    assert_eq!(row.category, "");
}

#[test]
fn source_url_falls_back_to_request_url() {
    let req = request("https://example.com/menu");
    let row = normalize(&record("Blue Dream"), &req, "ocr", "");
    assert_eq!(row.source_url, "https://example.com/menu");

    let with_url = RawProductRecord {
        source_url: Some("https://example.com/p/blue-dream".to_owned()),
        ..record("Blue Dream")
    };
    let row = normalize(&with_url, &req, "structured-data", "");
    assert_eq!(row.source_url, "https://example.com/p/blue-dream");
}

#[test]
fn normalize_is_idempotent() {
    let req = request("https://example.com/medical/menu");
    let raw = RawProductRecord {
        category: Some(" Flower ".to_owned()),
        brand: Some("Grassroots".to_owned()),
        price: Some("$1,045.5".to_owned()),
        thc: Some("22.5%".to_owned()),
        cbd: Some("0.1%".to_owned()),
        size: Some("1oz".to_owned()),
        sku: Some("GR-1OZ".to_owned()),
        ..record(" Blue Dream ")
    };
    let once = normalize(&raw, &req, "graphql", "dutchie");
    let twice = normalize(&as_raw(&once), &req, "graphql", "dutchie");
    assert_eq!(once, twice);
}

#[test]
fn menu_type_is_inferred_from_medical_path() {
    let req = request("https://shop.example.com/stores/solar/medical/menu");
    let row = normalize(&record("Blue Dream"), &req, "structured-data", "");
    assert_eq!(row.menu_type, "med");
}

#[test]
fn explicit_menu_type_is_stamped() {
    let req = ScanRequest::new("Solar", "https://example.com/menu", MenuType::Rec);
    let row = normalize(&record("Blue Dream"), &req, "structured-data", "");
    assert_eq!(row.menu_type, "rec");
}

#[test]
fn normalize_all_drops_blank_names() {
    let req = request("https://example.com/menu");
    let rows = normalize_all(&[record("  "), record("Blue Dream")], &req, "ocr", "");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].product, "Blue Dream");
}

#[test]
fn dedup_keeps_most_complete_row_at_first_position() {
    let req = request("https://example.com/menu");
    let sparse = normalize(
        &RawProductRecord {
            size: Some("3.5g".to_owned()),
            ..record("Blue Dream")
        },
        &req,
        "graphql",
        "dutchie",
    );
    let other = normalize(&record("Sour Diesel"), &req, "graphql", "dutchie");
    let full = normalize(
        &RawProductRecord {
            size: Some("3.5g".to_owned()),
            price: Some("45".to_owned()),
            brand: Some("Grassroots".to_owned()),
            ..record("Blue Dream")
        },
        &req,
        "graphql",
        "dutchie",
    );

    let rows = dedup_rows(vec![sparse, other, full.clone()]);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], full);
    assert_eq!(rows[1].product, "Sour Diesel");
}

#[test]
fn dedup_ties_keep_first_seen() {
    let req = request("https://example.com/menu");
    let first = normalize(
        &RawProductRecord {
            price: Some("40".to_owned()),
            ..record("Blue Dream")
        },
        &req,
        "graphql",
        "",
    );
    let second = normalize(
        &RawProductRecord {
            price: Some("45".to_owned()),
            ..record("Blue Dream")
        },
        &req,
        "graphql",
        "",
    );
    let rows = dedup_rows(vec![first, second]);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].price, "$40.00");
}

#[test]
fn dedup_output_has_unique_keys() {
    let req = request("https://example.com/menu");
    let rows: Vec<CanonicalRow> = ["A", "B", "A", "C", "B", "A"]
        .iter()
        .map(|n| normalize(&record(n), &req, "ocr", ""))
        .collect();
    let deduped = dedup_rows(rows);
    let mut keys: Vec<_> = deduped.iter().map(CanonicalRow::dedup_key).collect();
    let before = keys.len();
    keys.dedup();
    assert_eq!(before, 3);
    assert_eq!(keys.len(), 3);
}
