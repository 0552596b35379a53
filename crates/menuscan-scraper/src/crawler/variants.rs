//! Expands one catalog product into per-variant raw records.

use menuscan_core::MenuType;
use serde_json::{Map, Value};

use super::payload::{get_ci, price_text, stock_flag, text_or_name};
use crate::parse::json_scalar_text;
use crate::raw::RawProductRecord;

/// Product-level fields shared by every variant.
struct ProductFields {
    name: String,
    id: Option<String>,
    category: Option<String>,
    brand: Option<String>,
    thc: Option<String>,
    cbd: Option<String>,
}

/// Whether a product should be emitted at all. A product without a stock
/// field is treated as in stock; variants are filtered separately.
pub(super) fn product_in_stock(product: &Map<String, Value>) -> bool {
    stock_flag(product).unwrap_or(true)
}

/// One record per in-stock variant, or a single product-level record when the
/// product lists no variants.
pub(super) fn product_records(
    product: &Map<String, Value>,
    fallback_category: &str,
    menu_type: MenuType,
) -> Vec<RawProductRecord> {
    let Some(fields) = product_fields(product, fallback_category) else {
        return Vec::new();
    };

    if let Some(variants) = get_ci(product, &["variants"]).and_then(Value::as_array) {
        let objects: Vec<&Map<String, Value>> = variants.iter().filter_map(Value::as_object).collect();
        if !objects.is_empty() {
            return objects
                .into_iter()
                .filter(|v| stock_flag(v).unwrap_or(true))
                .map(|v| variant_record(&fields, v))
                .collect();
        }
    }

    if let Some(options) = get_ci(product, &["options"]).and_then(Value::as_array) {
        if options.iter().any(Value::is_object) {
            return options
                .iter()
                .filter_map(Value::as_object)
                .filter(|v| stock_flag(v).unwrap_or(true))
                .map(|v| variant_record(&fields, v))
                .collect();
        }
        let sizes: Vec<String> = options.iter().filter_map(json_scalar_text).collect();
        if !sizes.is_empty() {
            return parallel_option_records(&fields, product, &sizes, menu_type);
        }
    }

    let mut record = base_record(&fields);
    record.price = get_ci(product, &["specialPrice", "price", "basePrice", "amount"]).and_then(price_text);
    record.size = get_ci(product, &["size", "weight"]).and_then(json_scalar_text);
    vec![record]
}

fn product_fields(product: &Map<String, Value>, fallback_category: &str) -> Option<ProductFields> {
    let name = get_ci(product, &["name", "title", "displayName"])
        .and_then(json_scalar_text)
        .filter(|n| !n.trim().is_empty())?;
    let category = get_ci(product, &["category", "type", "productType", "kind"])
        .and_then(text_or_name)
        .or_else(|| Some(fallback_category.to_owned()).filter(|c| !c.is_empty()));
    Some(ProductFields {
        name,
        id: get_ci(product, &["id", "productId", "_id", "slug"]).and_then(json_scalar_text),
        category,
        brand: get_ci(product, &["brand", "brandInfo", "brandName"]).and_then(text_or_name),
        thc: cannabinoid(product, "thc"),
        cbd: cannabinoid(product, "cbd"),
    })
}

fn base_record(fields: &ProductFields) -> RawProductRecord {
    RawProductRecord {
        name: fields.name.clone(),
        category: fields.category.clone(),
        brand: fields.brand.clone(),
        thc: fields.thc.clone(),
        cbd: fields.cbd.clone(),
        sku: fields.id.clone(),
        ..RawProductRecord::default()
    }
}

fn variant_record(fields: &ProductFields, variant: &Map<String, Value>) -> RawProductRecord {
    let mut record = base_record(fields);
    record.price =
        get_ci(variant, &["specialPrice", "price", "amount", "listPrice"]).and_then(price_text);
    record.size = get_ci(variant, &["size", "weight", "option"]).and_then(json_scalar_text);
    if let Some(sku) = get_ci(variant, &["id", "variantId", "sku"]).and_then(json_scalar_text) {
        record.sku = Some(sku);
    }
    record
}

/// Catalogs that list sizes as plain strings with a parallel price array.
/// Medical menus prefer the medical price list when it is present.
fn parallel_option_records(
    fields: &ProductFields,
    product: &Map<String, Value>,
    sizes: &[String],
    menu_type: MenuType,
) -> Vec<RawProductRecord> {
    let price_keys: &[&str] = match menu_type {
        MenuType::Med => &["medicalSpecialPrices", "medicalPrices", "prices", "recPrices"],
        MenuType::Rec | MenuType::Unspecified => {
            &["recSpecialPrices", "recPrices", "prices", "medicalPrices"]
        }
    };
    let prices = price_keys
        .iter()
        .find_map(|key| {
            get_ci(product, &[*key])
                .and_then(Value::as_array)
                .filter(|list| !list.is_empty() && list.iter().any(|v| !v.is_null()))
        })
        .cloned()
        .unwrap_or_default();

    sizes
        .iter()
        .enumerate()
        .map(|(i, size)| {
            let mut record = base_record(fields);
            record.size = Some(size.clone());
            record.price = prices.get(i).and_then(price_text);
            record
        })
        .collect()
}

/// Reads THC or CBD from a `cannabinoids` list, a `THCContent`-style range
/// object, or a plain scalar field.
fn cannabinoid(product: &Map<String, Value>, which: &str) -> Option<String> {
    if let Some(list) = get_ci(product, &["cannabinoids", "cannabinoidsV2"]).and_then(Value::as_array) {
        for entry in list.iter().filter_map(Value::as_object) {
            let label = get_ci(entry, &["name", "cannabinoid"])
                .and_then(text_or_name)
                .unwrap_or_default()
                .to_ascii_lowercase();
            if label.starts_with(which) {
                if let Some(value) = get_ci(entry, &["value", "amount"]).and_then(json_scalar_text) {
                    return Some(with_unit(value, entry));
                }
            }
        }
    }

    let content_key = format!("{which}Content");
    if let Some(content) = get_ci(product, &[content_key.as_str()]).and_then(Value::as_object) {
        let value = get_ci(content, &["range"])
            .and_then(Value::as_array)
            .and_then(|r| r.last())
            .and_then(json_scalar_text)
            .or_else(|| get_ci(content, &["value"]).and_then(json_scalar_text));
        if let Some(value) = value {
            return Some(with_unit(value, content));
        }
    }

    get_ci(product, &[which]).and_then(json_scalar_text)
}

fn with_unit(value: String, holder: &Map<String, Value>) -> String {
    let unit = get_ci(holder, &["unit", "unitText"])
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_ascii_lowercase();
    if unit.starts_with("percent") || unit == "%" {
        format!("{value}%")
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: &Value) -> &Map<String, Value> {
        value.as_object().unwrap()
    }

    #[test]
    fn expands_in_stock_variants_only() {
        let product = json!({
            "id": "p1",
            "name": "Blue Dream",
            "brand": {"name": "Solar Farms"},
            "cannabinoids": [{"name": "THC", "value": 24.1, "unit": "PERCENTAGE"}],
            "variants": [
                {"id": "v1", "size": "1g", "price": 15, "inStock": true},
                {"id": "v2", "size": "3.5g", "specialPrice": 40.5, "price": 45, "inStock": true},
                {"id": "v3", "size": "7g", "price": 80, "inStock": false}
            ]
        });
        let records = product_records(obj(&product), "Flower", MenuType::Rec);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].size.as_deref(), Some("1g"));
        assert_eq!(records[0].price.as_deref(), Some("15"));
        assert_eq!(records[0].sku.as_deref(), Some("v1"));
        assert_eq!(records[1].price.as_deref(), Some("40.5"));
        assert_eq!(records[1].brand.as_deref(), Some("Solar Farms"));
        assert_eq!(records[1].thc.as_deref(), Some("24.1%"));
        assert_eq!(records[1].category.as_deref(), Some("Flower"));
    }

    #[test]
    fn product_without_variants_yields_one_record() {
        let product = json!({"id": 77, "name": "Gummies", "price": {"amount": 20}, "category": "Edibles"});
        let records = product_records(obj(&product), "Flower", MenuType::Rec);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].price.as_deref(), Some("20"));
        assert_eq!(records[0].sku.as_deref(), Some("77"));
        assert_eq!(records[0].category.as_deref(), Some("Edibles"));
    }

    #[test]
    fn string_options_pair_with_menu_specific_prices() {
        let product = json!({
            "name": "Sour Diesel",
            "Options": ["1g", "3.5g"],
            "recPrices": [12, 40],
            "medicalPrices": [10, 35],
            "THCContent": {"unit": "PERCENTAGE", "range": [21.0]}
        });
        let med = product_records(obj(&product), "", MenuType::Med);
        assert_eq!(med.len(), 2);
        assert_eq!(med[1].price.as_deref(), Some("35"));
        assert_eq!(med[1].thc.as_deref(), Some("21%"));
        let rec = product_records(obj(&product), "", MenuType::Rec);
        assert_eq!(rec[1].price.as_deref(), Some("40"));
        assert_eq!(rec[0].category, None);
    }

    #[test]
    fn unnamed_product_is_skipped() {
        let product = json!({"id": "p1", "price": 10});
        assert!(product_records(obj(&product), "Flower", MenuType::Rec).is_empty());
    }

    #[test]
    fn product_stock_flag_is_respected() {
        assert!(!product_in_stock(obj(&json!({"name": "x", "isAvailable": false}))));
        assert!(!product_in_stock(obj(&json!({"name": "x", "quantity": 0}))));
        assert!(product_in_stock(obj(&json!({"name": "x"}))));
    }
}
