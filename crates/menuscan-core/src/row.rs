use serde::{Deserialize, Serialize};

/// Output column names in export order.
pub const COLUMNS: [&str; 13] = [
    "Dispensary",
    "Menu_Type",
    "Category",
    "Product",
    "Price",
    "Brand",
    "THC",
    "CBD",
    "Size",
    "SKU",
    "Source",
    "Source_URL",
    "Engine",
];

/// One normalized product row. Every field is text; unknown values are blank.
///
/// Field order matches [`COLUMNS`], so serializing a row through `csv` or
/// `serde_json` yields the export column order directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRow {
    #[serde(rename = "Dispensary")]
    pub dispensary: String,
    #[serde(rename = "Menu_Type")]
    pub menu_type: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Product")]
    pub product: String,
    #[serde(rename = "Price")]
    pub price: String,
    #[serde(rename = "Brand")]
    pub brand: String,
    #[serde(rename = "THC")]
    pub thc: String,
    #[serde(rename = "CBD")]
    pub cbd: String,
    #[serde(rename = "Size")]
    pub size: String,
    #[serde(rename = "SKU")]
    pub sku: String,
    #[serde(rename = "Source")]
    pub source: String,
    #[serde(rename = "Source_URL")]
    pub source_url: String,
    #[serde(rename = "Engine")]
    pub engine: String,
}

/// Identity of a row within one scan: `(Product, Size, SKU, Source_URL)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowKey {
    pub product: String,
    pub size: String,
    pub sku: String,
    pub source_url: String,
}

impl CanonicalRow {
    #[must_use]
    pub fn dedup_key(&self) -> RowKey {
        RowKey {
            product: self.product.clone(),
            size: self.size.clone(),
            sku: self.sku.clone(),
            source_url: self.source_url.clone(),
        }
    }

    /// Number of blank optional fields. Lower means more complete.
    ///
    /// `Dispensary`, `Product`, `Source` and `Menu_Type` are stamped by the
    /// pipeline and not counted.
    #[must_use]
    pub fn blank_optional_count(&self) -> usize {
        [
            &self.category,
            &self.price,
            &self.brand,
            &self.thc,
            &self.cbd,
            &self.size,
            &self.sku,
            &self.source_url,
            &self.engine,
        ]
        .iter()
        .filter(|v| v.trim().is_empty())
        .count()
    }

    /// Parses the `Price` column (`$N.NN`) back into a number.
    #[must_use]
    pub fn price_value(&self) -> Option<f64> {
        let digits = self.price.trim().trim_start_matches('$').replace(',', "");
        if digits.is_empty() {
            return None;
        }
        digits.parse::<f64>().ok()
    }

    /// The row as a fixed-order record of column values.
    #[must_use]
    pub fn values(&self) -> [&str; 13] {
        [
            &self.dispensary,
            &self.menu_type,
            &self.category,
            &self.product,
            &self.price,
            &self.brand,
            &self.thc,
            &self.cbd,
            &self.size,
            &self.sku,
            &self.source,
            &self.source_url,
            &self.engine,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(product: &str, price: &str) -> CanonicalRow {
        CanonicalRow {
            dispensary: "Solar".to_string(),
            product: product.to_string(),
            price: price.to_string(),
            source: "graphql".to_string(),
            ..CanonicalRow::default()
        }
    }

    #[test]
    fn serialized_field_order_matches_columns() {
        let json = serde_json::to_value(row("Blue Dream", "$45.00")).unwrap();
        let keys: Vec<&str> = json
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        let mut expected: Vec<&str> = COLUMNS.to_vec();
        let mut sorted_keys = keys.clone();
        expected.sort_unstable();
        sorted_keys.sort_unstable();
        assert_eq!(sorted_keys, expected);
    }

    #[test]
    fn blank_count_ignores_stamped_fields() {
        let mut r = row("Blue Dream", "$45.00");
        assert_eq!(r.blank_optional_count(), 8);
        r.thc = "24.1%".to_string();
        r.size = "3.5g".to_string();
        assert_eq!(r.blank_optional_count(), 6);
    }

    #[test]
    fn dedup_key_uses_product_size_sku_url() {
        let mut a = row("Blue Dream", "$45.00");
        let mut b = row("Blue Dream", "$40.00");
        a.size = "3.5g".to_string();
        b.size = "3.5g".to_string();
        assert_eq!(a.dedup_key(), b.dedup_key());
        b.sku = "BD-35".to_string();
        assert_ne!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn price_value_parses_formatted_price() {
        assert_eq!(row("x", "$1,045.50").price_value(), Some(1045.5));
        assert_eq!(row("x", "").price_value(), None);
    }

    #[test]
    fn values_follow_column_order() {
        let r = row("Blue Dream", "$45.00");
        let values = r.values();
        assert_eq!(values[0], "Solar");
        assert_eq!(values[3], "Blue Dream");
        assert_eq!(values[4], "$45.00");
        assert_eq!(values[10], "graphql");
    }
}
