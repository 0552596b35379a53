//! Strategy output before normalization.

/// One product (or one purchasable variant) as a strategy found it.
///
/// Values are untrimmed text exactly as extracted; the normalizer owns all
/// cleanup. `source_url` is `None` when the record came from the scanned page
/// itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawProductRecord {
    pub name: String,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub price: Option<String>,
    pub thc: Option<String>,
    pub cbd: Option<String>,
    pub size: Option<String>,
    pub sku: Option<String>,
    pub source_url: Option<String>,
}

impl RawProductRecord {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}
