use serde::{Deserialize, Serialize};

use super::provenance::ExtractionMethod;

/// Well-known content section keys, in page order.
pub mod section_keys {
    pub const DETAILS: &str = "details";
    pub const COMPOSITION: &str = "composition";
    pub const USAGE: &str = "usage";
    pub const CONTRAINDICATIONS: &str = "contraindications";
    pub const MORE_INFO: &str = "more_info";
}

/// Product image with position and alt text
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProductImage {
    pub source_url: String,
    /// 1-based gallery position
    pub position: usize,
    pub alt_text: String,
}

/// One named content section captured from the product tabs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSection {
    pub key: String,
    pub content: String,
}

/// Ordered content sections keyed by section name
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContentSections {
    sections: Vec<ContentSection>,
}

impl ContentSections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a section, keeping first-insertion order.
    pub fn set(&mut self, key: &str, content: impl Into<String>) {
        let content = content.into();
        match self.sections.iter_mut().find(|s| s.key == key) {
            Some(existing) => existing.content = content,
            None => self.sections.push(ContentSection { key: key.to_string(), content }),
        }
    }

    /// Section content, or "" when the section was not captured.
    pub fn get(&self, key: &str) -> &str {
        self.sections
            .iter()
            .find(|s| s.key == key)
            .map_or("", |s| s.content.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContentSection> {
        self.sections.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(|s| s.content.is_empty())
    }
}

/// Canonical product record reconciled from all page sources.
///
/// Empty text fields are `""`, empty lists are `[]` and absent amounts are
/// `None`; there is no other representation of "missing". Amounts are
/// rounded to cents. `price` / `compare_at_price` are BGN, the `_eur`
/// variants are EUR.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CanonicalProduct {
    // Core fields
    pub title: String,
    pub url: String,
    pub handle: String,
    pub brand: String,
    pub sku: String,
    pub barcode: String,

    // Pricing
    pub price: Option<f64>,
    pub price_eur: Option<f64>,
    pub compare_at_price: Option<f64>,
    pub compare_at_price_eur: Option<f64>,
    pub availability: String,

    // Taxonomy
    pub category_path: Vec<String>,
    pub tags: Vec<String>,
    pub product_type: String,

    // Content
    pub images: Vec<ProductImage>,
    pub sections: ContentSections,
    pub description: String,

    // SEO / shopping feed
    pub seo_title: String,
    pub seo_description: String,
    pub application_form: String,
    pub target_audience: String,
    pub google_age_group: String,
    pub google_product_category: String,
    /// Manufacturer part number for the feed; the store SKU
    pub google_mpn: String,

    // Shipping
    pub weight_grams: u32,

    // Extraction metadata
    pub extraction_method: ExtractionMethod,
    /// Set when the selling price did not come from the component payload.
    pub price_fallback_used: bool,
}

impl CanonicalProduct {
    /// A compare-at price exists only for promotional products.
    pub fn is_on_promotion(&self) -> bool {
        self.compare_at_price_eur.is_some()
    }

    /// Identifier used in logs and reports.
    pub fn identifier(&self) -> &str {
        if self.handle.is_empty() { &self.url } else { &self.handle }
    }
}

/// Round an amount to cents.
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Format an optional amount the way the export layer expects ("" when absent).
pub fn format_amount(amount: Option<f64>) -> String {
    amount.map(|a| format!("{a:.2}")).unwrap_or_default()
}
