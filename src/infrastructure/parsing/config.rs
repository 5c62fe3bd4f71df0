//! Parsing configuration for HTML extraction
//!
//! Centralized CSS selector lists for the markup reader. Each list is tried
//! in order; the first match with usable content wins.

use serde::{Deserialize, Serialize};

/// CSS selectors for product detail pages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DomSelectors {
    /// Selectors for the product title
    pub title: Vec<String>,

    /// Selectors for brand elements
    pub brand: Vec<String>,

    /// Breadcrumb links, in page order
    pub breadcrumb: Vec<String>,

    /// Price area containing "лв" / "€" amounts
    pub price_area: Vec<String>,

    /// Gallery images
    pub gallery_image: Vec<String>,

    /// Attribute table rows (label cell + value cell)
    pub attribute_row: Vec<String>,

    /// Stock status text
    pub availability: Vec<String>,

    /// Meta tags carrying brand/sku hints
    pub meta_brand: Vec<String>,
    pub meta_sku: Vec<String>,
}

impl Default for DomSelectors {
    fn default() -> Self {
        let list = |items: &[&str]| items.iter().map(|s| (*s).to_string()).collect::<Vec<_>>();
        Self {
            title: list(&["h1[itemprop='name']", "h1", ".product-title"]),
            brand: list(&["[itemprop='brand']", ".product-brand", ".brand", ".manufacturer"]),
            breadcrumb: list(&[".breadcrumb a", ".breadcrumbs a", "nav[aria-label='breadcrumb'] a"]),
            price_area: list(&[".product-info .product-prices", ".product-prices", ".price-box"]),
            gallery_image: list(&[
                ".site-gallery img",
                ".product-gallery img",
                ".gallery img",
                ".product-image img",
            ]),
            attribute_row: list(&[
                ".product-info tr",
                ".additional-info tr",
                "table.additional-attributes tr",
            ]),
            availability: list(&["div.stock", ".availability", "[itemprop='availability']"]),
            meta_brand: list(&["meta[property='product:brand']", "meta[itemprop='brand']"]),
            meta_sku: list(&["meta[property='product:retailer_item_id']", "meta[itemprop='sku']"]),
        }
    }
}

/// Image URL attributes, in preference order
pub const IMAGE_SOURCE_ATTRIBUTES: &[&str] = &["src", "data-src", "data-lazy"];

/// Structured-data script selector
pub const STRUCTURED_DATA_SCRIPT: &str = "script[type='application/ld+json']";

/// Schema types treated as the primary product
pub const PRODUCT_SCHEMA_TYPES: &[&str] = &["Product", "Drug"];

/// Attribute-table labels for the weight row
pub const WEIGHT_LABELS: &[&str] = &["тегло", "weight"];

/// Attribute-table labels for the brand row
pub const BRAND_LABELS: &[&str] = &["марка", "brand", "производител"];
