//! Site characteristics and business-domain constants
//!
//! Values here are the built-in defaults. Services never read them
//! directly; they receive them through the configuration types so tests can
//! run with alternate rates and thresholds.

/// Currency constants
pub mod currency {
    /// EUR → BGN peg (ERM II, legally fixed since 10 July 2020).
    ///
    /// This is not a market rate and is never fetched at runtime.
    pub const EUR_TO_BGN: f64 = 1.95583;

    /// Relative tolerance used for every price-like comparison (1%).
    pub const PRICE_TOLERANCE: f64 = 0.01;
}

/// Barcode (GTIN) shape constants
pub mod barcode {
    /// EAN-8, UPC-A, EAN-13 and GTIN-14.
    pub const VALID_GTIN_LENGTHS: &[usize] = &[8, 12, 13, 14];

    /// JSON-LD keys that may carry a GTIN/EAN. `mpn` is deliberately absent:
    /// vendors store internal stock-keeping numbers there.
    pub const STRUCTURED_DATA_KEYS: &[&str] = &["gtin", "gtin13", "gtin8", "gtin12", "gtin14", "ean"];
}

/// Quality gate constants
pub mod quality {
    /// Batch fails when errored / total is strictly greater than this.
    pub const ERROR_RATE_GATE: f64 = 0.05;

    /// Periodic summary cadence for batch runs.
    pub const SUMMARY_EVERY: usize = 100;
}

/// Field validation limits
pub mod limits {
    pub const TITLE_MIN_LEN: usize = 5;
    pub const TITLE_MAX_LEN: usize = 250;
    pub const HANDLE_MAX_LEN: usize = 200;
    pub const PRICE_MAX: f64 = 10_000.0;
    pub const SEO_TITLE_MAX_LEN: usize = 70;
    pub const SEO_DESCRIPTION_MAX_LEN: usize = 155;
    pub const IMAGE_ALT_MAX_LEN: usize = 125;
    pub const SECTION_MAX_LEN: usize = 1500;
}

/// Site markup constants
pub mod site {
    /// Client-side component that carries the product payload.
    pub const COMPONENT_TAG: &str = "add-to-cart";

    /// Attribute holding the entity-escaped JSON payload.
    pub const COMPONENT_ATTRIBUTE: &str = ":product";

    /// Default source domain used to absolutise relative image URLs.
    pub const DEFAULT_SITE_DOMAIN: &str = "benu.bg";

    /// Store name appended to SEO titles.
    pub const STORE_NAME: &str = "ViaPharma";

    /// Shopping-feed category when no category maps to one.
    pub const DEFAULT_GOOGLE_CATEGORY: &str = "Health & Beauty > Health Care > Pharmacy";

    /// Breadcrumb entries that are never categories.
    pub const BREADCRUMB_HOME: &[&str] = &["начало", "home"];
}
