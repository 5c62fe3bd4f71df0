//! Rule-table validation of a resolved product
//!
//! Rules run in a fixed order and every violated rule yields exactly one
//! issue, so the output for a given product is always the same list.

#![allow(clippy::uninlined_format_args)]

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use super::barcode::is_valid_barcode;
use crate::domain::product::CanonicalProduct;
use crate::domain::quality::ValidationIssue;
use crate::infrastructure::config::ValidationConfig;

static HANDLE_FORMAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9-]+$").expect("static regex"));

#[derive(Debug, Clone)]
pub struct FieldValidator {
    config: ValidationConfig,
}

impl FieldValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn validate(&self, product: &CanonicalProduct) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        self.check_title(product, &mut issues);
        check_url(product, &mut issues);
        self.check_handle(product, &mut issues);
        self.check_price(product, &mut issues);
        check_required(product, &mut issues);
        self.check_image_urls(product, &mut issues);
        self.check_currency_conversion(product, &mut issues);
        self.check_warnings(product, &mut issues);
        issues
    }

    fn check_title(&self, product: &CanonicalProduct, issues: &mut Vec<ValidationIssue>) {
        let len = product.title.trim().chars().count();
        if len == 0 {
            issues.push(ValidationIssue::error("title", "empty"));
        } else if len < self.config.title_min_len {
            issues.push(ValidationIssue::error("title", format!("too short ({} chars)", len)));
        } else if len > self.config.title_max_len {
            issues.push(ValidationIssue::error("title", format!("too long ({} chars)", len)));
        }
    }

    fn check_handle(&self, product: &CanonicalProduct, issues: &mut Vec<ValidationIssue>) {
        let handle = &product.handle;
        if handle.is_empty() {
            issues.push(ValidationIssue::error("handle", "missing"));
        } else if !HANDLE_FORMAT.is_match(handle) {
            issues.push(ValidationIssue::error("handle", format!("invalid format ({:?})", handle)));
        } else if handle.len() > self.config.handle_max_len {
            issues.push(ValidationIssue::error("handle", format!("too long ({} chars)", handle.len())));
        }
    }

    fn check_price(&self, product: &CanonicalProduct, issues: &mut Vec<ValidationIssue>) {
        match product.price {
            None => issues.push(ValidationIssue::error("price", "missing")),
            Some(price) if !price.is_finite() => {
                issues.push(ValidationIssue::error("price", format!("not a number ({})", price)));
            }
            Some(price) if price <= 0.0 => {
                issues.push(ValidationIssue::error("price", format!("must be > 0 (got {})", price)));
            }
            Some(price) if price > self.config.price_max => {
                issues.push(ValidationIssue::error("price", format!("suspiciously high ({})", price)));
            }
            Some(_) => {}
        }
    }

    fn check_image_urls(&self, product: &CanonicalProduct, issues: &mut Vec<ValidationIssue>) {
        for image in &product.images {
            let url = &image.source_url;
            if !url.starts_with("https://") {
                issues.push(ValidationIssue::error("images", format!("image URL must use https ({})", url)));
            } else if self.is_placeholder(url) {
                issues.push(ValidationIssue::error("images", format!("image URL on placeholder domain ({})", url)));
            }
        }
    }

    fn is_placeholder(&self, url: &str) -> bool {
        let Some(host) = Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_lowercase)) else {
            return false;
        };
        self.config
            .placeholder_domains
            .iter()
            .any(|domain| host == *domain || host.ends_with(&format!(".{}", domain)))
    }

    /// The BGN price must be the EUR price through the fixed rate
    fn check_currency_conversion(&self, product: &CanonicalProduct, issues: &mut Vec<ValidationIssue>) {
        let (Some(bgn), Some(eur)) = (product.price, product.price_eur) else {
            return;
        };
        let expected = eur * self.config.eur_to_bgn;
        if expected <= 0.0 {
            return;
        }
        let deviation = (bgn - expected).abs() / expected;
        if deviation > self.config.price_tolerance {
            issues.push(ValidationIssue::error(
                "price_eur",
                format!(
                    "price_eur consistency: {:.2} BGN vs {:.2} EUR x {} = {:.2} BGN",
                    bgn, eur, self.config.eur_to_bgn, expected
                ),
            ));
        }
    }

    fn check_warnings(&self, product: &CanonicalProduct, issues: &mut Vec<ValidationIssue>) {
        if !product.barcode.is_empty() && !is_valid_barcode(&product.barcode) {
            issues.push(ValidationIssue::warning(
                "barcode",
                format!("expected 8, 12, 13 or 14 digits ({:?})", product.barcode),
            ));
        }
        if product.description.trim().is_empty() {
            issues.push(ValidationIssue::warning("description", "missing"));
        }
        let seo_title_len = product.seo_title.chars().count();
        if seo_title_len > self.config.seo_title_max_len {
            issues.push(ValidationIssue::warning(
                "seo_title",
                format!("too long ({} > {} chars)", seo_title_len, self.config.seo_title_max_len),
            ));
        }
        let seo_description_len = product.seo_description.chars().count();
        if seo_description_len > self.config.seo_description_max_len {
            issues.push(ValidationIssue::warning(
                "seo_description",
                format!("too long ({} > {} chars)", seo_description_len, self.config.seo_description_max_len),
            ));
        }
    }
}

fn check_url(product: &CanonicalProduct, issues: &mut Vec<ValidationIssue>) {
    if !product.url.starts_with("https://") {
        issues.push(ValidationIssue::error("url", format!("must start with https:// ({:?})", product.url)));
    }
}

fn check_required(product: &CanonicalProduct, issues: &mut Vec<ValidationIssue>) {
    if product.brand.trim().is_empty() {
        issues.push(ValidationIssue::error("brand", "missing"));
    }
    if product.sku.trim().is_empty() {
        issues.push(ValidationIssue::error("sku", "missing"));
    }
    if product.category_path.is_empty() {
        issues.push(ValidationIssue::error("category_path", "missing"));
    }
    if product.images.is_empty() {
        issues.push(ValidationIssue::error("images", "no images"));
    }
}
