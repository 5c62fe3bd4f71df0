//! Cross-source disagreement warnings
//!
//! Each check compares what two sources say about one field. A check with
//! nothing to compare on either side stays silent. Findings never block a
//! product; they surface in the quality report as `consistency_*` warnings.

#![allow(clippy::uninlined_format_args)]

use std::collections::BTreeSet;
use std::fmt;

use tracing::debug;

use crate::domain::product::{CanonicalProduct, section_keys};
use crate::domain::provenance::{ProductField, SourceKind};
use crate::domain::quality::{ConsistencyFinding, SourcedValue};
use crate::domain::services::{BrandMatcher, normalize_barcode};
use crate::infrastructure::config::{ExtractionConfig, ValidationConfig};
use crate::infrastructure::parsing::image_url::{absolutize, dedup_key, is_product_image};
use crate::infrastructure::parsing::section_splitter::fold_case;
use crate::infrastructure::parsing::{FieldValue, SourceViews};

/// The checks, in the order their findings are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    Price,
    Title,
    Brand,
    Images,
    CategoryPath,
    PromoLogic,
    Barcode,
    Section(&'static str),
}

pub const DECLARED_CHECKS: &[Check] = &[
    Check::Price,
    Check::Title,
    Check::Brand,
    Check::Images,
    Check::CategoryPath,
    Check::PromoLogic,
    Check::Barcode,
    Check::Section(section_keys::DETAILS),
    Check::Section(section_keys::COMPOSITION),
    Check::Section(section_keys::USAGE),
    Check::Section(section_keys::CONTRAINDICATIONS),
];

impl Check {
    pub fn name(self) -> String {
        match self {
            Self::Price => "price".to_string(),
            Self::Title => "title".to_string(),
            Self::Brand => "brand".to_string(),
            Self::Images => "images".to_string(),
            Self::CategoryPath => "category_path".to_string(),
            Self::PromoLogic => "promo_logic".to_string(),
            Self::Barcode => "barcode".to_string(),
            Self::Section(key) => format!("section_{}", key),
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[derive(Debug, Clone)]
pub struct ConsistencyChecker {
    brands: BrandMatcher,
    eur_to_bgn: f64,
    tolerance: f64,
    site_domain: String,
}

impl ConsistencyChecker {
    pub fn new(extraction: &ExtractionConfig, validation: &ValidationConfig) -> Self {
        Self {
            brands: BrandMatcher::new(&extraction.known_brands),
            eur_to_bgn: validation.eur_to_bgn,
            tolerance: validation.price_tolerance,
            site_domain: extraction.site_domain.clone(),
        }
    }

    /// Run every declared check against the views and the resolved product
    pub fn check(&self, views: &SourceViews<'_>, product: &CanonicalProduct) -> Vec<ConsistencyFinding> {
        let findings: Vec<ConsistencyFinding> = DECLARED_CHECKS
            .iter()
            .filter_map(|&check| self.run(check, views, product))
            .collect();
        if !findings.is_empty() {
            debug!("{} consistency findings for {}", findings.len(), product.identifier());
        }
        findings
    }

    pub fn run(&self, check: Check, views: &SourceViews<'_>, product: &CanonicalProduct) -> Option<ConsistencyFinding> {
        match check {
            Check::Price => self.check_price(views),
            Check::Title => check_title(views),
            Check::Brand => self.check_brand(views, product),
            Check::Images => self.check_images(views),
            Check::CategoryPath => check_category_path(views),
            Check::PromoLogic => self.check_promo_logic(views),
            Check::Barcode => check_barcode(views),
            Check::Section(key) => check_section(views, key),
        }
    }

    /// Component price vs structured-data offer, in BGN
    fn check_price(&self, views: &SourceViews<'_>) -> Option<ConsistencyFinding> {
        let bgn = |kind| {
            views
                .get(kind, ProductField::Price)
                .and_then(|v| v.as_money())
                .and_then(|m| m.normalized(self.eur_to_bgn))
                .map(|(_, bgn)| bgn)
                .filter(|bgn| *bgn > 0.0)
        };
        let component = bgn(SourceKind::Component)?;
        let structured = bgn(SourceKind::StructuredData)?;

        let deviation = (component - structured).abs() / component;
        (deviation > self.tolerance).then(|| {
            finding(
                Check::Price,
                ProductField::Price,
                SourcedValue::new(SourceKind::Component, format!("{:.2} BGN", component)),
                SourcedValue::new(SourceKind::StructuredData, format!("{:.2} BGN", structured)),
                Some(deviation),
            )
        })
    }

    /// Structured-data brand vs the known brand the title starts with
    fn check_brand(&self, views: &SourceViews<'_>, product: &CanonicalProduct) -> Option<ConsistencyFinding> {
        let structured = text(views, SourceKind::StructuredData, ProductField::Brand)?;
        let from_title = self.brands.match_title(&product.title)?;
        (fold_case(&structured) != fold_case(from_title)).then(|| {
            finding(
                Check::Brand,
                ProductField::Brand,
                SourcedValue::new(SourceKind::StructuredData, structured),
                SourcedValue::new(SourceKind::TitleHeuristic, from_title),
                None,
            )
        })
    }

    /// The two galleries must share at least one product image
    fn check_images(&self, views: &SourceViews<'_>) -> Option<ConsistencyFinding> {
        let paths = |kind| -> Option<BTreeSet<String>> {
            let raw = views.get(kind, ProductField::Images).and_then(FieldValue::into_list)?;
            let set: BTreeSet<String> = raw
                .iter()
                .map(|r| absolutize(r, &self.site_domain))
                .filter(|url| is_product_image(url))
                .map(|url| dedup_key(&url).to_string())
                .collect();
            (!set.is_empty()).then_some(set)
        };
        let structured = paths(SourceKind::StructuredData)?;
        let dom = paths(SourceKind::Dom)?;

        structured.is_disjoint(&dom).then(|| {
            finding(
                Check::Images,
                ProductField::Images,
                SourcedValue::new(SourceKind::StructuredData, join(&structured)),
                SourcedValue::new(SourceKind::Dom, join(&dom)),
                None,
            )
        })
    }

    /// A stated pre-discount price must exceed the selling price
    fn check_promo_logic(&self, views: &SourceViews<'_>) -> Option<ConsistencyFinding> {
        let component = views.component()?;
        let (current, pre) = (component.current?, component.pre_discount?);
        if pre == current || pre <= 0.0 {
            return None;
        }
        (current > pre).then(|| {
            finding(
                Check::PromoLogic,
                ProductField::CompareAtPrice,
                SourcedValue::new(SourceKind::Component, format!("price={:.2} EUR", current)),
                SourcedValue::new(SourceKind::Component, format!("compare_at={:.2} EUR", pre)),
                None,
            )
        })
    }
}

/// Case-insensitive containment either way
fn check_title(views: &SourceViews<'_>) -> Option<ConsistencyFinding> {
    let structured = text(views, SourceKind::StructuredData, ProductField::Title)?;
    let dom = text(views, SourceKind::Dom, ProductField::Title)?;
    let (a, b) = (fold_case(&structured), fold_case(&dom));
    (!a.contains(&b) && !b.contains(&a)).then(|| {
        finding(
            Check::Title,
            ProductField::Title,
            SourcedValue::new(SourceKind::StructuredData, structured),
            SourcedValue::new(SourceKind::Dom, dom),
            None,
        )
    })
}

/// Same set of categories, order ignored
fn check_category_path(views: &SourceViews<'_>) -> Option<ConsistencyFinding> {
    let crumbs = |kind| -> Option<(Vec<String>, BTreeSet<String>)> {
        let list = views.get(kind, ProductField::CategoryPath).and_then(FieldValue::into_list)?;
        let set = list.iter().map(|c| fold_case(c.trim())).collect();
        Some((list, set))
    };
    let (structured, structured_set) = crumbs(SourceKind::StructuredData)?;
    let (dom, dom_set) = crumbs(SourceKind::Dom)?;

    (structured_set != dom_set).then(|| {
        finding(
            Check::CategoryPath,
            ProductField::CategoryPath,
            SourcedValue::new(SourceKind::StructuredData, structured.join(" > ")),
            SourcedValue::new(SourceKind::Dom, dom.join(" > ")),
            None,
        )
    })
}

/// Structured-data GTINs vs the printed barcode. Any shared code agrees.
fn check_barcode(views: &SourceViews<'_>) -> Option<ConsistencyFinding> {
    let codes = |kind| -> Option<Vec<String>> {
        let list = views.get(kind, ProductField::Barcode).and_then(FieldValue::into_list)?;
        let mut codes: Vec<String> = Vec::new();
        for code in list.iter().map(|c| normalize_barcode(c)).filter(|c| !c.is_empty()) {
            if !codes.contains(&code) {
                codes.push(code);
            }
        }
        (!codes.is_empty()).then_some(codes)
    };
    let structured = codes(SourceKind::StructuredData)?;
    let dom = codes(SourceKind::Dom)?;

    (!structured.iter().any(|code| dom.contains(code))).then(|| {
        finding(
            Check::Barcode,
            ProductField::Barcode,
            SourcedValue::new(SourceKind::StructuredData, structured.join(", ")),
            SourcedValue::new(SourceKind::Dom, dom.join(", ")),
            None,
        )
    })
}

/// Header printed on the page but nothing captured under it
fn check_section(views: &SourceViews<'_>, key: &'static str) -> Option<ConsistencyFinding> {
    let split = &views.dom().split;
    (split.headers_seen.contains(key) && split.sections.get(key).is_empty()).then(|| {
        finding(
            Check::Section(key),
            ProductField::Sections,
            SourcedValue::new(SourceKind::Dom, format!("header '{}' present", key)),
            SourcedValue::new(SourceKind::Derived, ""),
            None,
        )
    })
}

fn text(views: &SourceViews<'_>, kind: SourceKind, field: ProductField) -> Option<String> {
    views
        .get(kind, field)
        .as_ref()
        .and_then(FieldValue::as_text)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn join(set: &BTreeSet<String>) -> String {
    set.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

fn finding(
    check: Check,
    field: ProductField,
    left: SourcedValue,
    right: SourcedValue,
    deviation: Option<f64>,
) -> ConsistencyFinding {
    ConsistencyFinding::new(&check.name(), field.as_str(), left, right, deviation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::field_resolver::FieldResolver;
    use crate::infrastructure::parsing::PageParser;

    fn findings(markup: &str) -> Vec<ConsistencyFinding> {
        let mut config = ExtractionConfig::default();
        config.known_brands = ["Nivea", "Vichy"].iter().map(|b| b.to_string()).collect();
        let validation = ValidationConfig::default();
        let parser = PageParser::new(&config).unwrap();
        let doc = parser.parse("https://benu.bg/p", markup).unwrap();
        let views = parser.views(&doc);
        let product = FieldResolver::new(&config, &validation).resolve(&views);
        ConsistencyChecker::new(&config, &validation).check(&views, &product)
    }

    fn checks(found: &[ConsistencyFinding]) -> Vec<&str> {
        found.iter().map(|f| f.check.as_str()).collect()
    }

    fn json_ld(body: &str) -> String {
        format!(r#"<script type="application/ld+json">{{"@type":"Product",{}}}</script>"#, body)
    }

    #[test]
    fn test_agreeing_sources_are_silent() {
        let markup = format!(
            r#"<html><body>
            <add-to-cart :product='{{"variants":[{{"price":6.40,"discountedPrice":6.40}}]}}'></add-to-cart>
            {}
            <h1>Nivea Creme 150ml</h1>
            <p>Баркод: 4005808158409</p>
            </body></html>"#,
            json_ld(r#""name":"Nivea Creme","brand":"Nivea","gtin13":"4005808158409","offers":{"price":"6.41"}"#)
        );
        assert!(findings(&markup).is_empty());
    }

    #[test]
    fn test_single_sided_data_is_silent() {
        let markup = "<html><body><h1>Nivea Creme 150ml</h1><p>Баркод: 4005808158409</p></body></html>";
        assert!(findings(markup).is_empty());
    }

    #[test]
    fn test_disagreements_are_reported_in_declared_order() {
        let markup = format!(
            r#"<html><body>
            <add-to-cart :product='{{"variants":[{{"price":5.00,"discountedPrice":9.99}}]}}'></add-to-cart>
            {}
            <h1>Vichy Mineral 89</h1>
            <p>Баркод: 3337875543248</p>
            </body></html>"#,
            json_ld(r#""name":"Nivea Creme","brand":"Nivea","gtin13":"4005808158409","offers":{"price":"6.40"}"#)
        );
        let found = findings(&markup);
        assert_eq!(checks(&found), vec!["price", "title", "promo_logic", "barcode"]);
        assert!(found.iter().all(|f| f.severity == crate::domain::quality::IssueSeverity::Warning));
        assert!(found[0].deviation.is_some_and(|d| d > 0.3));
    }

    #[test]
    fn test_brand_conflict_with_title_prefix() {
        let markup = format!(
            "<html><body>{}</body></html>",
            json_ld(r#""name":"Vichy Mineral 89","brand":"Nivea""#)
        );
        let found = findings(&markup);
        assert_eq!(checks(&found), vec!["brand"]);
        assert_eq!(found[0].right.value, "Vichy");
    }

    #[test]
    fn test_empty_section_after_header() {
        let markup = r#"<html><body>
            <h1>Aspirin</h1>
            <div>Противопоказания</div>
            <div>Все още няма ревюта</div>
            </body></html>"#;
        let found = findings(markup);
        assert_eq!(checks(&found), vec!["section_contraindications"]);
        assert_eq!(found[0].as_issue().field, "consistency_section_contraindications");
    }

    #[test]
    fn test_check_names() {
        let names: Vec<String> = DECLARED_CHECKS.iter().map(|c| c.name()).collect();
        assert_eq!(names.len(), 11);
        assert_eq!(names[7], "section_details");
        assert_eq!(names[10], "section_contraindications");
    }
}
