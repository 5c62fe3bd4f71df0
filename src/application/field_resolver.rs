//! Per-field source priority
//!
//! Every field walks a fixed list of sources and takes the first non-empty
//! answer. The resolver is pure: same document and configuration, same
//! product, including the recorded provenance.

#![allow(clippy::uninlined_format_args)]

use tracing::{debug, warn};

use crate::domain::product::{CanonicalProduct, ContentSections, ProductImage, round_cents};
use crate::domain::provenance::{FieldResolution, ProductField, SourceKind};
use crate::domain::services::{BrandMatcher, normalize_barcode};
use crate::infrastructure::config::{ExtractionConfig, ValidationConfig};
use crate::infrastructure::parsing::image_url::{absolutize, dedup_key, is_product_image};
use crate::infrastructure::parsing::{FieldValue, Money, SourceViews};

const PRICE_SOURCES: &[SourceKind] = &[SourceKind::Component, SourceKind::StructuredData, SourceKind::Dom];
const TITLE_SOURCES: &[SourceKind] = &[SourceKind::StructuredData, SourceKind::Dom];
const SKU_SOURCES: &[SourceKind] = &[SourceKind::StructuredData, SourceKind::PageMetadata];
const BARCODE_SOURCES: &[SourceKind] = &[SourceKind::StructuredData, SourceKind::Dom];
const CATEGORY_SOURCES: &[SourceKind] = &[SourceKind::StructuredData, SourceKind::Dom];
const IMAGE_SOURCES: &[SourceKind] = &[SourceKind::StructuredData, SourceKind::Dom];
const AVAILABILITY_SOURCES: &[SourceKind] = &[SourceKind::StructuredData, SourceKind::Dom];

/// schema.org availability values and their storefront wording
const AVAILABILITY_LABELS: &[(&str, &str)] = &[
    ("instock", "В наличност"),
    ("outofstock", "Изчерпан"),
    ("preorder", "Предварителна поръчка"),
    ("limitedavailability", "Ограничена наличност"),
    ("discontinued", "Спрян от продажба"),
];

/// A resolved selling price in both currencies
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResolvedPrice {
    pub eur: Option<f64>,
    pub bgn: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct FieldResolver {
    brands: BrandMatcher,
    eur_to_bgn: f64,
    site_domain: String,
}

impl FieldResolver {
    pub fn new(extraction: &ExtractionConfig, validation: &ValidationConfig) -> Self {
        Self {
            brands: BrandMatcher::new(&extraction.known_brands),
            eur_to_bgn: validation.eur_to_bgn,
            site_domain: extraction.site_domain.clone(),
        }
    }

    /// Resolve every page-sourced field of one document
    pub fn resolve(&self, views: &SourceViews<'_>) -> CanonicalProduct {
        let mut product = CanonicalProduct {
            url: views.document().url().to_string(),
            ..CanonicalProduct::default()
        };

        let price = self.resolve_price(views);
        product.extraction_method.record(ProductField::Price, &price);
        product.price_fallback_used = price.source.is_some_and(|s| s != SourceKind::Component);
        product.price_eur = price.value.eur;
        product.price = price.value.bgn;

        let compare_at = self.resolve_compare_at(views, price.value.eur);
        product.extraction_method.record(ProductField::CompareAtPrice, &compare_at);
        product.compare_at_price_eur = compare_at.value.eur;
        product.compare_at_price = compare_at.value.bgn;

        let title = resolve_text(views, ProductField::Title, TITLE_SOURCES);
        product.extraction_method.record(ProductField::Title, &title);
        product.title = title.value;

        let brand = self.resolve_brand(views, &product.title);
        product.extraction_method.record(ProductField::Brand, &brand);
        product.brand = brand.value;

        let sku = resolve_text(views, ProductField::Sku, SKU_SOURCES);
        product.extraction_method.record(ProductField::Sku, &sku);
        product.sku = sku.value;

        let barcode = resolve_barcode(views);
        product.extraction_method.record(ProductField::Barcode, &barcode);
        product.barcode = barcode.value;

        let categories = resolve_category_path(views, &product.title);
        product.extraction_method.record(ProductField::CategoryPath, &categories);
        product.category_path = categories.value;

        let images = self.resolve_images(views);
        product.extraction_method.record(ProductField::Images, &images);
        product.images = images.value;

        let availability = resolve_availability(views);
        product.extraction_method.record(ProductField::Availability, &availability);
        product.availability = availability.value;

        let sections = resolve_sections(views);
        product.extraction_method.record(ProductField::Sections, &sections);
        product.sections = sections.value;

        product
    }

    /// Component payload first; anything else is a fallback and is logged.
    pub fn resolve_price(&self, views: &SourceViews<'_>) -> FieldResolution<ResolvedPrice> {
        for &kind in PRICE_SOURCES {
            let Some(money) = views.get(kind, ProductField::Price).and_then(|v| v.as_money()) else {
                continue;
            };
            let Some(price) = self.normalize(money) else {
                continue;
            };
            if kind != SourceKind::Component {
                warn!(
                    "Price for {} taken from {} fallback ({:?} EUR)",
                    views.document().url(),
                    kind,
                    price.eur
                );
            }
            return FieldResolution::from(kind, price);
        }
        FieldResolution::empty()
    }

    /// Only the component payload knows the pre-discount price. It becomes
    /// the compare-at price when it is strictly above the selling price.
    pub fn resolve_compare_at(
        &self,
        views: &SourceViews<'_>,
        selling_eur: Option<f64>,
    ) -> FieldResolution<ResolvedPrice> {
        let Some(selling) = selling_eur else {
            return FieldResolution::empty();
        };
        let candidate = views
            .get(SourceKind::Component, ProductField::CompareAtPrice)
            .and_then(|v| v.as_money())
            .and_then(|money| self.normalize(money));

        match candidate {
            Some(pre) if pre.eur.is_some_and(|eur| eur > selling) => FieldResolution::from(SourceKind::Component, pre),
            _ => FieldResolution::empty(),
        }
    }

    /// Structured data, page metadata, title prefix, then the markup brand
    /// element canonicalized through the known-brand list.
    pub fn resolve_brand(&self, views: &SourceViews<'_>, title: &str) -> FieldResolution<String> {
        for kind in [SourceKind::StructuredData, SourceKind::PageMetadata] {
            if let Some(brand) = text_of(views.get(kind, ProductField::Brand)) {
                return FieldResolution::from(kind, self.brands.canonicalize(&brand));
            }
        }
        if let Some(brand) = self.brands.match_title(title) {
            return FieldResolution::from(SourceKind::TitleHeuristic, brand.to_string());
        }
        if let Some(brand) = text_of(views.get(SourceKind::Dom, ProductField::Brand)) {
            return match self.brands.canonical(&brand) {
                Some(canonical) => FieldResolution::from(SourceKind::KnownBrands, canonical.to_string()),
                None => FieldResolution::from(SourceKind::Dom, brand),
            };
        }
        FieldResolution::empty()
    }

    /// Gallery URLs made absolute, stripped of icons and deduplicated by
    /// product path. A source whose images all get filtered out counts as
    /// empty.
    pub fn resolve_images(&self, views: &SourceViews<'_>) -> FieldResolution<Vec<ProductImage>> {
        for &kind in IMAGE_SOURCES {
            let Some(raw) = views.get(kind, ProductField::Images).and_then(FieldValue::into_list) else {
                continue;
            };
            let urls = self.product_image_urls(&raw);
            if urls.is_empty() {
                debug!("{} images for {} were all filtered out", kind, views.document().url());
                continue;
            }
            let images = urls
                .into_iter()
                .enumerate()
                .map(|(i, source_url)| ProductImage { source_url, position: i + 1, alt_text: String::new() })
                .collect();
            return FieldResolution::from(kind, images);
        }
        FieldResolution::empty()
    }

    /// Absolute product image URLs in first-seen order
    pub fn product_image_urls(&self, raw: &[String]) -> Vec<String> {
        let mut urls: Vec<String> = Vec::new();
        for url in raw.iter().map(|r| absolutize(r, &self.site_domain)) {
            if is_product_image(&url) && !urls.iter().any(|u| dedup_key(u) == dedup_key(&url)) {
                urls.push(url);
            }
        }
        urls
    }

    /// Both currencies rounded to cents
    pub fn normalize(&self, money: Money) -> Option<ResolvedPrice> {
        let (eur, bgn) = money.normalized(self.eur_to_bgn)?;
        Some(ResolvedPrice { eur: Some(round_cents(eur)), bgn: Some(round_cents(bgn)) })
    }
}

fn text_of(value: Option<FieldValue>) -> Option<String> {
    value
        .as_ref()
        .and_then(FieldValue::as_text)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn resolve_text(views: &SourceViews<'_>, field: ProductField, order: &[SourceKind]) -> FieldResolution<String> {
    order
        .iter()
        .find_map(|&kind| text_of(views.get(kind, field)).map(|text| FieldResolution::from(kind, text)))
        .unwrap_or_else(FieldResolution::empty)
}

/// First candidate that normalizes to a GTIN shape
pub fn resolve_barcode(views: &SourceViews<'_>) -> FieldResolution<String> {
    for &kind in BARCODE_SOURCES {
        let Some(candidates) = views.get(kind, ProductField::Barcode).and_then(FieldValue::into_list) else {
            continue;
        };
        match candidates.iter().map(|c| normalize_barcode(c)).find(|code| !code.is_empty()) {
            Some(code) => return FieldResolution::from(kind, code),
            None => debug!("No valid barcode among {} {} candidates: {:?}", candidates.len(), kind, candidates),
        }
    }
    FieldResolution::empty()
}

/// Breadcrumb path without the product's own name
pub fn resolve_category_path(views: &SourceViews<'_>, title: &str) -> FieldResolution<Vec<String>> {
    let title = title.trim().to_lowercase();
    for &kind in CATEGORY_SOURCES {
        let Some(crumbs) = views.get(kind, ProductField::CategoryPath).and_then(FieldValue::into_list) else {
            continue;
        };
        let path: Vec<String> = crumbs
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty() && c.to_lowercase() != title)
            .collect();
        if !path.is_empty() {
            return FieldResolution::from(kind, path);
        }
    }
    FieldResolution::empty()
}

/// schema.org availability mapped to storefront wording; markup text as is
pub fn resolve_availability(views: &SourceViews<'_>) -> FieldResolution<String> {
    for &kind in AVAILABILITY_SOURCES {
        let Some(raw) = text_of(views.get(kind, ProductField::Availability)) else {
            continue;
        };
        let text = match kind {
            SourceKind::StructuredData => availability_label(&raw).map_or(raw, str::to_string),
            _ => raw,
        };
        return FieldResolution::from(kind, text);
    }
    FieldResolution::empty()
}

/// "https://schema.org/InStock" and "InStock" both give "В наличност"
pub fn availability_label(raw: &str) -> Option<&'static str> {
    let token = raw.rsplit('/').next().unwrap_or(raw).to_lowercase();
    AVAILABILITY_LABELS
        .iter()
        .find(|(key, _)| *key == token)
        .map(|(_, label)| *label)
}

fn resolve_sections(views: &SourceViews<'_>) -> FieldResolution<ContentSections> {
    views
        .get(SourceKind::Dom, ProductField::Sections)
        .and_then(FieldValue::into_sections)
        .map_or_else(FieldResolution::empty, |sections| FieldResolution::from(SourceKind::Dom, sections))
}
