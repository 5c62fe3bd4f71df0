//! Raw markup reader
//!
//! Structural selectors and text anchors over the parsed tree. Anything
//! inside a related-products region is invisible to this reader: those
//! blocks describe other products and would poison price and image reads.

#![allow(clippy::uninlined_format_args)]

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};
use serde_json::Value;
use tracing::{debug, warn};

use super::config::{BRAND_LABELS, DomSelectors, IMAGE_SOURCE_ATTRIBUTES, WEIGHT_LABELS};
use super::payload::{collapse_whitespace, parse_json_payload, value_as_text};
use super::section_splitter::{SectionSplit, SectionSplitter};
use super::source_view::{FieldValue, Money};
use super::{ParsingError, ParsingResult, RawDocument};
use crate::domain::constants::site::BREADCRUMB_HOME;
use crate::domain::provenance::ProductField;

static BGN_AMOUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+[.,]\d{2})\s*лв").expect("static regex"));
static EUR_AMOUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+[.,]\d{2})\s*(?:€|EUR)").expect("static regex"));
static BARCODE_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:баркод|ean|gtin)\s*:\s*(\d[\d\-]*\d)").expect("static regex"));
static DATA_LAYER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)var\s+dl4Objects\s*=\s*(\[.*?\]);").expect("static regex"));

/// Compiled selector lists for the markup reader
#[derive(Debug)]
pub struct DomSelectorSet {
    title: Vec<Selector>,
    brand: Vec<Selector>,
    breadcrumb: Vec<Selector>,
    price_area: Vec<Selector>,
    gallery_image: Vec<Selector>,
    attribute_row: Vec<Selector>,
    availability: Vec<Selector>,
    meta_brand: Vec<Selector>,
    meta_sku: Vec<Selector>,
    excluded: Vec<Selector>,
    row_cells: Selector,
}

impl DomSelectorSet {
    pub fn compile(selectors: &DomSelectors, excluded_regions: &[String]) -> ParsingResult<Self> {
        Ok(Self {
            title: compile_selectors(&selectors.title)?,
            brand: compile_selectors(&selectors.brand)?,
            breadcrumb: compile_selectors(&selectors.breadcrumb)?,
            price_area: compile_selectors(&selectors.price_area)?,
            gallery_image: compile_selectors(&selectors.gallery_image)?,
            attribute_row: compile_selectors(&selectors.attribute_row)?,
            availability: compile_selectors(&selectors.availability)?,
            meta_brand: compile_selectors(&selectors.meta_brand)?,
            meta_sku: compile_selectors(&selectors.meta_sku)?,
            excluded: compile_selectors(excluded_regions)?,
            row_cells: compile_one("th, td")?,
        })
    }
}

/// Compile selector strings, skipping the ones that fail. An entirely
/// broken non-empty list is an error.
pub fn compile_selectors(selector_strings: &[String]) -> ParsingResult<Vec<Selector>> {
    let mut selectors = Vec::new();
    let mut errors = Vec::new();

    for selector_str in selector_strings {
        match Selector::parse(selector_str) {
            Ok(selector) => selectors.push(selector),
            Err(e) => {
                warn!("Failed to compile selector '{}': {}", selector_str, e);
                errors.push(format!("'{}': {}", selector_str, e));
            }
        }
    }

    if selectors.is_empty() && !selector_strings.is_empty() {
        return Err(ParsingError::invalid_selector(&selector_strings.join(", "), errors.join(", ")));
    }
    Ok(selectors)
}

pub fn compile_one(selector: &str) -> ParsingResult<Selector> {
    Selector::parse(selector).map_err(|e| ParsingError::invalid_selector(selector, e))
}

/// Tag-manager data layer and `<meta>` hints
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageMetadata {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub sku: Option<String>,
}

impl PageMetadata {
    fn read(document: &RawDocument, selectors: &DomSelectorSet) -> Self {
        let mut metadata = Self::default();

        if let Some(item) = data_layer_item(document.markup()) {
            metadata.name = item.get("item_name").and_then(value_as_text);
            metadata.brand = item.get("item_brand").and_then(value_as_text);
            metadata.sku = item.get("item_id").and_then(value_as_text);
        }

        let meta_content = |list: &[Selector]| {
            list.iter()
                .flat_map(|selector| document.select(selector))
                .find_map(|el| el.value().attr("content").map(collapse_whitespace).filter(|c| !c.is_empty()))
        };
        if metadata.brand.is_none() {
            metadata.brand = meta_content(&selectors.meta_brand);
        }
        if metadata.sku.is_none() {
            metadata.sku = meta_content(&selectors.meta_sku);
        }
        metadata
    }

    pub fn get(&self, field: ProductField) -> Option<FieldValue> {
        match field {
            ProductField::Title => self.name.clone().map(FieldValue::Text),
            ProductField::Brand => self.brand.clone().map(FieldValue::Text),
            ProductField::Sku => self.sku.clone().map(FieldValue::Text),
            _ => None,
        }
    }
}

/// First data-layer entry that describes an item
fn data_layer_item(markup: &str) -> Option<serde_json::Map<String, Value>> {
    let raw = DATA_LAYER.captures(markup)?.get(1)?.as_str();
    let entries = match parse_json_payload("page_metadata", raw) {
        Ok(Value::Array(entries)) => entries,
        Ok(_) => return None,
        Err(e) => {
            debug!("Ignoring data layer: {}", e);
            return None;
        }
    };

    entries.into_iter().find_map(|entry| {
        let object = entry.as_object()?;
        if object.contains_key("item_name") || object.contains_key("item_brand") {
            return Some(object.clone());
        }
        object
            .get("ecommerce")
            .and_then(|e| e.get("items"))
            .and_then(Value::as_array)
            .and_then(|items| items.first())
            .and_then(Value::as_object)
            .cloned()
    })
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DomView {
    pub title: Option<String>,
    pub brand: Option<String>,
    pub breadcrumbs: Vec<String>,
    pub price: Money,
    /// Raw gallery `src` values in page order
    pub images: Vec<String>,
    pub barcode_candidates: Vec<String>,
    pub availability: Option<String>,
    /// `(label, value)` rows of the attribute table
    pub attributes: Vec<(String, String)>,
    pub split: SectionSplit,
    pub page_metadata: PageMetadata,
}

impl DomView {
    pub fn read(document: &RawDocument, selectors: &DomSelectorSet, splitter: &SectionSplitter) -> Self {
        let excluded_ids: HashSet<_> = selectors
            .excluded
            .iter()
            .flat_map(|selector| document.select(selector))
            .map(|el| el.id())
            .collect();

        // Elements of the primary product only
        let primary = |selector: &Selector| {
            document
                .select(selector)
                .filter(|el| {
                    !excluded_ids.contains(&el.id()) && !el.ancestors().any(|a| excluded_ids.contains(&a.id()))
                })
                .collect::<Vec<_>>()
        };

        let text_of = |el: &ElementRef<'_>| collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "));

        let title = selectors
            .title
            .iter()
            .flat_map(|s| primary(s))
            .map(|el| text_of(&el))
            .find(|t| !t.is_empty());

        let attributes: Vec<(String, String)> = selectors
            .attribute_row
            .iter()
            .flat_map(|s| primary(s))
            .filter_map(|row| {
                let cells: Vec<_> = row.select(&selectors.row_cells).collect();
                if cells.len() < 2 {
                    return None;
                }
                Some((text_of(&cells[0]), text_of(&cells[cells.len() - 1])))
            })
            .collect();

        let brand = selectors
            .brand
            .iter()
            .flat_map(|s| primary(s))
            .map(|el| el.value().attr("content").map_or_else(|| text_of(&el), collapse_whitespace))
            .find(|b| !b.is_empty())
            .or_else(|| attribute_value(&attributes, BRAND_LABELS));

        let breadcrumbs = selectors
            .breadcrumb
            .iter()
            .map(|s| {
                primary(s)
                    .iter()
                    .map(|el| text_of(el))
                    .filter(|t| !t.is_empty() && !BREADCRUMB_HOME.contains(&t.to_lowercase().as_str()))
                    .collect::<Vec<_>>()
            })
            .find(|crumbs| !crumbs.is_empty())
            .unwrap_or_default();

        let price = selectors
            .price_area
            .iter()
            .flat_map(|s| primary(s))
            .map(|el| price_from_text(&text_of(&el)))
            .find(|money| !money.is_empty())
            .unwrap_or_default();

        let mut images: Vec<String> = Vec::new();
        for el in selectors.gallery_image.iter().flat_map(|s| primary(s)) {
            let src = IMAGE_SOURCE_ATTRIBUTES
                .iter()
                .find_map(|attr| el.value().attr(attr).map(str::trim).filter(|v| !v.is_empty()));
            if let Some(src) = src {
                if !images.iter().any(|existing| existing == src) {
                    images.push(src.to_string());
                }
            }
        }

        let availability = selectors
            .availability
            .iter()
            .flat_map(|s| primary(s))
            .map(|el| text_of(&el))
            .find(|t| !t.is_empty());

        let page_text = document.visible_text(&selectors.excluded);
        let mut barcode_candidates: Vec<String> = Vec::new();
        for caps in BARCODE_TEXT.captures_iter(&page_text) {
            let code = caps[1].to_string();
            if !barcode_candidates.contains(&code) {
                barcode_candidates.push(code);
            }
        }

        let split = splitter.split(&page_text);
        let page_metadata = PageMetadata::read(document, selectors);

        debug!(
            "DOM view for {}: title={:?}, {} breadcrumbs, {} images, {} barcode candidates",
            document.url(),
            title,
            breadcrumbs.len(),
            images.len(),
            barcode_candidates.len()
        );

        Self {
            title,
            brand,
            breadcrumbs,
            price,
            images,
            barcode_candidates,
            availability,
            attributes,
            split,
            page_metadata,
        }
    }

    /// Attribute-table weight cell, unparsed
    pub fn weight_text(&self) -> Option<String> {
        attribute_value(&self.attributes, WEIGHT_LABELS)
    }

    pub fn get(&self, field: ProductField) -> Option<FieldValue> {
        match field {
            ProductField::Title => self.title.clone().map(FieldValue::Text),
            ProductField::Brand => self.brand.clone().map(FieldValue::Text),
            ProductField::CategoryPath => Some(FieldValue::List(self.breadcrumbs.clone())),
            ProductField::Price => Some(FieldValue::Money(self.price)),
            ProductField::Images => Some(FieldValue::List(self.images.clone())),
            ProductField::Barcode => Some(FieldValue::List(self.barcode_candidates.clone())),
            ProductField::Availability => self.availability.clone().map(FieldValue::Text),
            ProductField::Sections => Some(FieldValue::Sections(self.split.sections.clone())),
            ProductField::Weight => self.weight_text().map(FieldValue::Text),
            ProductField::Sku | ProductField::CompareAtPrice => None,
        }
    }
}

fn attribute_value(rows: &[(String, String)], labels: &[&str]) -> Option<String> {
    rows.iter()
        .find(|(label, _)| {
            let label = label.to_lowercase();
            labels.iter().any(|wanted| label.contains(wanted))
        })
        .map(|(_, value)| value.clone())
        .filter(|v| !v.is_empty())
}

/// "11,65 лв. / 5,96 €" style price text
pub fn price_from_text(text: &str) -> Money {
    let amount = |re: &Regex| {
        re.captures(text)
            .and_then(|c| c[1].replace(',', ".").parse::<f64>().ok())
            .filter(|v| *v > 0.0)
    };
    Money {
        eur: amount(&EUR_AMOUNT),
        bgn: amount(&BGN_AMOUNT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::{ExtractionConfig, defaults::EXCLUDED_REGIONS};

    fn read(markup: &str) -> DomView {
        let config = ExtractionConfig::default();
        let excluded: Vec<String> = EXCLUDED_REGIONS.iter().map(|s| (*s).to_string()).collect();
        let selectors = DomSelectorSet::compile(&DomSelectors::default(), &excluded).unwrap();
        let splitter =
            SectionSplitter::new(config.section_headers, config.section_terminators, config.section_noise);
        let doc = RawDocument::parse("https://benu.bg/test", markup).unwrap();
        DomView::read(&doc, &selectors, &splitter)
    }

    #[test]
    fn test_related_carousel_is_ignored() {
        let view = read(
            r#"<html><body>
              <div class="related-products">
                <div class="product-prices">99,99 лв</div>
                <div class="gallery"><img src="/images/products/9/other.jpg"></div>
              </div>
              <div class="product-info"><div class="product-prices">22,79 лв 11,65 €</div></div>
              <div class="gallery"><img data-src="/images/products/1/main.jpg"></div>
            </body></html>"#,
        );
        assert_eq!(view.price, Money { eur: Some(11.65), bgn: Some(22.79) });
        assert_eq!(view.images, vec!["/images/products/1/main.jpg"]);
    }

    #[test]
    fn test_breadcrumbs_title_and_barcode_text() {
        let view = read(
            r#"<html><body>
              <nav class="breadcrumbs"><a href="/">Начало</a><a href="/c">Витамини</a><a href="/c/d">Витамин C</a></nav>
              <h1> Vitamin C   1000mg </h1>
              <p>Баркод: 3800123456789</p>
            </body></html>"#,
        );
        assert_eq!(view.title.as_deref(), Some("Vitamin C 1000mg"));
        assert_eq!(view.breadcrumbs, vec!["Витамини", "Витамин C"]);
        assert_eq!(view.barcode_candidates, vec!["3800123456789"]);
    }

    #[test]
    fn test_attribute_table_brand_and_weight() {
        let view = read(
            r#"<html><body><table class="additional-attributes">
              <tr><th>Марка</th><td>Nivea</td></tr>
              <tr><th>Тегло</th><td>0,150 кг</td></tr>
            </table></body></html>"#,
        );
        assert_eq!(view.brand.as_deref(), Some("Nivea"));
        assert_eq!(view.weight_text().as_deref(), Some("0,150 кг"));
    }

    #[test]
    fn test_data_layer_metadata() {
        let view = read(
            r#"<html><head><script>var dl4Objects = [{"item_name":"Nivea Creme","item_brand":"Nivea","item_id":1234}];</script>
               <meta property="product:brand" content="Ignored"></head><body></body></html>"#,
        );
        assert_eq!(view.page_metadata.brand.as_deref(), Some("Nivea"));
        assert_eq!(view.page_metadata.sku.as_deref(), Some("1234"));
    }

    #[test]
    fn test_broken_selector_list_is_rejected() {
        let err = compile_selectors(&["[[[".to_string()]).unwrap_err();
        assert!(matches!(err, ParsingError::InvalidSelector { .. }));
        assert!(!err.is_recoverable());
    }
}
