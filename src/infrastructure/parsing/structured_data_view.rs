//! schema.org JSON-LD reader
//!
//! Every `application/ld+json` block is parsed on its own; a malformed block
//! is skipped without affecting the others. Product-shaped objects are
//! merged with first-non-empty-wins per key, and the first BreadcrumbList
//! with names supplies the category path.

use scraper::Selector;
use serde_json::{Map, Value};
use tracing::debug;

use super::config::PRODUCT_SCHEMA_TYPES;
use super::payload::{parse_json_payload, value_as_f64, value_as_text};
use super::source_view::{FieldValue, Money};
use super::{ParsingError, ParsingResult, RawDocument};
use crate::domain::constants::{barcode::STRUCTURED_DATA_KEYS, site::BREADCRUMB_HOME};
use crate::domain::provenance::ProductField;

const CHANNEL: &str = "structured_data";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructuredDataView {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub sku: Option<String>,
    /// `(key, value)` in key priority order. Merchant part numbers are
    /// never collected here.
    pub barcode_candidates: Vec<(String, String)>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub availability: Option<String>,
    pub images: Vec<String>,
    pub breadcrumbs: Vec<String>,
}

impl StructuredDataView {
    pub fn read(document: &RawDocument, scripts: &Selector) -> ParsingResult<Self> {
        let mut view = Self::default();
        let mut blocks = 0usize;
        let mut last_error = None;

        for script in document.select(scripts) {
            blocks += 1;
            let text: String = script.text().collect();
            match parse_json_payload(CHANNEL, &text) {
                Ok(value) => view.absorb(&value),
                Err(e) => {
                    debug!("Skipping structured-data block {}: {}", blocks, e);
                    last_error = Some(e);
                }
            }
        }

        if view.is_empty() {
            return Err(last_error.unwrap_or_else(|| {
                ParsingError::element_missing("application/ld+json", Some("product or breadcrumb object"))
            }));
        }
        Ok(view)
    }

    /// Merge one parsed block (object, array or `@graph` container).
    pub fn absorb(&mut self, value: &Value) {
        for object in flatten_objects(value) {
            if has_type(object, "BreadcrumbList") {
                if self.breadcrumbs.is_empty() {
                    self.breadcrumbs = breadcrumb_names(object);
                }
            } else if PRODUCT_SCHEMA_TYPES.iter().any(|t| has_type(object, t)) {
                self.merge_product(object);
            }
        }
    }

    fn merge_product(&mut self, product: &Map<String, Value>) {
        fill(&mut self.name, product.get("name").and_then(value_as_text));
        fill(&mut self.sku, product.get("sku").and_then(value_as_text));
        fill(&mut self.brand, product.get("brand").and_then(brand_name));

        for key in STRUCTURED_DATA_KEYS {
            if let Some(code) = product.get(*key).and_then(value_as_text) {
                if !self.barcode_candidates.iter().any(|(_, existing)| *existing == code) {
                    self.barcode_candidates.push(((*key).to_string(), code));
                }
            }
        }

        if let Some(offer) = product.get("offers").and_then(first_object) {
            if self.price.is_none() {
                self.price = offer.get("price").and_then(value_as_f64).filter(|p| *p > 0.0);
                fill(&mut self.currency, offer.get("priceCurrency").and_then(value_as_text));
            }
            fill(&mut self.availability, offer.get("availability").and_then(value_as_text));
        }

        if self.images.is_empty() {
            self.images = product.get("image").map(image_urls).unwrap_or_default();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.brand.is_none()
            && self.sku.is_none()
            && self.barcode_candidates.is_empty()
            && self.price.is_none()
            && self.images.is_empty()
            && self.breadcrumbs.is_empty()
    }

    /// Offer price in the currency the page declares (EUR when unstated)
    pub fn price_money(&self) -> Option<Money> {
        let amount = self.price?;
        let is_bgn = self
            .currency
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case("BGN"));
        Some(if is_bgn { Money::bgn(amount) } else { Money::eur(amount) })
    }

    pub fn get(&self, field: ProductField) -> Option<FieldValue> {
        match field {
            ProductField::Title => self.name.clone().map(FieldValue::Text),
            ProductField::Brand => self.brand.clone().map(FieldValue::Text),
            ProductField::Sku => self.sku.clone().map(FieldValue::Text),
            ProductField::Barcode => Some(FieldValue::List(
                self.barcode_candidates.iter().map(|(_, code)| code.clone()).collect(),
            )),
            ProductField::Price => self.price_money().map(FieldValue::Money),
            ProductField::CategoryPath => Some(FieldValue::List(self.breadcrumbs.clone())),
            ProductField::Images => Some(FieldValue::List(self.images.clone())),
            ProductField::Availability => self.availability.clone().map(FieldValue::Text),
            _ => None,
        }
    }
}

fn fill(slot: &mut Option<String>, candidate: Option<String>) {
    if slot.is_none() {
        *slot = candidate;
    }
}

fn flatten_objects(value: &Value) -> Vec<&Map<String, Value>> {
    match value {
        Value::Array(items) => items.iter().flat_map(flatten_objects).collect(),
        Value::Object(object) => match object.get("@graph") {
            Some(graph) => flatten_objects(graph),
            None => vec![object],
        },
        _ => Vec::new(),
    }
}

/// `@type` may be a string or a list of strings
fn has_type(object: &Map<String, Value>, wanted: &str) -> bool {
    match object.get("@type") {
        Some(Value::String(t)) => t == wanted,
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some(wanted)),
        _ => false,
    }
}

fn first_object(value: &Value) -> Option<&Map<String, Value>> {
    match value {
        Value::Object(object) => Some(object),
        Value::Array(items) => items.first().and_then(Value::as_object),
        _ => None,
    }
}

fn brand_name(value: &Value) -> Option<String> {
    match value {
        Value::Object(object) => object.get("name").and_then(value_as_text),
        other => value_as_text(other),
    }
}

fn image_urls(value: &Value) -> Vec<String> {
    match value {
        Value::String(url) => vec![url.trim().to_string()],
        Value::Object(object) => object
            .get("url")
            .or_else(|| object.get("contentUrl"))
            .and_then(value_as_text)
            .into_iter()
            .collect(),
        Value::Array(items) => items.iter().flat_map(image_urls).collect(),
        _ => Vec::new(),
    }
    .into_iter()
    .filter(|url| !url.is_empty())
    .collect()
}

fn breadcrumb_names(list: &Map<String, Value>) -> Vec<String> {
    let Some(items) = list.get("itemListElement").and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            item.get("name")
                .and_then(value_as_text)
                .or_else(|| item.get("item").and_then(|i| i.get("name")).and_then(value_as_text))
        })
        .filter(|name| !BREADCRUMB_HOME.contains(&name.to_lowercase().as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn view_of(blocks: &[&str]) -> ParsingResult<StructuredDataView> {
        let scripts: String = blocks
            .iter()
            .map(|b| format!(r#"<script type="application/ld+json">{b}</script>"#))
            .collect();
        let doc = RawDocument::parse(
            "https://benu.bg/test",
            format!("<html><head>{scripts}</head><body><h1>x</h1></body></html>"),
        )
        .unwrap();
        StructuredDataView::read(&doc, &Selector::parse("script[type='application/ld+json']").unwrap())
    }

    #[test]
    fn test_product_and_breadcrumbs_across_blocks() {
        let view = view_of(&[
            r#"{"@type":"Product","name":"Nivea Creme 150ml","brand":{"@type":"Brand","name":"Nivea"},
                "sku":"12345","gtin13":"4005808158881","mpn":"INTERNAL-77",
                "offers":[{"price":"11,65","priceCurrency":"EUR","availability":"https://schema.org/InStock"}],
                "image":["/uploads/images/products/1/a.jpg"]}"#,
            r#"{"@type":"BreadcrumbList","itemListElement":[
                {"position":1,"name":"Начало"},{"position":2,"item":{"name":"Козметика"}},{"position":3,"name":"Кремове"}]}"#,
        ])
        .unwrap();

        assert_eq!(view.name.as_deref(), Some("Nivea Creme 150ml"));
        assert_eq!(view.brand.as_deref(), Some("Nivea"));
        assert_eq!(view.price, Some(11.65));
        assert_eq!(view.breadcrumbs, vec!["Козметика", "Кремове"]);
        assert_eq!(view.barcode_candidates, vec![("gtin13".to_string(), "4005808158881".to_string())]);
        assert!(!view.barcode_candidates.iter().any(|(_, code)| code.contains("INTERNAL")));
    }

    #[test]
    fn test_graph_container_and_malformed_sibling() {
        let view = view_of(&[
            "{ not json",
            r#"{"@graph":[{"@type":["Product","Drug"],"name":"Aspirin 500mg","offers":{"price":5.26}}]}"#,
        ])
        .unwrap();
        assert_eq!(view.name.as_deref(), Some("Aspirin 500mg"));
        assert_eq!(view.price_money(), Some(Money::eur(5.26)));
    }

    #[test]
    fn test_only_malformed_blocks_is_recoverable_error() {
        let err = view_of(&["{ not json"]).unwrap_err();
        assert!(matches!(err, ParsingError::MalformedPayload { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_literal_entity_inside_string_keeps_block() {
        let view = view_of(&[
            r#"{"@type":"Product","name":"Nivea Creme","sku":"NV-150",
                "description":"Крем &quot;Nivea&quot; за лице","gtin13":"4005808158409"}"#,
        ])
        .unwrap();
        assert_eq!(view.sku.as_deref(), Some("NV-150"));
        assert_eq!(view.barcode_candidates, vec![("gtin13".to_string(), "4005808158409".to_string())]);
    }

    #[test]
    fn test_first_product_wins_per_key() {
        let mut view = StructuredDataView::default();
        view.absorb(&json!({"@type": "Product", "name": "First", "offers": {"price": 3.0}}));
        view.absorb(&json!({"@type": "Product", "name": "Second", "sku": "S-2", "offers": {"price": 4.0}}));
        assert_eq!(view.name.as_deref(), Some("First"));
        assert_eq!(view.sku.as_deref(), Some("S-2"));
        assert_eq!(view.price, Some(3.0));
    }
}
