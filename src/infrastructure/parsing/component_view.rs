//! Client-side component payload reader
//!
//! Reads the escaped JSON the storefront hands to its add-to-cart widget:
//! `<add-to-cart :product="{&quot;variants&quot;:[{...}]}">`. Amounts are
//! in EUR. Only the first variant is read.

use scraper::Selector;
use serde_json::Value;
use tracing::debug;

use super::payload::{parse_json_payload, value_as_f64};
use super::source_view::{FieldValue, Money};
use super::{ParsingError, ParsingResult, RawDocument};
use crate::domain::provenance::ProductField;

const CHANNEL: &str = "component";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComponentView {
    /// Selling amount of the first variant (discounted when on promotion)
    pub current: Option<f64>,

    /// Amount before any discount
    pub pre_discount: Option<f64>,

    pub variant_count: usize,
}

impl ComponentView {
    pub fn read(document: &RawDocument, element: &Selector, attribute: &str) -> ParsingResult<Self> {
        let raw = document
            .select(element)
            .find_map(|el| {
                el.value()
                    .attrs()
                    .find(|(name, _)| *name == attribute)
                    .map(|(_, value)| value.to_string())
            })
            .ok_or_else(|| ParsingError::element_missing(attribute, Some("component element")))?;

        let payload = parse_json_payload(CHANNEL, &raw)?;
        Self::from_payload(&payload)
    }

    pub fn from_payload(payload: &Value) -> ParsingResult<Self> {
        let object = payload
            .as_object()
            .ok_or_else(|| ParsingError::unexpected_structure(CHANNEL, "payload is not an object"))?;

        let variants = object.get("variants").and_then(Value::as_array);
        let variant_count = variants.map_or(0, Vec::len);
        let Some(first) = variants.and_then(|v| v.first()) else {
            debug!("Component payload has no variants");
            return Ok(Self::default());
        };
        if variant_count > 1 {
            debug!("Component payload has {} variants, reading the first", variant_count);
        }

        let amount = |key: &str| first.get(key).and_then(value_as_f64).filter(|v| *v > 0.0);
        let discounted = amount("discountedPrice");
        let regular = amount("price");

        Ok(Self {
            current: discounted.or(regular),
            pre_discount: regular.or(discounted),
            variant_count,
        })
    }

    pub fn is_on_promotion(&self) -> bool {
        matches!((self.current, self.pre_discount), (Some(c), Some(p)) if p > c)
    }

    pub fn get(&self, field: ProductField) -> Option<FieldValue> {
        match field {
            ProductField::Price => self.current.map(|v| FieldValue::Money(Money::eur(v))),
            ProductField::CompareAtPrice => self.pre_discount.map(|v| FieldValue::Money(Money::eur(v))),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(attribute_value: &str) -> RawDocument {
        RawDocument::parse(
            "https://benu.bg/test",
            format!(r#"<html><body><add-to-cart :product="{attribute_value}"></add-to-cart></body></html>"#),
        )
        .unwrap()
    }

    fn read(doc: &RawDocument) -> ParsingResult<ComponentView> {
        ComponentView::read(doc, &Selector::parse("add-to-cart").unwrap(), ":product")
    }

    #[test]
    fn test_promotional_variant() {
        let doc = document(
            "{&quot;price&quot;:13.75,&quot;variants&quot;:[{&quot;price&quot;:13.75,&quot;discountedPrice&quot;:11.65}]}",
        );
        let view = read(&doc).unwrap();
        assert_eq!(view.current, Some(11.65));
        assert_eq!(view.pre_discount, Some(13.75));
        assert!(view.is_on_promotion());
    }

    #[test]
    fn test_first_variant_wins() {
        let view = ComponentView::from_payload(&json!({
            "variants": [
                {"price": 5.26, "discountedPrice": 5.26},
                {"price": 9.99, "discountedPrice": 7.00}
            ]
        }))
        .unwrap();
        assert_eq!(view.current, Some(5.26));
        assert_eq!(view.variant_count, 2);
        assert!(!view.is_on_promotion());
    }

    #[test]
    fn test_empty_variants_is_partial_not_error() {
        let view = ComponentView::from_payload(&json!({"price": 4.0, "variants": []})).unwrap();
        assert_eq!(view.get(ProductField::Price), None);
    }

    #[test]
    fn test_malformed_payload_is_recoverable() {
        let doc = document("{ invalid json here }");
        let err = read(&doc).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_missing_element() {
        let doc = RawDocument::parse("https://benu.bg/test", "<html><body><h1>x</h1></body></html>").unwrap();
        assert!(matches!(read(&doc), Err(ParsingError::ElementMissing { .. })));
    }
}
