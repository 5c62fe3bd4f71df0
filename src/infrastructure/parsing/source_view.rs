//! One capability over three channels
//!
//! The resolver and the consistency checker only ever ask a view for one
//! field at a time through [`SourceView::get`]. A view that cannot answer
//! returns `None`; absence is never an error.

use serde::Serialize;

use super::component_view::ComponentView;
use super::dom_view::DomView;
use super::structured_data_view::StructuredDataView;
use crate::domain::product::ContentSections;
use crate::domain::provenance::{ProductField, SourceKind};

/// A price as printed by one source. Either side may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Money {
    pub eur: Option<f64>,
    pub bgn: Option<f64>,
}

impl Money {
    pub fn eur(amount: f64) -> Self {
        Self { eur: Some(amount), bgn: None }
    }

    pub fn bgn(amount: f64) -> Self {
        Self { eur: None, bgn: Some(amount) }
    }

    pub fn is_empty(&self) -> bool {
        self.eur.is_none() && self.bgn.is_none()
    }

    /// Both currencies, filling the missing side through `rate` (EUR → BGN)
    pub fn normalized(&self, rate: f64) -> Option<(f64, f64)> {
        match (self.eur, self.bgn) {
            (Some(eur), Some(bgn)) => Some((eur, bgn)),
            (Some(eur), None) => Some((eur, eur * rate)),
            (None, Some(bgn)) => Some((bgn / rate, bgn)),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FieldValue {
    Text(String),
    Money(Money),
    List(Vec<String>),
    Sections(ContentSections),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_money(&self) -> Option<Money> {
        match self {
            Self::Money(money) => Some(*money),
            _ => None,
        }
    }

    pub fn into_list(self) -> Option<Vec<String>> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn into_sections(self) -> Option<ContentSections> {
        match self {
            Self::Sections(sections) => Some(sections),
            _ => None,
        }
    }

    /// Empty strings, lists and amounts count as "no data"
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::Money(money) => money.is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Sections(sections) => sections.is_empty(),
        }
    }
}

/// One source channel projected into a field map
#[derive(Debug, Clone, Copy)]
pub enum SourceView<'v> {
    Component(&'v ComponentView),
    StructuredData(&'v StructuredDataView),
    Dom(&'v DomView),
}

impl SourceView<'_> {
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Component(_) => SourceKind::Component,
            Self::StructuredData(_) => SourceKind::StructuredData,
            Self::Dom(_) => SourceKind::Dom,
        }
    }

    /// Non-empty value for `field`, or `None`
    pub fn get(&self, field: ProductField) -> Option<FieldValue> {
        let value = match self {
            Self::Component(view) => view.get(field),
            Self::StructuredData(view) => view.get(field),
            Self::Dom(view) => view.get(field),
        };
        value.filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_normalization() {
        let rate = 1.95583;
        let (eur, bgn) = Money::eur(10.0).normalized(rate).unwrap();
        assert_eq!(eur, 10.0);
        assert!((bgn - 19.5583).abs() < 1e-9);

        let (eur, _) = Money::bgn(19.5583).normalized(rate).unwrap();
        assert!((eur - 10.0).abs() < 1e-9);

        assert!(Money::default().normalized(rate).is_none());
    }

    #[test]
    fn test_blank_values_are_empty() {
        assert!(FieldValue::Text("  ".into()).is_empty());
        assert!(FieldValue::List(vec![]).is_empty());
        assert!(!FieldValue::Text("150 г".into()).is_empty());
    }
}
