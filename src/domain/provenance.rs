use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a resolved value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// `<add-to-cart :product="...">` component payload
    Component,
    /// schema.org JSON-LD blocks
    StructuredData,
    /// Tag-manager data layer and `<meta>` tags
    PageMetadata,
    /// Raw markup heuristics
    Dom,
    /// Known-brand prefix match on the title
    TitleHeuristic,
    /// Known-brand lookup of a DOM brand element
    KnownBrands,
    /// Computed from other resolved fields
    Derived,
}

impl SourceKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Component => "component",
            Self::StructuredData => "structured_data",
            Self::PageMetadata => "page_metadata",
            Self::Dom => "dom",
            Self::TitleHeuristic => "title_heuristic",
            Self::KnownBrands => "known_brands",
            Self::Derived => "derived",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical product fields that carry provenance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductField {
    Title,
    Brand,
    Sku,
    Barcode,
    Price,
    CompareAtPrice,
    CategoryPath,
    Images,
    Availability,
    Sections,
    Weight,
}

impl ProductField {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Brand => "brand",
            Self::Sku => "sku",
            Self::Barcode => "barcode",
            Self::Price => "price",
            Self::CompareAtPrice => "compare_at_price",
            Self::CategoryPath => "category_path",
            Self::Images => "images",
            Self::Availability => "availability",
            Self::Sections => "sections",
            Self::Weight => "weight",
        }
    }
}

impl fmt::Display for ProductField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved value of one field plus the source that won.
///
/// `source` is `None` when every source was empty; `value` is then the
/// type's empty value.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldResolution<T> {
    pub value: T,
    pub source: Option<SourceKind>,
}

impl<T: Default> FieldResolution<T> {
    pub fn empty() -> Self {
        Self { value: T::default(), source: None }
    }

    pub fn from(source: SourceKind, value: T) -> Self {
        Self { value, source: Some(source) }
    }

    pub fn is_resolved(&self) -> bool {
        self.source.is_some()
    }
}

/// Per-field provenance table of one extraction
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtractionMethod(BTreeMap<ProductField, SourceKind>);

impl ExtractionMethod {
    pub fn record<T>(&mut self, field: ProductField, resolution: &FieldResolution<T>) {
        if let Some(source) = resolution.source {
            self.0.insert(field, source);
        }
    }

    pub fn source_of(&self, field: ProductField) -> Option<SourceKind> {
        self.0.get(&field).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProductField, SourceKind)> + '_ {
        self.0.iter().map(|(f, s)| (*f, *s))
    }
}
