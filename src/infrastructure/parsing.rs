//! HTML parsing infrastructure for product pages
//!
//! One [`RawDocument`] is projected into three independent source views.
//! [`PageParser`] holds everything compiled once per run (selectors, the
//! section splitter) and is shared read-only between worker threads;
//! [`SourceViews`] is the per-document, lazily computed set of views.

pub mod component_view;
pub mod config;
pub mod document;
pub mod dom_view;
pub mod error;
pub mod image_url;
pub mod payload;
pub mod section_splitter;
pub mod source_view;
pub mod structured_data_view;

// Re-export public types
pub use component_view::ComponentView;
pub use config::DomSelectors;
pub use document::RawDocument;
pub use dom_view::{DomSelectorSet, DomView, PageMetadata};
pub use error::{ParsingError, ParsingResult};
pub use section_splitter::{SectionSplit, SectionSplitter};
pub use source_view::{FieldValue, Money, SourceView};
pub use structured_data_view::StructuredDataView;

use once_cell::unsync::OnceCell;
use scraper::Selector;
use tracing::{debug, error, warn};

use crate::domain::provenance::{ProductField, SourceKind};
use crate::infrastructure::config::ExtractionConfig;

/// Compiled readers for one configuration
#[derive(Debug)]
pub struct PageParser {
    component_element: Selector,
    component_attribute: String,
    structured_data_scripts: Selector,
    dom_selectors: DomSelectorSet,
    splitter: SectionSplitter,
}

impl PageParser {
    pub fn new(config: &ExtractionConfig) -> ParsingResult<Self> {
        Ok(Self {
            component_element: dom_view::compile_one(&config.component_tag)?,
            component_attribute: config.component_attribute.clone(),
            structured_data_scripts: dom_view::compile_one(config::STRUCTURED_DATA_SCRIPT)?,
            dom_selectors: DomSelectorSet::compile(&config.selectors, &config.excluded_regions)?,
            splitter: SectionSplitter::new(
                config.section_headers.clone(),
                config.section_terminators.clone(),
                config.section_noise.clone(),
            ),
        })
    }

    pub fn parse(&self, url: &str, markup: impl Into<String>) -> ParsingResult<RawDocument> {
        RawDocument::parse(url, markup)
    }

    pub fn views<'doc>(&'doc self, document: &'doc RawDocument) -> SourceViews<'doc> {
        SourceViews {
            parser: self,
            document,
            component: OnceCell::new(),
            structured_data: OnceCell::new(),
            dom: OnceCell::new(),
        }
    }
}

/// Memoized source views of one document. Each view is computed on first
/// use and never recomputed; the document is only read.
pub struct SourceViews<'doc> {
    parser: &'doc PageParser,
    document: &'doc RawDocument,
    component: OnceCell<Option<ComponentView>>,
    structured_data: OnceCell<Option<StructuredDataView>>,
    dom: OnceCell<DomView>,
}

impl<'doc> SourceViews<'doc> {
    pub fn document(&self) -> &'doc RawDocument {
        self.document
    }

    /// The view for a channel, `None` when the channel is absent
    pub fn view(&self, kind: SourceKind) -> Option<SourceView<'_>> {
        match kind {
            SourceKind::Component => self.component().map(SourceView::Component),
            SourceKind::StructuredData => self.structured_data().map(SourceView::StructuredData),
            SourceKind::Dom | SourceKind::PageMetadata => Some(SourceView::Dom(self.dom())),
            SourceKind::TitleHeuristic | SourceKind::KnownBrands | SourceKind::Derived => None,
        }
    }

    /// One field from one source. Page metadata is served by the markup view.
    pub fn get(&self, kind: SourceKind, field: ProductField) -> Option<FieldValue> {
        match kind {
            SourceKind::PageMetadata => self.dom().page_metadata.get(field).filter(|v| !v.is_empty()),
            _ => self.view(kind)?.get(field),
        }
    }

    pub fn component(&self) -> Option<&ComponentView> {
        self.component
            .get_or_init(|| {
                let result = ComponentView::read(
                    self.document,
                    &self.parser.component_element,
                    &self.parser.component_attribute,
                );
                absent_on_error(self.document.url(), SourceKind::Component, result)
            })
            .as_ref()
    }

    pub fn structured_data(&self) -> Option<&StructuredDataView> {
        self.structured_data
            .get_or_init(|| {
                let result = StructuredDataView::read(self.document, &self.parser.structured_data_scripts);
                absent_on_error(self.document.url(), SourceKind::StructuredData, result)
            })
            .as_ref()
    }

    pub fn dom(&self) -> &DomView {
        self.dom
            .get_or_init(|| DomView::read(self.document, &self.parser.dom_selectors, &self.parser.splitter))
    }
}

/// The view boundary: recoverable errors become an absent view
fn absent_on_error<T>(url: &str, kind: SourceKind, result: ParsingResult<T>) -> Option<T> {
    match result {
        Ok(view) => Some(view),
        Err(e @ ParsingError::ElementMissing { .. }) => {
            debug!("{} view absent for {}: {}", kind, url, e);
            None
        }
        Err(e) if e.is_recoverable() => {
            warn!("{} view absent for {}: {}", kind, url, e);
            None
        }
        Err(e) => {
            error!("{} view failed for {}: {}", kind, url, e);
            None
        }
    }
}
