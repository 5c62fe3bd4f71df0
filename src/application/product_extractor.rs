//! Single-page extraction use case
//!
//! parse → views → resolve → derive → check → validate. The document lives
//! only for the duration of one call.

#![allow(clippy::uninlined_format_args)]

use thiserror::Error;
use tracing::{debug, info};

use super::consistency_checker::ConsistencyChecker;
use super::field_resolver::FieldResolver;
use crate::domain::product::CanonicalProduct;
use crate::domain::quality::{ConsistencyFinding, ValidationIssue};
use crate::domain::services::{ContentBuilder, FieldValidator};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::parsing::{PageParser, ParsingError};

/// Failures that leave nothing to extract
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Document at {url} is empty or not HTML")]
    EmptyDocument { url: String },

    #[error("Document at {url} could not be read: {source}")]
    Unreadable {
        url: String,
        #[source]
        source: ParsingError,
    },

    #[error("Extractor setup failed: {0}")]
    Setup(#[source] ParsingError),
}

impl ExtractionError {
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::EmptyDocument { url } | Self::Unreadable { url, .. } => Some(url),
            Self::Setup(_) => None,
        }
    }
}

/// Everything one page produced
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    pub product: CanonicalProduct,
    pub findings: Vec<ConsistencyFinding>,
    pub issues: Vec<ValidationIssue>,
}

impl ExtractionOutcome {
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(ValidationIssue::is_blocking)
    }

    /// Validation issues followed by consistency findings as warnings
    pub fn all_issues(&self) -> Vec<ValidationIssue> {
        self.issues
            .iter()
            .cloned()
            .chain(self.findings.iter().map(ConsistencyFinding::as_issue))
            .collect()
    }
}

/// Shared read-only between batch workers
#[derive(Debug)]
pub struct ProductExtractor {
    parser: PageParser,
    resolver: FieldResolver,
    content: ContentBuilder,
    checker: ConsistencyChecker,
    validator: FieldValidator,
}

impl ProductExtractor {
    pub fn new(config: &AppConfig) -> Result<Self, ExtractionError> {
        let parser = PageParser::new(&config.extraction).map_err(ExtractionError::Setup)?;
        info!(
            "Extractor ready: {} known brands, {} section headers, EUR→BGN {}",
            config.extraction.known_brands.len(),
            config.extraction.section_headers.len(),
            config.validation.eur_to_bgn
        );
        Ok(Self {
            parser,
            resolver: FieldResolver::new(&config.extraction, &config.validation),
            content: ContentBuilder::new(&config.extraction, &config.validation),
            checker: ConsistencyChecker::new(&config.extraction, &config.validation),
            validator: FieldValidator::new(config.validation.clone()),
        })
    }

    pub fn extract(&self, url: &str, markup: impl Into<String>) -> Result<ExtractionOutcome, ExtractionError> {
        let document = self.parser.parse(url, markup).map_err(|e| match e {
            ParsingError::EmptyDocument { url } => ExtractionError::EmptyDocument { url },
            other => ExtractionError::Unreadable { url: url.to_string(), source: other },
        })?;
        let views = self.parser.views(&document);

        let mut product = self.resolver.resolve(&views);
        let weight_text = views.dom().weight_text();
        self.content.apply(&mut product, weight_text.as_deref());

        let findings = self.checker.check(&views, &product);
        let issues = self.validator.validate(&product);

        debug!(
            "Extracted {}: price={:?} EUR, {} images, {} findings, {} issues",
            product.identifier(),
            product.price_eur,
            product.images.len(),
            findings.len(),
            issues.len()
        );
        Ok(ExtractionOutcome { product, findings, issues })
    }
}
