//! Parallel batch extraction with one quality stream
//!
//! Pages are extracted on rayon workers, each owning its own document. The
//! results are then fed to the tracker in input order, so the snapshot of a
//! batch does not depend on scheduling.

#![allow(clippy::uninlined_format_args)]

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use rayon::prelude::*;
use tracing::{info, warn};

use super::product_extractor::{ExtractionError, ExtractionOutcome, ProductExtractor};
use crate::domain::product::CanonicalProduct;
use crate::domain::quality::ValidationIssue;
use crate::domain::services::{QualitySnapshot, QualityTracker, UsageError};
use crate::infrastructure::config::QualityConfig;

/// One page to extract
#[derive(Debug, Clone)]
pub struct PageInput {
    pub url: String,
    pub markup: String,
}

impl PageInput {
    pub fn new(url: impl Into<String>, markup: impl Into<String>) -> Self {
        Self { url: url.into(), markup: markup.into() }
    }
}

/// Per-page results of one `run`, in input order
#[derive(Debug)]
pub struct BatchResult {
    pub outcomes: Vec<Result<ExtractionOutcome, ExtractionError>>,
}

impl BatchResult {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

pub struct BatchRunner {
    extractor: Arc<ProductExtractor>,
    tracker: Mutex<QualityTracker>,
}

impl BatchRunner {
    pub fn new(extractor: Arc<ProductExtractor>, quality: QualityConfig) -> Self {
        Self { extractor, tracker: Mutex::new(QualityTracker::new(quality)) }
    }

    /// Extract a chunk of pages. May be called repeatedly until `finalize`.
    pub fn run(&self, pages: &[PageInput]) -> Result<BatchResult, UsageError> {
        let started = Instant::now();
        let outcomes: Vec<Result<ExtractionOutcome, ExtractionError>> = pages
            .par_iter()
            .map(|page| self.extractor.extract(&page.url, page.markup.as_str()))
            .collect();

        let mut tracker = self.lock_tracker();
        for (page, outcome) in pages.iter().zip(&outcomes) {
            match outcome {
                Ok(outcome) => tracker.record(&outcome.product, &outcome.all_issues())?,
                Err(e) => {
                    warn!("Extraction failed for {}: {}", page.url, e);
                    let placeholder = CanonicalProduct { url: page.url.clone(), ..CanonicalProduct::default() };
                    tracker.record(&placeholder, &[ValidationIssue::error("document", e.to_string())])?;
                }
            }
        }
        drop(tracker);

        let result = BatchResult { outcomes };
        info!(
            "Extracted {} pages ({} failed) in {:?}",
            pages.len(),
            result.failed(),
            started.elapsed()
        );
        Ok(result)
    }

    pub fn snapshot(&self) -> QualitySnapshot {
        self.lock_tracker().snapshot()
    }

    /// Close the batch and log the final report
    pub fn finalize(&self) -> QualitySnapshot {
        let snapshot = self.lock_tracker().finalize();
        for line in snapshot.render_report().lines() {
            info!("{}", line);
        }
        snapshot
    }

    /// A panic while recording leaves the counters usable, so a poisoned
    /// lock is recovered rather than propagated.
    fn lock_tracker(&self) -> MutexGuard<'_, QualityTracker> {
        self.tracker.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
