//! Pharma Catalog - multi-source product extraction for pharmacy storefronts
//!
//! Each product page carries the same facts three times: a client-side
//! component payload, schema.org JSON-LD and the rendered markup. This crate
//! reads all three, reconciles them into one [`CanonicalProduct`] with
//! per-field provenance, reports cross-source disagreements, validates the
//! result and aggregates quality over a batch.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;

// Re-export the main entry points
pub use application::{BatchRunner, ExtractionError, ExtractionOutcome, PageInput, ProductExtractor};
pub use domain::services::{Gate, QualitySnapshot, QualityTracker, UsageError};
pub use domain::{CanonicalProduct, ConsistencyFinding, ValidationIssue};
pub use infrastructure::AppConfig;
