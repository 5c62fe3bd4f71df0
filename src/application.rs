//! Application layer
//!
//! Use cases that combine the page readers with the domain services:
//! resolving fields, cross-checking sources, extracting one page and
//! running batches.

pub mod batch_runner;
pub mod consistency_checker;
pub mod field_resolver;
pub mod product_extractor;

pub use batch_runner::{BatchResult, BatchRunner, PageInput};
pub use consistency_checker::{Check, ConsistencyChecker, DECLARED_CHECKS};
pub use field_resolver::{FieldResolver, ResolvedPrice};
pub use product_extractor::{ExtractionError, ExtractionOutcome, ProductExtractor};
