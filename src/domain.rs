//! Domain module - Core product entities and value objects
//!
//! This module contains the canonical product record, provenance
//! bookkeeping and the issue/finding types produced by the services layer.
//!
//! Modern Rust module organization (Rust 2018+ style):
//! - Each module is its own file in the domain/ directory
//! - Public exports are defined here for convenience

pub mod constants;
pub mod product;
pub mod provenance;
pub mod quality;
pub mod services;

pub use product::{CanonicalProduct, ContentSections, ProductImage};
pub use provenance::{ExtractionMethod, FieldResolution, ProductField, SourceKind};
pub use quality::{ConsistencyFinding, IssueSeverity, ValidationIssue};
