//! Domain services
//!
//! Business rules that operate on resolved products and need no page access.

pub mod barcode;
pub mod brand_matcher;
pub mod content_builder;
pub mod field_validator;
pub mod quality_tracker;

pub use barcode::{is_valid_barcode, normalize_barcode};
pub use brand_matcher::BrandMatcher;
pub use content_builder::ContentBuilder;
pub use field_validator::FieldValidator;
pub use quality_tracker::{Gate, QualitySnapshot, QualityTracker, TrackerPhase, UsageError};
