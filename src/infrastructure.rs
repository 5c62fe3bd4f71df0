//! Infrastructure layer: page parsing, configuration and logging
//!
//! The source readers live under [`parsing`]; nothing in this layer performs
//! network I/O.

pub mod config; // Configuration loading and defaults
pub mod logging; // Logging infrastructure
pub mod parsing; // Page parsing and source views

// Re-export commonly used items
pub use config::{AppConfig, ConfigError, ConfigManager, ExtractionConfig, QualityConfig, ValidationConfig};
pub use logging::{get_log_directory, init_logging_with_config};
pub use parsing::{PageParser, ParsingError, ParsingResult, RawDocument, SourceViews};
