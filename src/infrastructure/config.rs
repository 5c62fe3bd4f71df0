//! Configuration infrastructure
//!
//! Contains configuration loading for the extraction core.
//!
//! Configuration is organized into four sections:
//! 1. `extraction` - markup names, site domain, known brands, section headers
//! 2. `validation` - conversion rate, tolerances and field limits
//! 3. `quality` - batch gate threshold
//! 4. `logging` - subscriber setup
//!
//! Every section is an immutable value handed to the service that needs it
//! at construction time. Nothing here is read as ambient global state.

#![allow(clippy::derivable_impls)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::domain::constants;
use crate::domain::product::section_keys;
use crate::infrastructure::parsing::DomSelectors;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config from file: {source}")]
    FileLoad {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub extraction: ExtractionConfig,
    pub validation: ValidationConfig,
    pub quality: QualityConfig,
    pub logging: LoggingConfig,
}

/// One content section: its key and the header strings that open it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionHeader {
    pub key: String,
    /// Header markers, most specific first. Matched case-insensitively.
    pub markers: Vec<String>,
}

impl SectionHeader {
    pub fn new(key: &str, markers: &[&str]) -> Self {
        Self {
            key: key.to_string(),
            markers: markers.iter().map(|m| (*m).to_string()).collect(),
        }
    }
}

/// Source-reader settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Custom element carrying the component payload
    pub component_tag: String,

    /// Attribute on `component_tag` with the escaped JSON payload
    pub component_attribute: String,

    /// Domain used to absolutise relative image URLs
    pub site_domain: String,

    /// Store name used in SEO titles and descriptions
    pub store_name: String,

    /// Reference brand list for the last-resort brand lookup
    pub known_brands: BTreeSet<String>,

    /// Ordered content section headers. New sections are added here only.
    pub section_headers: Vec<SectionHeader>,

    /// Text markers that end the last content section
    pub section_terminators: Vec<String>,

    /// Boilerplate lines cut from captured sections
    pub section_noise: Vec<String>,

    /// Markup regions whose contents never describe the primary product
    pub excluded_regions: Vec<String>,

    /// Store category → shopping-feed taxonomy. A key also matches
    /// categories it prefixes, case-insensitively.
    pub google_category_map: BTreeMap<String, String>,

    /// Taxonomy used when no category maps
    pub google_default_category: String,

    /// CSS selector lists for the markup reader
    pub selectors: DomSelectors,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            component_tag: constants::site::COMPONENT_TAG.to_string(),
            component_attribute: constants::site::COMPONENT_ATTRIBUTE.to_string(),
            site_domain: constants::site::DEFAULT_SITE_DOMAIN.to_string(),
            store_name: constants::site::STORE_NAME.to_string(),
            known_brands: BTreeSet::new(),
            section_headers: vec![
                SectionHeader::new(section_keys::DETAILS, &["какво представлява", "описание"]),
                SectionHeader::new(section_keys::COMPOSITION, &["активни съставки", "състав"]),
                SectionHeader::new(
                    section_keys::USAGE,
                    &["дозировка и начин на употреба", "начин на употреба"],
                ),
                SectionHeader::new(section_keys::CONTRAINDICATIONS, &["противопоказания"]),
                SectionHeader::new(section_keys::MORE_INFO, &["допълнителна информация"]),
            ],
            section_terminators: vec!["все още няма ревюта".to_string()],
            section_noise: vec![
                "попитай магистър-фармацевт".to_string(),
                "оставете твоето мнение".to_string(),
                "бъди първият написал".to_string(),
            ],
            excluded_regions: defaults::EXCLUDED_REGIONS.iter().map(|s| (*s).to_string()).collect(),
            google_category_map: BTreeMap::new(),
            google_default_category: constants::site::DEFAULT_GOOGLE_CATEGORY.to_string(),
            selectors: DomSelectors::default(),
        }
    }
}

/// Validation and reconciliation constants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// EUR → BGN conversion rate. A legally fixed peg: never read from
    /// files or the environment, only overridable in code.
    #[serde(skip, default = "defaults::eur_to_bgn")]
    pub eur_to_bgn: f64,

    /// Relative tolerance for price comparisons
    pub price_tolerance: f64,

    pub title_min_len: usize,
    pub title_max_len: usize,
    pub handle_max_len: usize,
    pub price_max: f64,
    pub seo_title_max_len: usize,
    pub seo_description_max_len: usize,

    /// Image hosts that indicate a broken URL build
    pub placeholder_domains: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            eur_to_bgn: constants::currency::EUR_TO_BGN,
            price_tolerance: constants::currency::PRICE_TOLERANCE,
            title_min_len: constants::limits::TITLE_MIN_LEN,
            title_max_len: constants::limits::TITLE_MAX_LEN,
            handle_max_len: constants::limits::HANDLE_MAX_LEN,
            price_max: constants::limits::PRICE_MAX,
            seo_title_max_len: constants::limits::SEO_TITLE_MAX_LEN,
            seo_description_max_len: constants::limits::SEO_DESCRIPTION_MAX_LEN,
            placeholder_domains: defaults::PLACEHOLDER_DOMAINS.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

/// Batch quality gate settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Batch fails when errored / total exceeds this
    pub error_rate_threshold: f64,

    /// Emit a one-line summary every N products (0 disables)
    pub summary_every: usize,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            error_rate_threshold: constants::quality::ERROR_RATE_GATE,
            summary_every: constants::quality::SUMMARY_EVERY,
        }
    }
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted file logs
    pub json_format: bool,

    /// Enable console output
    pub console_output: bool,

    /// Enable file output
    pub file_output: bool,

    /// Log directory; defaults to `logs/` next to the executable
    pub directory: Option<PathBuf>,

    /// Log file name
    pub file_name: String,

    /// Rotation: "daily" or "never"
    pub rotation: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            directory: None,
            file_name: defaults::LOG_FILE_NAME.to_string(),
            rotation: defaults::LOG_ROTATION.to_string(),
        }
    }
}

impl AppConfig {
    /// Environment variable prefix, e.g. `PHARMA_QUALITY__ERROR_RATE_THRESHOLD=0.1`
    pub const ENV_PREFIX: &'static str = "PHARMA";

    /// Load from a config file (any format the `config` crate supports)
    /// layered under `PHARMA_*` environment variables.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix(Self::ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults layered under environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(
                config::Environment::with_prefix(Self::ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration value sanity checks
    pub fn validate(&self) -> Result<(), ConfigError> {
        let v = &self.validation;
        if !(v.eur_to_bgn.is_finite() && v.eur_to_bgn > 0.0) {
            return Err(ConfigError::Validation {
                message: format!("eur_to_bgn must be a positive number, got {}", v.eur_to_bgn),
            });
        }
        if !(0.0..1.0).contains(&v.price_tolerance) {
            return Err(ConfigError::Validation {
                message: format!("price_tolerance must be in [0, 1), got {}", v.price_tolerance),
            });
        }
        if v.title_min_len > v.title_max_len {
            return Err(ConfigError::Validation {
                message: "title_min_len cannot be greater than title_max_len".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.quality.error_rate_threshold) {
            return Err(ConfigError::Validation {
                message: format!(
                    "error_rate_threshold must be in [0, 1], got {}",
                    self.quality.error_rate_threshold
                ),
            });
        }
        if self.extraction.section_headers.iter().any(|h| h.markers.is_empty()) {
            return Err(ConfigError::Validation {
                message: "every section header needs at least one marker".to_string(),
            });
        }
        Ok(())
    }
}

/// Configuration manager for locating the config file
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join("pharma-catalog");
        Ok(config_dir)
    }

    pub fn new() -> anyhow::Result<Self> {
        let config_path = Self::get_config_dir()?.join("pharma_catalog.toml");
        Ok(Self { config_path })
    }

    pub fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// Load the config file when present, defaults (plus env) otherwise
    pub fn load_config(&self) -> anyhow::Result<AppConfig> {
        if self.config_path.exists() {
            info!("Loading configuration from {:?}", self.config_path);
            AppConfig::from_file(&self.config_path)
                .with_context(|| format!("Failed to load {}", self.config_path.display()))
        } else {
            info!("No configuration file at {:?}, using defaults", self.config_path);
            AppConfig::from_env().context("Failed to build default configuration")
        }
    }
}

/// Default configuration values
pub mod defaults {
    /// Default log level
    pub const LOG_LEVEL: &str = "info";

    /// Default JSON format setting
    pub const LOG_JSON_FORMAT: bool = false;

    /// Default console output setting
    pub const LOG_CONSOLE_OUTPUT: bool = true;

    /// Default file output setting
    pub const LOG_FILE_OUTPUT: bool = false;

    /// Default log file name
    pub const LOG_FILE_NAME: &str = "pharma-catalog.log";

    /// Default rotation strategy
    pub const LOG_ROTATION: &str = "daily";

    /// Related-products carousels and recommendation strips
    pub const EXCLUDED_REGIONS: &[&str] = &[
        ".related-products",
        ".products-carousel",
        ".product-carousel",
        ".similar-products",
        ".upsell",
        ".crosssell",
        "[data-role='related-products']",
    ];

    pub const fn eur_to_bgn() -> f64 {
        crate::domain::constants::currency::EUR_TO_BGN
    }

    /// Placeholder image hosts (subdomains included)
    pub const PLACEHOLDER_DOMAINS: &[&str] = &["example.com", "placeholder.com", "via.placeholder.com"];
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_default_config_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.validation.eur_to_bgn, 1.95583);
        assert_eq!(config.quality.error_rate_threshold, 0.05);
        assert_eq!(config.extraction.section_headers.len(), 5);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[quality]\nerror_rate_threshold = 0.1\n\n[extraction]\nknown_brands = [\"Nivea\", \"La Roche-Posay\"]"
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.quality.error_rate_threshold, 0.1);
        assert_eq!(config.extraction.known_brands.len(), 2);
        assert_eq!(config.validation.eur_to_bgn, 1.95583);
        assert_eq!(config.extraction.component_tag, "add-to-cart");
    }

    #[test]
    fn test_manager_loads_category_map_from_explicit_path() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[extraction.google_category_map]\n\"Козметика\" = \"Health & Beauty > Personal Care > Cosmetics\""
        )
        .unwrap();

        let config = ConfigManager::with_path(file.path().to_path_buf()).load_config().unwrap();
        let map = &config.extraction.google_category_map;
        assert_eq!(map.len(), 1);
        assert!(map.keys().all(|k| k.to_lowercase() == "козметика"));
        assert_eq!(config.extraction.google_default_category, "Health & Beauty > Health Care > Pharmacy");

        let missing = ConfigManager::with_path(file.path().with_extension("missing.toml"));
        assert!(missing.load_config().unwrap().extraction.google_category_map.is_empty());
    }

    #[test]
    fn test_invalid_rate_is_rejected() {
        let mut config = AppConfig::default();
        config.validation.eur_to_bgn = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation { .. })));

        let mut config = AppConfig::default();
        config.quality.error_rate_threshold = 1.5;
        assert!(config.validate().is_err());
    }
}
