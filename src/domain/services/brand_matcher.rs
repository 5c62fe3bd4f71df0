//! Known-brand lookup
//!
//! Brands are matched case-insensitively and always returned with the
//! capitalization from the configured list.

use std::collections::{BTreeSet, HashMap};

/// Longest multi-word brand tried against a title prefix
const MAX_BRAND_WORDS: usize = 3;

#[derive(Debug, Clone, Default)]
pub struct BrandMatcher {
    by_lowercase: HashMap<String, String>,
}

impl BrandMatcher {
    pub fn new(known_brands: &BTreeSet<String>) -> Self {
        let by_lowercase = known_brands
            .iter()
            .map(|brand| brand.trim())
            .filter(|brand| !brand.is_empty())
            .map(|brand| (brand.to_lowercase(), brand.to_string()))
            .collect();
        Self { by_lowercase }
    }

    pub fn len(&self) -> usize {
        self.by_lowercase.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_lowercase.is_empty()
    }

    /// Canonical spelling of a known brand, `None` for unknown ones
    pub fn canonical(&self, brand: &str) -> Option<&str> {
        self.by_lowercase
            .get(&brand.trim().to_lowercase())
            .map(String::as_str)
    }

    /// Canonical spelling when known, the input trimmed otherwise
    pub fn canonicalize(&self, brand: &str) -> String {
        self.canonical(brand)
            .map_or_else(|| brand.trim().to_string(), str::to_string)
    }

    /// Match the first three, two, then one title words against the list.
    ///
    /// "La Roche-Posay Effaclar" resolves to "La Roche-Posay" before "La"
    /// gets a chance.
    pub fn match_title(&self, title: &str) -> Option<&str> {
        let words: Vec<&str> = title.split_whitespace().collect();
        (1..=MAX_BRAND_WORDS.min(words.len()))
            .rev()
            .find_map(|n| self.canonical(&words[..n].join(" ")))
    }
}
