//! Derived storefront content
//!
//! Everything here is computed from already-resolved fields: handle, tags,
//! weight, HTML description, SEO texts, image alt texts and shopping-feed
//! attributes. No page access happens at this stage.

#![allow(clippy::uninlined_format_args)]

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::domain::constants::limits::IMAGE_ALT_MAX_LEN;
use crate::domain::product::{CanonicalProduct, ContentSections, ProductImage, section_keys};
use crate::domain::provenance::{FieldResolution, ProductField, SourceKind};
use crate::infrastructure::config::{ExtractionConfig, ValidationConfig};

static HANDLE_INVALID: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9-]+").expect("static regex"));
static HYPHEN_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").expect("static regex"));
static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]").expect("static regex"));

/// Unit patterns tried in order, with the factor to grams
static WEIGHT_PATTERNS: Lazy<Vec<(Regex, f64)>> = Lazy::new(|| {
    [
        (r"(\d+(?:[.,]\d+)?)\s*kg", 1000.0),
        (r"(\d+(?:[.,]\d+)?)\s*(?:g|гр)", 1.0),
        (r"(\d+(?:[.,]\d+)?)\s*(?:ml|мл)", 1.0),
        (r"(\d+(?:[.,]\d+)?)\s*(?:l|л)", 1000.0),
        (r"(\d+(?:[.,]\d+)?)\s*mg", 0.001),
    ]
    .into_iter()
    .map(|(pattern, factor)| (Regex::new(pattern).expect("static regex"), factor))
    .collect()
});

/// Pharmaceutical forms, specific before general. Stems only anchor the
/// start of the word ("пластир" covers "пластири").
static APPLICATION_FORMS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    const FORMS: &[(&str, &str, bool)] = &[
        ("таблетки", "Таблетки", false),
        ("капсули", "Капсули", false),
        ("сашета", "Сашета", false),
        ("саше", "Сашета", true),
        ("пастили", "Пастили", false),
        ("драже", "Драже", false),
        ("крем", "Крем", false),
        ("мехлем", "Мехлем", false),
        ("гел", "Гел", false),
        ("маска", "Маска", false),
        ("серум", "Серум", false),
        ("лосион", "Лосион", false),
        ("балсам", "Балсам", false),
        ("пяна", "Пяна", false),
        ("тоник", "Тоник", false),
        ("паста", "Паста", false),
        ("пудра", "Пудра", false),
        ("спрей", "Спрей", false),
        ("капки", "Капки", false),
        ("разтвор", "Разтвор", false),
        ("сироп", "Сироп", false),
        ("суспензия", "Суспензия", false),
        ("олио", "Олио", false),
        ("масло", "Масло", false),
        ("шампоан", "Шампоан", false),
        ("пластир", "Пластири", true),
        ("супозитори", "Супозитории", true),
    ];
    FORMS
        .iter()
        .map(|(keyword, label, is_stem)| {
            let pattern = if *is_stem { format!(r"\b{}", keyword) } else { format!(r"\b{}\b", keyword) };
            (Regex::new(&pattern).expect("static regex"), *label)
        })
        .collect()
});

const BABY_KEYWORDS: &[&str] = &["бебе", "бебета", "бебешк", "новородено", "кърмач"];
const CHILD_KEYWORDS: &[&str] = &["дете", "деца", "детск"];
const KIDS_CATEGORY_KEYWORDS: &[&str] = &["дете", "бебе", "деца", "бебета", "детски", "бебешки"];

/// Section labels in description order
const DESCRIPTION_SECTIONS: &[(&str, &str)] = &[
    (section_keys::DETAILS, "Описание"),
    (section_keys::COMPOSITION, "Състав"),
    (section_keys::USAGE, "Начин на употреба"),
    (section_keys::CONTRAINDICATIONS, "Противопоказания"),
    (section_keys::MORE_INFO, "Допълнителна информация"),
];

const TRANSLITERATION: &[(char, &str)] = &[
    ('а', "a"), ('б', "b"), ('в', "v"), ('г', "g"), ('д', "d"), ('е', "e"),
    ('ж', "zh"), ('з', "z"), ('и', "i"), ('й', "y"), ('к', "k"), ('л', "l"),
    ('м', "m"), ('н', "n"), ('о', "o"), ('п', "p"), ('р', "r"), ('с', "s"),
    ('т', "t"), ('у', "u"), ('ф', "f"), ('х', "h"), ('ц', "ts"), ('ч', "ch"),
    ('ш', "sh"), ('щ', "sht"), ('ъ', "a"), ('ь', ""), ('ю', "yu"), ('я', "ya"),
];

/// Builds the derived fields of a product from its resolved fields
#[derive(Debug, Clone)]
pub struct ContentBuilder {
    store_name: String,
    google_category_map: BTreeMap<String, String>,
    google_default_category: String,
    handle_max_len: usize,
    seo_title_max_len: usize,
    seo_description_max_len: usize,
}

impl ContentBuilder {
    pub fn new(extraction: &ExtractionConfig, validation: &ValidationConfig) -> Self {
        Self {
            store_name: extraction.store_name.clone(),
            google_category_map: extraction.google_category_map.clone(),
            google_default_category: extraction.google_default_category.clone(),
            handle_max_len: validation.handle_max_len,
            seo_title_max_len: validation.seo_title_max_len,
            seo_description_max_len: validation.seo_description_max_len,
        }
    }

    /// Fill every derived field. `weight_text` is the attribute-table weight
    /// cell, if the page has one.
    pub fn apply(&self, product: &mut CanonicalProduct, weight_text: Option<&str>) {
        product.handle = generate_handle(&product.url, &product.title, self.handle_max_len);
        product.tags = product.category_path.clone();
        product.product_type = product.category_path.first().cloned().unwrap_or_default();

        let weight = resolve_weight(weight_text, &product.title);
        product.extraction_method.record(ProductField::Weight, &weight);
        product.weight_grams = weight.value;

        product.description = build_description(&product.brand, &product.sections);
        product.seo_title = self.seo_title(&product.title, &product.brand, &product.category_path);
        product.seo_description =
            self.seo_description(&product.title, &product.brand, &product.category_path, &product.sections);
        apply_alt_texts(&mut product.images, &product.brand, &product.title);

        product.application_form = application_form(&product.title).to_string();
        product.target_audience = target_audience(&product.category_path, &product.title).to_string();
        product.google_age_group = google_age_group(&product.category_path).to_string();
        product.google_product_category = google_product_category(
            &product.category_path,
            &self.google_category_map,
            &self.google_default_category,
        );
        product.google_mpn = product.sku.clone();
    }

    /// Progressive fallback:
    /// "Brand Product - Category | Store", "Brand Product | Store",
    /// "Product | Store", then a truncated title.
    pub fn seo_title(&self, title: &str, brand: &str, categories: &[String]) -> String {
        if title.is_empty() {
            return String::new();
        }
        let max_len = self.seo_title_max_len;
        let suffix = format!(" | {}", self.store_name);
        let display_title = strip_brand_prefix(title, brand);
        let fits = |candidate: &String| char_len(candidate) <= max_len;

        let mut candidates = Vec::with_capacity(3);
        if !brand.is_empty() {
            if let Some(category) = categories.first() {
                candidates.push(format!("{} {} - {}{}", brand, display_title, category, suffix));
            }
            candidates.push(format!("{} {}{}", brand, display_title, suffix));
        }
        candidates.push(format!("{}{}", title, suffix));

        if let Some(candidate) = candidates.into_iter().find(fits) {
            return candidate;
        }

        let available = max_len.saturating_sub(char_len(&suffix) + 3);
        if available > 0 {
            format!("{}...{}", truncate_chars(title, available), suffix)
        } else {
            truncate_chars(title, max_len).to_string()
        }
    }

    /// "Купете {product}. {first sentence}. Поръчайте в {category} на {store}."
    /// shortened step by step until it fits.
    pub fn seo_description(
        &self,
        title: &str,
        brand: &str,
        categories: &[String],
        sections: &ContentSections,
    ) -> String {
        if title.is_empty() {
            return String::new();
        }
        let max_len = self.seo_description_max_len;
        let product_name = branded_name(title, brand);
        let first_sentence = SENTENCE_END
            .split(sections.get(section_keys::DETAILS))
            .next()
            .map(str::trim)
            .unwrap_or_default();
        let cta = match categories.first() {
            Some(category) => format!("Поръчайте в {} на {}.", category, self.store_name),
            None => format!("Поръчайте на {}.", self.store_name),
        };

        let mut candidates = Vec::with_capacity(3);
        if !first_sentence.is_empty() {
            candidates.push(format!("Купете {}. {}. {}", product_name, first_sentence, cta));
        }
        candidates.push(format!("Купете {}. {}", product_name, cta));
        let short = format!("Купете {}.", product_name);

        candidates
            .into_iter()
            .find(|c| char_len(c) <= max_len)
            .unwrap_or_else(|| truncate_chars(&short, max_len).to_string())
    }
}

/// Handle from the URL slug, else a transliterated title.
pub fn generate_handle(url: &str, title: &str, max_len: usize) -> String {
    let from_slug = Url::parse(url).ok().and_then(|parsed| {
        let slug = parsed.path().trim_matches('/').rsplit('/').next()?.to_lowercase();
        let handle = clean_handle(&HANDLE_INVALID.replace_all(&slug, "-"));
        (!handle.is_empty()).then_some(handle)
    });

    let handle = from_slug.unwrap_or_else(|| transliterate_handle(title));
    truncate_chars(&handle, max_len).trim_end_matches('-').to_string()
}

/// Lowercase Latin handle from Bulgarian text: "Козметика за лице" gives
/// "kozmetika-za-litse".
pub fn transliterate_handle(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.to_lowercase().chars() {
        if let Some((_, latin)) = TRANSLITERATION.iter().find(|(cyr, _)| *cyr == c) {
            out.push_str(latin);
        } else if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if c.is_whitespace() || c == '-' || c == '_' {
            out.push('-');
        }
    }
    clean_handle(&out)
}

fn clean_handle(raw: &str) -> String {
    HYPHEN_RUNS.replace_all(raw, "-").trim_matches('-').to_string()
}

/// Weight from the attribute-table cell, else from the title
pub fn resolve_weight(weight_text: Option<&str>, title: &str) -> FieldResolution<u32> {
    if let Some(grams) = weight_text.and_then(parse_weight_grams) {
        return FieldResolution::from(SourceKind::Dom, grams);
    }
    match parse_weight_grams(title) {
        Some(grams) => FieldResolution::from(SourceKind::Derived, grams),
        None => FieldResolution::empty(),
    }
}

/// "1,5 kg" is 1500, "500mg" rounds up to 1. `None` when no unit matches.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_weight_grams(text: &str) -> Option<u32> {
    let text = text.to_lowercase();
    WEIGHT_PATTERNS.iter().find_map(|(pattern, factor)| {
        let value: f64 = pattern.captures(&text)?[1].replace(',', ".").parse().ok()?;
        let grams = value * factor;
        (grams > 0.0).then(|| grams.round().max(1.0) as u32)
    })
}

pub fn build_description(brand: &str, sections: &ContentSections) -> String {
    let mut parts = Vec::new();
    if !brand.is_empty() {
        parts.push(format!("<p><strong>Марка:</strong> {}</p>", escape_html(brand)));
    }
    for (key, label) in DESCRIPTION_SECTIONS {
        let content = sections.get(key);
        if content.is_empty() {
            continue;
        }
        parts.push(format!("<h3>{}</h3>", label));
        parts.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(|line| format!("<p>{}</p>", escape_html(line))),
        );
    }
    parts.join("\n")
}

/// "Brand Title" for a single image, "Brand Title - Снимка i от n" otherwise
pub fn apply_alt_texts(images: &mut [ProductImage], brand: &str, title: &str) {
    let base = branded_name(title, brand);
    let total = images.len();
    for image in images.iter_mut() {
        image.alt_text = if total == 1 {
            truncate_chars(&base, IMAGE_ALT_MAX_LEN).to_string()
        } else {
            let position = format!(" - Снимка {} от {}", image.position, total);
            let available = IMAGE_ALT_MAX_LEN.saturating_sub(char_len(&position));
            if available > 0 {
                format!("{}{}", truncate_chars(&base, available), position)
            } else {
                truncate_chars(&base, IMAGE_ALT_MAX_LEN).to_string()
            }
        };
    }
}

pub fn application_form(title: &str) -> &'static str {
    let title = title.to_lowercase();
    APPLICATION_FORMS
        .iter()
        .find(|(pattern, _)| pattern.is_match(&title))
        .map_or("", |(_, label)| label)
}

/// Babies before children; adults otherwise
pub fn target_audience(categories: &[String], title: &str) -> &'static str {
    let text = format!("{} {}", categories.join(" "), title).to_lowercase();
    if BABY_KEYWORDS.iter().any(|k| text.contains(k)) {
        "Бебета"
    } else if CHILD_KEYWORDS.iter().any(|k| text.contains(k)) {
        "Деца"
    } else {
        "Възрастни"
    }
}

pub fn google_age_group(categories: &[String]) -> &'static str {
    let text = categories.join(" ").to_lowercase();
    if KIDS_CATEGORY_KEYWORDS.iter().any(|k| text.contains(k)) { "kids" } else { "adult" }
}

/// First category that maps wins. Exact keys beat prefix keys, and among
/// prefix keys the longest one wins.
pub fn google_product_category(categories: &[String], map: &BTreeMap<String, String>, default: &str) -> String {
    categories
        .iter()
        .find_map(|category| {
            map.get(category).or_else(|| {
                let folded = category.to_lowercase();
                map.iter()
                    .filter(|(key, _)| !key.is_empty() && folded.starts_with(&key.to_lowercase()))
                    .max_by_key(|(key, _)| key.chars().count())
                    .map(|(_, taxonomy)| taxonomy)
            })
        })
        .map_or_else(|| default.to_string(), Clone::clone)
}

fn branded_name(title: &str, brand: &str) -> String {
    if brand.is_empty() || starts_with_ignore_case(title, brand) {
        title.to_string()
    } else {
        format!("{} {}", brand, title)
    }
}

fn strip_brand_prefix<'t>(title: &'t str, brand: &str) -> &'t str {
    if brand.is_empty() || !starts_with_ignore_case(title, brand) {
        return title;
    }
    let cut = title.char_indices().nth(brand.chars().count()).map_or(title.len(), |(i, _)| i);
    title[cut..].trim_start_matches([' ', '-', '–', '—'])
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.to_lowercase().starts_with(&prefix.to_lowercase())
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    text.char_indices().nth(max_chars).map_or(text, |(i, _)| &text[..i])
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
