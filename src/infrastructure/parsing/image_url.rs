//! Product image URL helpers shared by the readers, the resolver and the
//! consistency checker.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static PRODUCT_IMAGE_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"/images/products/.*").expect("static regex"));

/// Icons, logos, placeholders and listing thumbnails
const NON_PRODUCT_PATTERNS: &[&str] = &[
    ".svg",
    "icon",
    "logo",
    "heart",
    "cart",
    "arrow",
    "close",
    "search",
    "default.jpg",
    "default.png",
    "/media/cache/product_in_category_list",
    "/media/cache/brands_nav_slider",
];

const IMAGE_EXTENSIONS: &[&str] = &[".webp", ".jpg", ".jpeg", ".png", ".gif"];

/// Make a page-relative image reference absolute and percent-encode it.
/// `uploads/` originals are served through the product view cache.
pub fn absolutize(raw: &str, site_domain: &str) -> String {
    let raw = raw.trim();
    let absolute = if raw.starts_with("https://") || raw.starts_with("http://") {
        raw.to_string()
    } else if let Some(rest) = raw.strip_prefix("//") {
        format!("https://{rest}")
    } else {
        let path = raw.trim_start_matches('/');
        let path = path
            .strip_prefix("uploads/")
            .map_or_else(|| path.to_string(), |rest| format!("media/cache/product_view_default/{rest}"));
        format!("https://{site_domain}/{path}")
    };

    Url::parse(&absolute).map_or(absolute, |url| url.to_string())
}

pub fn is_product_image(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }
    let lower = url.to_lowercase();
    if NON_PRODUCT_PATTERNS.iter().any(|p| lower.contains(p)) {
        return false;
    }
    url.contains("/images/products/") || IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// The `/images/products/...` tail, shared by every cache variant of one image
pub fn product_path(url: &str) -> Option<&str> {
    PRODUCT_IMAGE_PATH.find(url).map(|m| m.as_str())
}

/// Deduplication key: the product path when present, the URL otherwise
pub fn dedup_key(url: &str) -> &str {
    product_path(url).unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolutize_relative_and_uploads() {
        assert_eq!(
            absolutize("/uploads/images/products/12/crem.jpg", "benu.bg"),
            "https://benu.bg/media/cache/product_view_default/images/products/12/crem.jpg"
        );
        assert_eq!(
            absolutize("//cdn.benu.bg/images/products/1/a b.png", "benu.bg"),
            "https://cdn.benu.bg/images/products/1/a%20b.png"
        );
        assert_eq!(absolutize("https://benu.bg/x.jpg", "benu.bg"), "https://benu.bg/x.jpg");
    }

    #[test]
    fn test_product_image_filter() {
        assert!(is_product_image("https://benu.bg/images/products/1/a"));
        assert!(is_product_image("https://benu.bg/files/photo.webp"));
        assert!(!is_product_image("https://benu.bg/images/logo.png"));
        assert!(!is_product_image("https://benu.bg/icons/cart.svg"));
    }

    #[test]
    fn test_cache_variants_share_a_key() {
        let a = "https://benu.bg/media/cache/product_view_default/images/products/1/a.jpg";
        let b = "https://benu.bg/uploads/images/products/1/a.jpg";
        assert_eq!(dedup_key(a), dedup_key(b));
        assert_eq!(dedup_key("https://benu.bg/x.jpg"), "https://benu.bg/x.jpg");
    }
}
