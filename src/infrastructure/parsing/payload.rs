//! Shared JSON-from-markup helper
//!
//! Every call site that turns an attribute value or an inline script into
//! JSON goes through [`parse_json_payload`], so entity handling and quote
//! repair never diverge between readers.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::{ParsingError, ParsingResult};

static NUMERIC_ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&#(?:[xX]([0-9a-fA-F]{1,6})|([0-9]{1,7}));").expect("static regex")
});

static TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*([}\]])").expect("static regex"));

/// Named entities that show up in embedded payloads. `&amp;` is last so a
/// double-escaped `&amp;quot;` resolves over two passes, not one.
const NAMED_ENTITIES: &[(&str, &str)] = &[
    ("&quot;", "\""),
    ("&apos;", "'"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&nbsp;", "\u{a0}"),
    ("&amp;", "&"),
];

const MAX_UNESCAPE_PASSES: usize = 3;

/// Decode HTML entities until the text stops changing.
pub fn unescape_entities(raw: &str) -> Cow<'_, str> {
    if !raw.contains('&') {
        return Cow::Borrowed(raw);
    }

    let mut text = raw.to_string();
    for _ in 0..MAX_UNESCAPE_PASSES {
        let next = decode_once(&text);
        if next == text {
            break;
        }
        text = next;
    }
    Cow::Owned(text)
}

fn decode_once(text: &str) -> String {
    let decoded = NUMERIC_ENTITY.replace_all(text, |caps: &regex::Captures<'_>| {
        let code = caps
            .get(1)
            .and_then(|hex| u32::from_str_radix(hex.as_str(), 16).ok())
            .or_else(|| caps.get(2).and_then(|dec| dec.as_str().parse::<u32>().ok()));
        code.and_then(char::from_u32)
            .map_or_else(|| caps[0].to_string(), |c| c.to_string())
    });

    NAMED_ENTITIES
        .iter()
        .fold(decoded.into_owned(), |acc, (entity, replacement)| acc.replace(entity, replacement))
}

/// Parse one embedded JSON payload, repairing it only when it does not
/// parse as written.
///
/// Repairs run in order: entity unescaping, then trailing-comma removal.
/// Well-formed text is never rewritten, so an `&quot;` or a `, }` inside a
/// string value survives. `channel` names the reader for error reporting only.
pub fn parse_json_payload(channel: &str, raw: &str) -> ParsingResult<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParsingError::malformed_payload(channel, "empty payload", raw));
    }
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    let unescaped = unescape_entities(trimmed);
    if let Cow::Owned(text) = &unescaped {
        if let Ok(value) = serde_json::from_str(text) {
            return Ok(value);
        }
    }

    let repaired = TRAILING_COMMA.replace_all(&unescaped, "$1");
    serde_json::from_str(&repaired).map_err(|e| ParsingError::malformed_payload(channel, e, raw))
}

/// Lenient number reading: JSON numbers, numeric strings, comma decimals.
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// Lenient text reading: strings are trimmed, numbers are stringified.
pub fn value_as_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => collapse_whitespace(s),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_named_and_numeric_entities() {
        assert_eq!(unescape_entities("{&quot;a&quot;:1}"), "{\"a\":1}");
        assert_eq!(unescape_entities("{&#34;a&#x22;:1}"), "{\"a\":1}");
        assert_eq!(unescape_entities("&amp;quot;x&amp;quot;"), "\"x\"");
        assert!(matches!(unescape_entities("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_parse_component_style_payload() {
        let raw = "{&quot;price&quot;:13.75,&quot;variants&quot;:[{&quot;price&quot;:13.75,&quot;discountedPrice&quot;:11.65},]}";
        let value = parse_json_payload("component", raw).unwrap();
        assert_eq!(value["variants"][0]["discountedPrice"], json!(11.65));
    }

    #[test]
    fn test_truncated_payload_is_malformed() {
        let err = parse_json_payload("component", "{&quot;price&quot;: 13.7").unwrap_err();
        assert!(matches!(err, ParsingError::MalformedPayload { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_well_formed_json_is_not_rewritten() {
        let raw = r#"{"sku":"NV-150","description":"Крем &quot;Nivea&quot; за лице, }"}"#;
        let value = parse_json_payload("structured_data", raw).unwrap();
        assert_eq!(value["sku"], json!("NV-150"));
        assert_eq!(value["description"], json!("Крем &quot;Nivea&quot; за лице, }"));
    }

    #[test]
    fn test_decoded_attribute_with_trailing_comma() {
        let value = parse_json_payload("component", r#"{"variants":[{"price":4.25},]}"#).unwrap();
        assert_eq!(value["variants"][0]["price"], json!(4.25));
    }

    #[test]
    fn test_lenient_numbers() {
        assert_eq!(value_as_f64(&json!("11,65")), Some(11.65));
        assert_eq!(value_as_f64(&json!(5.26)), Some(5.26));
        assert_eq!(value_as_f64(&json!("n/a")), None);
        assert_eq!(value_as_text(&json!(123456)), Some("123456".to_string()));
        assert_eq!(value_as_text(&json!("  Nivea   Men ")), Some("Nivea Men".to_string()));
    }
}
