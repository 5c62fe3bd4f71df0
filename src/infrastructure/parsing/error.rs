//! Parsing error types for the source readers
//!
//! Every variant except `EmptyDocument` is recovered inside the source
//! view that raised it: the view becomes absent and resolution continues
//! with the remaining sources.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParsingError {
    #[error("Malformed {channel} payload: {reason}")]
    MalformedPayload {
        channel: String,
        reason: String,
        /// First characters of the offending payload
        excerpt: String,
    },

    #[error("Required element '{element}' not found")]
    ElementMissing {
        element: String,
        context: Option<String>,
    },

    #[error("Invalid CSS selector: {selector} - {reason}")]
    InvalidSelector {
        selector: String,
        reason: String,
    },

    #[error("Unexpected payload structure in {channel}: {reason}")]
    UnexpectedStructure {
        channel: String,
        reason: String,
    },

    #[error("Document is empty or not HTML: {url}")]
    EmptyDocument {
        url: String,
    },
}

impl ParsingError {
    const EXCERPT_LEN: usize = 80;

    /// Create a malformed payload error with a short excerpt for the logs
    pub fn malformed_payload(channel: &str, reason: impl ToString, payload: &str) -> Self {
        Self::MalformedPayload {
            channel: channel.to_string(),
            reason: reason.to_string(),
            excerpt: payload.chars().take(Self::EXCERPT_LEN).collect(),
        }
    }

    pub fn element_missing(element: &str, context: Option<&str>) -> Self {
        Self::ElementMissing {
            element: element.to_string(),
            context: context.map(ToString::to_string),
        }
    }

    pub fn invalid_selector(selector: &str, reason: impl ToString) -> Self {
        Self::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn unexpected_structure(channel: &str, reason: &str) -> Self {
        Self::UnexpectedStructure {
            channel: channel.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Recoverable errors turn a view absent; the rest fail the document.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::MalformedPayload { .. } => true,
            Self::ElementMissing { .. } => true,
            Self::UnexpectedStructure { .. } => true,
            Self::InvalidSelector { .. } => false,
            Self::EmptyDocument { .. } => false,
        }
    }
}

pub type ParsingResult<T> = Result<T, ParsingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_payload_excerpt_is_truncated() {
        let payload = "x".repeat(500);
        let err = ParsingError::malformed_payload("component", "EOF while parsing", &payload);
        match &err {
            ParsingError::MalformedPayload { excerpt, .. } => assert_eq!(excerpt.len(), 80),
            other => panic!("unexpected variant {other:?}"),
        }
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_empty_document_is_not_recoverable() {
        let err = ParsingError::EmptyDocument { url: "https://benu.bg/x".into() };
        assert!(!err.is_recoverable());
        assert_eq!(err.to_string(), "Document is empty or not HTML: https://benu.bg/x");
    }
}
