use std::fmt;

use serde::{Deserialize, Serialize};

use super::provenance::SourceKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    /// Blocking: counts toward the batch quality gate
    Error,
    /// Non-blocking
    Warning,
}

/// One field-level problem on a resolved product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub severity: IssueSeverity,
    pub message: String,
}

impl ValidationIssue {
    pub fn error(field: &str, message: impl Into<String>) -> Self {
        Self { field: field.to_string(), severity: IssueSeverity::Error, message: message.into() }
    }

    pub fn warning(field: &str, message: impl Into<String>) -> Self {
        Self { field: field.to_string(), severity: IssueSeverity::Warning, message: message.into() }
    }

    pub fn is_blocking(&self) -> bool {
        self.severity == IssueSeverity::Error
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// A value observed in one source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcedValue {
    pub source: SourceKind,
    pub value: String,
}

impl SourcedValue {
    pub fn new(source: SourceKind, value: impl Into<String>) -> Self {
        Self { source, value: value.into() }
    }
}

/// One pairwise disagreement between two sources. Always a warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyFinding {
    /// Check name, e.g. `price` or `section_usage`
    pub check: String,
    pub field: String,
    pub left: SourcedValue,
    pub right: SourcedValue,
    /// Relative deviation for numeric checks
    pub deviation: Option<f64>,
    pub severity: IssueSeverity,
}

impl ConsistencyFinding {
    pub fn new(check: &str, field: &str, left: SourcedValue, right: SourcedValue, deviation: Option<f64>) -> Self {
        Self {
            check: check.to_string(),
            field: field.to_string(),
            left,
            right,
            deviation,
            severity: IssueSeverity::Warning,
        }
    }

    /// Same finding expressed as a non-blocking issue, for the quality tracker.
    pub fn as_issue(&self) -> ValidationIssue {
        ValidationIssue::warning(&format!("consistency_{}", self.check), self.to_string())
    }
}

impl fmt::Display for ConsistencyFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={:?} vs {}={:?}",
            self.left.source, self.left.value, self.right.source, self.right.value
        )?;
        if let Some(deviation) = self.deviation {
            write!(f, " ({:.1}% deviation)", deviation * 100.0)?;
        }
        Ok(())
    }
}
