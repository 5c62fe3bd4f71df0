//! Batch quality aggregation and the pass/fail gate
//!
//! One tracker per batch run: `Empty → Accumulating → Finalized`.
//! Duplicated handles and SKUs are counted, never rejected.

#![allow(clippy::uninlined_format_args)]

use std::collections::{BTreeMap, HashSet};
use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::product::CanonicalProduct;
use crate::domain::quality::ValidationIssue;
use crate::infrastructure::config::QualityConfig;

const TOP_ISSUES_IN_SUMMARY: usize = 3;
const TOP_ISSUES_IN_REPORT: usize = 10;

/// Misuse of the tracker lifecycle. The only error that aborts a batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    #[error("Cannot record {identifier}: the quality tracker is already finalized")]
    RecordAfterFinalize { identifier: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackerPhase {
    Empty,
    Accumulating,
    Finalized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Gate {
    Pass,
    Fail,
}

impl Gate {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Pass => 0,
            Self::Fail => 1,
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
        })
    }
}

/// Aggregate view of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitySnapshot {
    pub total: usize,
    /// No issues at all
    pub valid: usize,
    /// Warnings but no errors
    pub warnings_only: usize,
    /// At least one error
    pub errors: usize,
    pub error_rate: f64,
    pub threshold: f64,
    pub gate: Gate,
    pub field_issue_counts: BTreeMap<String, usize>,
    pub duplicate_handles: Vec<String>,
    pub duplicate_skus: Vec<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
}

impl QualitySnapshot {
    fn percent(&self, count: usize) -> f64 {
        if self.total == 0 { 0.0 } else { count as f64 / self.total as f64 * 100.0 }
    }

    /// Fields with the most issues, ties broken by name
    pub fn top_issues(&self, n: usize) -> Vec<(&str, usize)> {
        let mut ranked: Vec<(&str, usize)> = self
            .field_issue_counts
            .iter()
            .map(|(field, count)| (field.as_str(), *count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(n);
        ranked
    }

    /// One-line progress summary
    pub fn summary_line(&self) -> String {
        let mut line = format!(
            "Quality after {}: {:.1}% valid | {:.1}% warnings | {:.1}% errors",
            self.total,
            self.percent(self.valid),
            self.percent(self.warnings_only),
            self.percent(self.errors)
        );
        let top = self.top_issues(TOP_ISSUES_IN_SUMMARY);
        if !top.is_empty() {
            let listed: Vec<String> = top.iter().map(|(f, c)| format!("{} ({})", f, c)).collect();
            let _ = write!(line, " | top issues: {}", listed.join(", "));
        }
        line
    }

    /// Multi-line final report
    pub fn render_report(&self) -> String {
        let rule = "=".repeat(60);
        let mut out = String::new();
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "Quality Report  [{}]", self.gate);
        let _ = writeln!(out, "{}", rule);
        if self.total == 0 {
            let _ = writeln!(out, "  No products processed.");
            let _ = write!(out, "{}", rule);
            return out;
        }

        let _ = writeln!(out, "  Total products:    {:>6}", self.total);
        let _ = writeln!(out, "  Valid (no issues): {:>6}  ({:.1}%)", self.valid, self.percent(self.valid));
        let _ = writeln!(out, "  Warnings only:     {:>6}  ({:.1}%)", self.warnings_only, self.percent(self.warnings_only));
        let _ = writeln!(out, "  Errors:            {:>6}  ({:.1}%)", self.errors, self.percent(self.errors));

        let top = self.top_issues(TOP_ISSUES_IN_REPORT);
        if !top.is_empty() {
            let _ = writeln!(out, "\n  Per-field issue rates (top {}):", TOP_ISSUES_IN_REPORT);
            for (field, count) in top {
                let _ = writeln!(out, "    {:<30} {:>5}  ({:.1}%)", field, count, self.percent(count));
            }
        }
        if let Some(first) = self.duplicate_handles.first() {
            let _ = writeln!(out, "\n  Duplicate handles: {} (e.g. {:?})", self.duplicate_handles.len(), first);
        }
        if let Some(first) = self.duplicate_skus.first() {
            let _ = writeln!(out, "  Duplicate SKUs:    {} (e.g. {:?})", self.duplicate_skus.len(), first);
        }
        if let (Some(min), Some(max)) = (self.price_min, self.price_max) {
            let _ = writeln!(out, "\n  Price range: {:.2} - {:.2} BGN", min, max);
        }
        let _ = writeln!(out, "\n  Gate (>{:.1}% errors = FAIL): {}", self.threshold * 100.0, self.gate);
        let _ = write!(out, "{}", rule);
        out
    }
}

#[derive(Debug)]
pub struct QualityTracker {
    config: QualityConfig,
    phase: TrackerPhase,
    finalized: Option<QualitySnapshot>,
    total: usize,
    valid: usize,
    warnings_only: usize,
    errors: usize,
    field_issue_counts: BTreeMap<String, usize>,
    seen_handles: HashSet<String>,
    duplicate_handles: Vec<String>,
    seen_skus: HashSet<String>,
    duplicate_skus: Vec<String>,
    price_min: Option<f64>,
    price_max: Option<f64>,
}

impl QualityTracker {
    pub fn new(config: QualityConfig) -> Self {
        Self {
            config,
            phase: TrackerPhase::Empty,
            finalized: None,
            total: 0,
            valid: 0,
            warnings_only: 0,
            errors: 0,
            field_issue_counts: BTreeMap::new(),
            seen_handles: HashSet::new(),
            duplicate_handles: Vec::new(),
            seen_skus: HashSet::new(),
            duplicate_skus: Vec::new(),
            price_min: None,
            price_max: None,
        }
    }

    pub fn phase(&self) -> TrackerPhase {
        self.phase
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Record one product with all of its issues (validation and consistency).
    pub fn record(&mut self, product: &CanonicalProduct, issues: &[ValidationIssue]) -> Result<(), UsageError> {
        if self.phase == TrackerPhase::Finalized {
            return Err(UsageError::RecordAfterFinalize { identifier: product.identifier().to_string() });
        }
        self.phase = TrackerPhase::Accumulating;
        self.total += 1;

        if issues.iter().any(ValidationIssue::is_blocking) {
            self.errors += 1;
        } else if issues.is_empty() {
            self.valid += 1;
        } else {
            self.warnings_only += 1;
        }
        for issue in issues {
            *self.field_issue_counts.entry(issue.field.clone()).or_insert(0) += 1;
        }

        if !product.handle.is_empty() && !self.seen_handles.insert(product.handle.clone()) {
            debug!("Duplicate handle: {}", product.handle);
            self.duplicate_handles.push(product.handle.clone());
            *self.field_issue_counts.entry("handle_duplicate".to_string()).or_insert(0) += 1;
        }
        if !product.sku.is_empty() && !self.seen_skus.insert(product.sku.clone()) {
            debug!("Duplicate SKU: {}", product.sku);
            self.duplicate_skus.push(product.sku.clone());
            *self.field_issue_counts.entry("sku_duplicate".to_string()).or_insert(0) += 1;
        }

        if let Some(price) = product.price.filter(|p| p.is_finite()) {
            self.price_min = Some(self.price_min.map_or(price, |min| min.min(price)));
            self.price_max = Some(self.price_max.map_or(price, |max| max.max(price)));
        }

        if self.config.summary_every > 0 && self.total % self.config.summary_every == 0 {
            info!("{}", self.snapshot().summary_line());
        }
        Ok(())
    }

    /// Current aggregate without changing the phase
    pub fn snapshot(&self) -> QualitySnapshot {
        if let Some(done) = &self.finalized {
            return done.clone();
        }
        let error_rate = if self.total == 0 { 0.0 } else { self.errors as f64 / self.total as f64 };
        let gate = if error_rate > self.config.error_rate_threshold { Gate::Fail } else { Gate::Pass };
        QualitySnapshot {
            total: self.total,
            valid: self.valid,
            warnings_only: self.warnings_only,
            errors: self.errors,
            error_rate,
            threshold: self.config.error_rate_threshold,
            gate,
            field_issue_counts: self.field_issue_counts.clone(),
            duplicate_handles: self.duplicate_handles.clone(),
            duplicate_skus: self.duplicate_skus.clone(),
            price_min: self.price_min,
            price_max: self.price_max,
        }
    }

    /// Close the batch. Calling again returns the same snapshot.
    pub fn finalize(&mut self) -> QualitySnapshot {
        if let Some(done) = &self.finalized {
            return done.clone();
        }
        let snapshot = self.snapshot();
        if snapshot.gate == Gate::Fail {
            warn!(
                "Quality gate FAIL: {} of {} products with errors ({:.1}% > {:.1}%)",
                snapshot.errors,
                snapshot.total,
                snapshot.error_rate * 100.0,
                snapshot.threshold * 100.0
            );
        } else {
            info!("Quality gate PASS: {} products, {} with errors", snapshot.total, snapshot.errors);
        }
        self.phase = TrackerPhase::Finalized;
        self.finalized = Some(snapshot.clone());
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn product(handle: &str, sku: &str, price: f64) -> CanonicalProduct {
        CanonicalProduct {
            handle: handle.into(),
            sku: sku.into(),
            price: Some(price),
            ..CanonicalProduct::default()
        }
    }

    fn tracker() -> QualityTracker {
        QualityTracker::new(QualityConfig::default())
    }

    #[test]
    fn test_lifecycle() {
        let mut t = tracker();
        assert_eq!(t.phase(), TrackerPhase::Empty);
        t.record(&product("a", "1", 5.0), &[]).unwrap();
        assert_eq!(t.phase(), TrackerPhase::Accumulating);

        let first = t.finalize();
        assert_eq!(t.phase(), TrackerPhase::Finalized);
        assert_eq!(t.finalize(), first);

        let err = t.record(&product("b", "2", 5.0), &[]).unwrap_err();
        assert_eq!(err, UsageError::RecordAfterFinalize { identifier: "b".into() });
        assert_eq!(t.snapshot().total, 1);
    }

    #[rstest]
    #[case(6, Gate::Fail)]
    #[case(5, Gate::Pass)]
    #[case(0, Gate::Pass)]
    fn test_gate_is_strictly_greater(#[case] failing: usize, #[case] expected: Gate) {
        let mut t = tracker();
        let error = [ValidationIssue::error("price", "missing")];
        for i in 0..100 {
            let issues: &[ValidationIssue] = if i < failing { &error } else { &[] };
            t.record(&product(&format!("p-{}", i), &i.to_string(), 10.0), issues).unwrap();
        }
        let snapshot = t.finalize();
        assert_eq!(snapshot.gate, expected);
        assert_eq!(snapshot.gate.exit_code(), i32::from(expected == Gate::Fail));
    }

    #[test]
    fn test_empty_batch_passes() {
        let snapshot = tracker().finalize();
        assert_eq!(snapshot.gate, Gate::Pass);
        assert!(snapshot.render_report().contains("No products processed"));
    }

    #[test]
    fn test_classification_and_field_counts() {
        let mut t = tracker();
        t.record(&product("a", "1", 3.0), &[]).unwrap();
        t.record(&product("b", "2", 9.0), &[ValidationIssue::warning("consistency_price", "x")]).unwrap();
        t.record(
            &product("c", "3", 6.0),
            &[ValidationIssue::error("brand", "missing"), ValidationIssue::warning("description", "missing")],
        )
        .unwrap();

        let s = t.snapshot();
        assert_eq!((s.valid, s.warnings_only, s.errors), (1, 1, 1));
        assert_eq!(s.field_issue_counts["consistency_price"], 1);
        assert_eq!(s.field_issue_counts["brand"], 1);
        assert_eq!((s.price_min, s.price_max), (Some(3.0), Some(9.0)));
    }

    #[test]
    fn test_duplicates_are_counted_not_rejected() {
        let mut t = tracker();
        t.record(&product("same", "SKU-1", 1.0), &[]).unwrap();
        t.record(&product("same", "SKU-1", 1.0), &[]).unwrap();
        t.record(&product("other", "", 1.0), &[]).unwrap();

        let s = t.finalize();
        assert_eq!(s.total, 3);
        assert_eq!(s.duplicate_handles, vec!["same".to_string()]);
        assert_eq!(s.duplicate_skus, vec!["SKU-1".to_string()]);
        assert_eq!(s.field_issue_counts["handle_duplicate"], 1);
        assert!(s.render_report().contains("Duplicate handles: 1"));
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut t = tracker();
        t.record(&product("a", "1", 3.0), &[]).unwrap();
        let json = serde_json::to_value(t.finalize()).unwrap();
        assert_eq!(json["gate"], "PASS");
        assert_eq!(json["total"], 1);
    }
}
