//! Run-wide accounting of decomposition: counters plus a diagnostic log.
//!
//! One accumulator is passed by `&mut` through a decomposition. Parallel
//! workers each own one and [`DecompositionStats::merge`] them afterwards.

use crate::syntax::SourceSpan;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a diagnostic was raised
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub source: Option<String>,
    pub span: Option<SourceSpan>,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = self.source.as_deref().unwrap_or("<unknown>");
        match &self.span {
            Some(span) => write!(f, "{source}\n{span}"),
            None => f.write_str(source),
        }
    }
}

/// Human-readable record of a lossy or unusual decomposition step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Content still exceeded the unit budget and was cut
    Truncated {
        location: Location,
        original: String,
        truncated: String,
        lost: usize,
    },
    /// Oversized statement of a kind with no dedicated policy
    UnhandledKind { location: Location, label: String },
    /// Recursion bound reached; children were left inline
    DepthLimit { location: Location, depth: usize },
    /// A child's rendering was not found in the parent text
    SpanNotFound { location: Location, label: String },
    /// An input the caller could not load or parse
    FailedInput { source: String, reason: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated {
                location,
                original,
                truncated,
                ..
            } => write!(f, "{location}\ncut off from:\n{original}\nto:\n{truncated}"),
            Self::UnhandledKind { location, label } => {
                write!(f, "{location}\nUnhandled long statement type: {label}")
            }
            Self::DepthLimit { location, depth } => {
                write!(f, "{location}\nDepth limit {depth} reached, children kept inline")
            }
            Self::SpanNotFound { location, label } => {
                write!(f, "{location}\nRendered {label} statement not found in parent text")
            }
            Self::FailedInput { source, reason } => {
                write!(f, "{source} can't be parsed for:\n{reason}")
            }
        }
    }
}

/// Counters and diagnostics accumulated over a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecompositionStats {
    /// Chunks produced (one per returned chunk, top-level included)
    pub chunks: usize,
    /// Chunks whose content had to be truncated
    pub truncated: usize,
    /// Total length removed by truncation, in the oracle's metric
    pub truncated_length: usize,
    /// Inputs the caller skipped
    pub failed_inputs: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl DecompositionStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_chunk(&mut self) {
        self.chunks += 1;
    }

    pub fn record_truncation(&mut self, location: Location, original: String, truncated: String, lost: usize) {
        self.truncated += 1;
        self.truncated_length += lost;
        self.diagnostics.push(Diagnostic::Truncated {
            location,
            original,
            truncated,
            lost,
        });
    }

    pub fn record_unhandled_kind(&mut self, location: Location, label: impl Into<String>) {
        self.diagnostics.push(Diagnostic::UnhandledKind {
            location,
            label: label.into(),
        });
    }

    pub fn record_depth_limit(&mut self, location: Location, depth: usize) {
        self.diagnostics.push(Diagnostic::DepthLimit { location, depth });
    }

    pub fn record_span_not_found(&mut self, location: Location, label: impl Into<String>) {
        self.diagnostics.push(Diagnostic::SpanNotFound {
            location,
            label: label.into(),
        });
    }

    pub fn record_failed_input(&mut self, source: impl Into<String>, reason: impl Into<String>) {
        self.failed_inputs += 1;
        self.diagnostics.push(Diagnostic::FailedInput {
            source: source.into(),
            reason: reason.into(),
        });
    }

    /// Fold another accumulator into this one, appending its diagnostics
    pub fn merge(&mut self, other: Self) {
        self.chunks += other.chunks;
        self.truncated += other.truncated;
        self.truncated_length += other.truncated_length;
        self.failed_inputs += other.failed_inputs;
        self.diagnostics.extend(other.diagnostics);
    }

    #[must_use]
    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            chunks: self.chunks,
            truncated: self.truncated,
            truncated_length: self.truncated_length,
            failed_inputs: self.failed_inputs,
            average_truncated_length: (self.truncated > 0)
                .then(|| self.truncated_length as f64 / self.truncated as f64),
            diagnostics: self.diagnostics.len(),
        }
    }

    /// Summary header followed by every diagnostic, blank-line separated
    #[must_use]
    pub fn render_log(&self) -> String {
        let mut out = self.summary().to_string();
        for diagnostic in &self.diagnostics {
            out.push_str("\n\n");
            out.push_str(&diagnostic.to_string());
        }
        out.push('\n');
        out
    }
}

/// Counter snapshot for a run report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub chunks: usize,
    pub truncated: usize,
    pub truncated_length: usize,
    pub failed_inputs: usize,
    pub average_truncated_length: Option<f64>,
    pub diagnostics: usize,
}

impl fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Number of failed inputs: {}", self.failed_inputs)?;
        writeln!(f, "Number of truncated chunks: {}", self.truncated)?;
        writeln!(f, "Number of chunks: {}", self.chunks)?;
        match self.average_truncated_length {
            Some(avg) => write!(f, "Average truncated length: {avg:.2}"),
            None => write!(f, "Average truncated length: /"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn location() -> Location {
        Location {
            source: Some("src/Foo.java".to_string()),
            span: Some(SourceSpan::new(3, 5, 9, 1)),
        }
    }

    #[test]
    fn test_summary_average() {
        let mut stats = DecompositionStats::new();
        assert_eq!(stats.summary().average_truncated_length, None);

        stats.record_chunk();
        stats.record_truncation(location(), "abcdef".into(), "abc".into(), 3);
        stats.record_truncation(location(), "abcdefgh".into(), "abc".into(), 5);
        let summary = stats.summary();
        assert_eq!(summary.truncated, 2);
        assert_eq!(summary.truncated_length, 8);
        assert_eq!(summary.average_truncated_length, Some(4.0));
        assert_eq!(summary.diagnostics, 2);
    }

    #[test]
    fn test_merge() {
        let mut left = DecompositionStats::new();
        left.record_chunk();
        left.record_unhandled_kind(location(), "LabeledStmt");

        let mut right = DecompositionStats::new();
        right.record_chunk();
        right.record_chunk();
        right.record_failed_input("src/Bad.json", "expected value");

        left.merge(right);
        assert_eq!(left.chunks, 3);
        assert_eq!(left.failed_inputs, 1);
        assert_eq!(left.diagnostics.len(), 2);
        assert!(matches!(left.diagnostics[1], Diagnostic::FailedInput { .. }));
    }

    #[test]
    fn test_render_log() {
        let mut stats = DecompositionStats::new();
        stats.record_chunk();
        stats.record_truncation(location(), "abcdef".into(), "abc".into(), 3);

        assert_eq!(
            stats.render_log(),
            "Number of failed inputs: 0
Number of truncated chunks: 1
Number of chunks: 1
Average truncated length: 3.00

src/Foo.java
(line 3,col 5)-(line 9,col 1)
cut off from:
abcdef
to:
abc
"
        );
    }
}
