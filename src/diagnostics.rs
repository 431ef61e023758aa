//! Run warnings.
//!
//! Problems that do not stop a run are collected as [`Warning`]s: a skipped
//! record, an unreadable source while others remain, fast-mode scoring, or a
//! union record trimmed to fit ISO 2709. Each one is logged through `tracing`
//! when recorded and later written to the report and the manifest, so nothing
//! is dropped silently.

use serde::Serialize;
use std::fmt;

/// Pipeline stage a warning was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Loading and parsing sources
    Load,
    /// Strong or fuzzy matching
    Match,
    /// Merge synthesis
    Merge,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Load => "load",
            Stage::Match => "match",
            Stage::Merge => "merge",
        })
    }
}

/// One non-fatal problem found during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    /// Stage that raised the warning
    pub stage: Stage,
    /// Source label, when the warning concerns one source
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Human-readable description
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "[{}] {}: {}", self.stage, source, self.message),
            None => write!(f, "[{}] {}", self.stage, self.message),
        }
    }
}

/// Accumulator for warnings raised during one run.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Create an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning about one source.
    pub fn source_warning(&mut self, stage: Stage, source: &str, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(%stage, source, "{message}");
        self.warnings.push(Warning {
            stage,
            source: Some(source.to_string()),
            message,
        });
    }

    /// Record a run-wide warning.
    pub fn warning(&mut self, stage: Stage, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(%stage, "{message}");
        self.warnings.push(Warning {
            stage,
            source: None,
            message,
        });
    }

    /// Warnings recorded so far, in the order they were raised.
    #[must_use]
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Whether any warning was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Consume the accumulator.
    #[must_use]
    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warnings_keep_order() {
        let mut diagnostics = Diagnostics::new();
        assert!(diagnostics.is_empty());

        diagnostics.source_warning(Stage::Load, "LIB1", "record 3 skipped");
        diagnostics.warning(Stage::Match, "fast mode");

        let warnings = diagnostics.warnings();
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].source.as_deref(), Some("LIB1"));
        assert_eq!(warnings[1].stage, Stage::Match);
    }

    #[test]
    fn test_display() {
        let warning = Warning {
            stage: Stage::Load,
            source: Some("LIB1".to_string()),
            message: "bad leader".to_string(),
        };
        assert_eq!(warning.to_string(), "[load] LIB1: bad leader");
    }
}
