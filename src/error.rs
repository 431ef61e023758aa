//! Error types for union catalog runs.
//!
//! This module provides the [`MarcError`] type for all library operations
//! and the [`Result`] convenience type.
//!
//! Errors fall in three groups:
//! - record framing problems ([`MarcError::ParseError`] and friends), which the
//!   loader turns into warnings so one corrupt record never drops a source;
//! - configuration problems ([`MarcError::ConfigError`]), which abort the run
//!   before any matching starts;
//! - input problems ([`MarcError::SourceUnreadable`], [`MarcError::NoReadableSources`]),
//!   fatal for one source, or for the whole run when no source is left.

use thiserror::Error;

/// Error type for all library operations.
#[derive(Error, Debug)]
pub enum MarcError {
    /// Error indicating an invalid or malformed MARC record.
    #[error("Invalid MARC record: {0}")]
    InvalidRecord(String),

    /// Error indicating an invalid leader (24-byte header).
    #[error("Invalid leader: {0}")]
    InvalidLeader(String),

    /// Error indicating an invalid field structure.
    #[error("Invalid field: {0}")]
    InvalidField(String),

    /// Error during parsing of record framing or a MARCXML document.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Error indicating a truncated or incomplete record.
    #[error("Truncated record: {0}")]
    TruncatedRecord(String),

    /// Invalid option value or conflicting option combination.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A labeled source could not be read.
    #[error("Source '{label}' is unreadable: {source}")]
    SourceUnreadable {
        /// Label of the failing source
        label: String,
        /// Underlying IO failure
        #[source]
        source: std::io::Error,
    },

    /// Every declared source failed to load.
    #[error("No readable sources: {0}")]
    NoReadableSources(String),

    /// An output artifact could not be serialized.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// IO error from the underlying source/destination.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl MarcError {
    /// Process exit status a caller should report for this error.
    ///
    /// Zero is never returned: it is reserved for a successful run, including
    /// one that found no matches at all.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            MarcError::ConfigError(_) => 2,
            MarcError::SourceUnreadable { .. } | MarcError::NoReadableSources(_) => 3,
            _ => 1,
        }
    }

    /// Whether the error only affects one record and can be skipped.
    #[must_use]
    pub fn is_record_level(&self) -> bool {
        matches!(
            self,
            MarcError::InvalidRecord(_)
                | MarcError::InvalidLeader(_)
                | MarcError::InvalidField(_)
                | MarcError::ParseError(_)
                | MarcError::TruncatedRecord(_)
        )
    }
}

impl From<csv::Error> for MarcError {
    fn from(err: csv::Error) -> Self {
        MarcError::SerializationError(format!("CSV: {err}"))
    }
}

impl From<serde_json::Error> for MarcError {
    fn from(err: serde_json::Error) -> Self {
        MarcError::SerializationError(format!("JSON: {err}"))
    }
}

/// Convenience type alias for [`std::result::Result`] with [`MarcError`].
pub type Result<T> = std::result::Result<T, MarcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_from_success() {
        let config = MarcError::ConfigError("bad".to_string());
        let input = MarcError::NoReadableSources("none".to_string());
        let other = MarcError::SerializationError("x".to_string());

        assert_eq!(config.exit_code(), 2);
        assert_eq!(input.exit_code(), 3);
        assert_eq!(other.exit_code(), 1);
    }

    #[test]
    fn test_record_level_classification() {
        assert!(MarcError::ParseError("x".to_string()).is_record_level());
        assert!(MarcError::InvalidLeader("x".to_string()).is_record_level());
        assert!(!MarcError::ConfigError("x".to_string()).is_record_level());
    }

    #[test]
    fn test_source_unreadable_message() {
        let err = MarcError::SourceUnreadable {
            label: "LIB1".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        let msg = err.to_string();
        assert!(msg.contains("LIB1"));
        assert!(msg.contains("missing"));
    }
}
