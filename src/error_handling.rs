//! Typed error definitions.
//!
//! Individual DNS query failures are recorded as strings inside the result
//! maps (they are data, not control flow); the enums here cover the
//! failures that should abort a run: bad configuration and unreadable
//! databases.

use std::path::PathBuf;

use log::SetLoggerError;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// No resolvers configured for the DNS fan-out.
    #[error("No resolvers configured")]
    NoResolvers,
}

/// Error types for database loading (provider rules, GeoIP/ASN data).
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// The database file could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    ReadError {
        /// Path that failed to open
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The provider database JSON could not be parsed.
    #[error("Failed to parse provider database: {0}")]
    ParseError(#[from] serde_json::Error),

    /// A MaxMind database could not be opened.
    #[error("Failed to open MaxMind database: {0}")]
    MaxMindError(#[from] maxminddb::MaxMindDbError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_error_display() {
        let err = DatabaseError::ReadError {
            path: PathBuf::from("/nonexistent/sources.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/nonexistent/sources.json"));
    }

    #[test]
    fn test_parse_error_from_serde() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json")
            .expect_err("should fail to parse");
        let err: DatabaseError = parse_err.into();
        assert!(err.to_string().contains("parse"));
    }
}
