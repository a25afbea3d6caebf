//! Cache Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! Most pipelines log a diagnostic and carry on when a single statement
//! fails; the kinds below are what actually reaches the caller.

use crate::models::Field;
use derive_more::{Display, Error};

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Opening, closing or locking the database failed (includes busy
    /// timeouts while waiting for another writer).
    #[display("database connection error")]
    Connection,
    #[display("database schema error")]
    Migration,
    /// The query lacks a field its subject type cannot be stored without.
    #[display("query is missing required field: {_0}")]
    MissingField(#[error(not(source))] Field),
    /// A load-bearing statement failed.
    #[display("statement failed")]
    Statement,
    /// A stored row did not have the expected shape.
    #[display("malformed result row: {_0}")]
    MalformedResult(#[error(not(source))] &'static str),
    /// Serialization/deserialization error.
    #[display("invalid cache data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exn::ResultExt;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::Connection.to_string(), "database connection error");
        assert_eq!(
            ErrorKind::MissingField(Field::Title).to_string(),
            "query is missing required field: title"
        );
        assert_eq!(ErrorKind::MalformedResult("checksum").to_string(), "malformed result row: checksum");
    }

    #[test]
    fn error_kind_retryable() {
        assert!(ErrorKind::Connection.is_retryable());
        assert!(!ErrorKind::MissingField(Field::Artist).is_retryable());
        assert!(!ErrorKind::Statement.is_retryable());
    }

    #[test]
    fn error_from_result() {
        let result: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::WouldBlock, "database is locked"));
        let err: Result<()> = result.or_raise(|| ErrorKind::Connection);
        let exn = err.unwrap_err();
        assert_eq!(*exn, ErrorKind::Connection);
    }
}
