//! Configuration Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A configuration source could not be read or did not match the
    /// expected shape.
    #[display("could not load configuration")]
    Load,
    /// An explicitly requested file, or a default location, does not exist.
    #[display("not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// A value was read but is not acceptable.
    #[display("invalid configuration value: {_0}")]
    InvalidValue(#[error(not(source))] String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(
            ErrorKind::InvalidValue("providers.podcast".to_string()).to_string(),
            "invalid configuration value: providers.podcast"
        );
        assert_eq!(ErrorKind::NotFound(PathBuf::from("/etc/trove.toml")).to_string(), "not found: /etc/trove.toml");
    }
}
