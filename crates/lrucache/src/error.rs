//! Error types for lrucache

use thiserror::Error;

/// Result type alias for lrucache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building a cache
///
/// Lookups never fail: a miss is `None`, and a full cache evicts.
/// Only construction can be rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Capacity was zero or negative
    #[error("invalid cache capacity {0}: capacity must be a positive integer")]
    InvalidCapacity(i64),

    /// Configuration could not be read
    #[error("invalid cache configuration: {0}")]
    Config(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_capacity_message() {
        let err = Error::InvalidCapacity(-3);
        assert_eq!(
            err.to_string(),
            "invalid cache capacity -3: capacity must be a positive integer"
        );
    }

    #[test]
    fn test_config_from_json_error() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Config(_)));
    }
}
