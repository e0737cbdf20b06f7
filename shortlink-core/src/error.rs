//! Error types for registry operations.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors returned by [`Registry`](crate::Registry) operations.
///
/// None of these are fatal to the registry; callers report them and carry on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// An argument was rejected before any state changed
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No live record has this code
    #[error("short link not found: {code}")]
    NotFound { code: String },

    /// The record outlived its lifetime and has been removed
    #[error("short link expired: {code}")]
    Expired { code: String },

    /// The record's click limit was already used up; it has been removed
    #[error("click limit reached for short link: {code}")]
    QuotaExceeded { code: String },
}

impl RegistryError {
    /// Returns `true` if the failed operation also evicted the record.
    pub fn evicted(&self) -> bool {
        matches!(
            self,
            RegistryError::Expired { .. } | RegistryError::QuotaExceeded { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_code() {
        let err = RegistryError::QuotaExceeded { code: "abcdEFGH".into() };
        assert_eq!(err.to_string(), "click limit reached for short link: abcdEFGH");
    }

    #[test]
    fn test_evicted_only_for_eviction_paths() {
        assert!(RegistryError::Expired { code: "x".into() }.evicted());
        assert!(RegistryError::QuotaExceeded { code: "x".into() }.evicted());
        assert!(!RegistryError::NotFound { code: "x".into() }.evicted());
        assert!(!RegistryError::InvalidArgument("limit".into()).evicted());
    }
}
