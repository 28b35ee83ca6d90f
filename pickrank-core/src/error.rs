/// Error types for the ranking engine.
///
/// Only `DuplicatePair` indicates a defect in the engine. Everything else is
/// recovered where it is detected: stale resolutions are ignored, malformed
/// persisted state falls back to defaults, an invalid K means "no limit".
use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, RankError>;

#[derive(Debug, Error)]
pub enum RankError {
    /// A pair was recorded twice with conflicting outcomes.
    #[error("pair {first} / {second} already recorded with the opposite outcome")]
    DuplicatePair { first: String, second: String },

    /// A resolution did not match the currently pending comparison.
    #[error("no pending comparison matches {0}")]
    StaleResolution(String),

    /// A persisted value could not be decoded or was structurally inconsistent.
    #[error("malformed persisted state under '{key}': {reason}")]
    MalformedPersistedState { key: String, reason: String },

    /// K was zero, negative or not a number.
    #[error("invalid top-k bound '{0}'")]
    InvalidTopK(String),

    /// A new run was requested while comparisons are still outstanding.
    #[error("a ranking run is already in progress")]
    RankingInProgress,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RankError {
    /// Whether the error reflects an engine defect rather than bad input.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RankError::DuplicatePair { .. } | RankError::Store(_))
    }
}

/// Failure reported by a `KeyValueStore` backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write key '{key}': {source}")]
    Write {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove key '{key}': {source}")]
    Remove {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode value for '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let dup = RankError::DuplicatePair { first: "a".into(), second: "b".into() };
        assert!(dup.is_fatal());
        assert!(!RankError::StaleResolution("x".into()).is_fatal());
        assert!(!RankError::InvalidTopK("0".into()).is_fatal());
        assert!(!RankError::RankingInProgress.is_fatal());
    }

    #[test]
    fn test_messages() {
        let err = RankError::MalformedPersistedState {
            key: "ranking-items".into(),
            reason: "expected a sequence".into(),
        };
        assert_eq!(
            err.to_string(),
            "malformed persisted state under 'ranking-items': expected a sequence"
        );
    }
}
