use serde_json::Value;

/// Errors produced by the strict read operations.
///
/// The notification engine itself never fails: absent paths fall back and
/// removal misses are logged no-ops. Only the typed/strict reads
/// ([`try_get`](super::Store::try_get), [`get_as`](super::Store::get_as))
/// report problems as errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The path did not resolve to a value in the current state.
    #[error("no value at path '{path}'")]
    PathNotFound {
        /// The path that failed to resolve.
        path: String,
    },

    /// The value at the path could not be deserialized into the requested
    /// type.
    #[error("type mismatch at '{path}': expected {expected}, got {value:?}")]
    TypeMismatch {
        /// The path where the mismatch occurred.
        path: String,
        /// Name of the requested Rust type.
        expected: &'static str,
        /// The value actually stored at the path.
        value: Value,
    },
}
