//! Error types for reducir operations

use thiserror::Error;

/// Errors produced by convolution setup and execution
#[derive(Debug, Error)]
pub enum ReducirError {
    /// Convolution geometry is malformed or inconsistent
    #[error("Invalid convolution parameters: {reason}")]
    InvalidParam {
        /// Why the parameters were rejected
        reason: String,
    },

    /// A caller-provided buffer has the wrong length
    #[error("Size mismatch for {what}: expected {expected}, got {actual}")]
    SizeMismatch {
        /// Which buffer or tensor failed the check
        what: &'static str,
        /// Required element count
        expected: usize,
        /// Provided element count
        actual: usize,
    },

    /// `forward` was called before `set_params`
    #[error("Weights not set: call set_params before forward")]
    WeightsNotSet,

    /// The requested code path has no implementation for this backend
    #[error("Unsupported backend: {backend}")]
    UnsupportedBackend {
        /// Name of the backend that is missing the implementation
        backend: &'static str,
    },
}

/// Result type alias for reducir operations
pub type Result<T> = std::result::Result<T, ReducirError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_param_display() {
        let err = ReducirError::InvalidParam {
            reason: "group must divide src_c".to_string(),
        };
        assert!(err.to_string().contains("group must divide src_c"));
    }

    #[test]
    fn test_size_mismatch_display() {
        let err = ReducirError::SizeMismatch {
            what: "scratch",
            expected: 128,
            actual: 64,
        };
        let msg = err.to_string();
        assert!(msg.contains("scratch"));
        assert!(msg.contains("128"));
        assert!(msg.contains("64"));
    }

    #[test]
    fn test_weights_not_set_display() {
        let err = ReducirError::WeightsNotSet;
        assert!(err.to_string().contains("set_params"));
    }
}
