//! Test error types.

/// Result type alias for test operations.
pub type Result<T> = std::result::Result<T, TestError>;

/// Testing errors.
#[derive(Debug, thiserror::Error)]
pub enum TestError {
    /// Harness error.
    #[error("harness error: {0}")]
    Harness(String),

    /// Timeout.
    #[error("timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Core error.
    #[error("apd error: {0}")]
    Ap(#[from] apd_core::ApError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TestError {
    /// Creates a harness error.
    #[must_use]
    pub fn harness(msg: impl Into<String>) -> Self {
        Self::Harness(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harness_error_display() {
        assert_eq!(
            TestError::harness("no interfaces").to_string(),
            "harness error: no interfaces"
        );
    }

    #[test]
    fn test_from_ap_error() {
        let err: TestError = apd_core::ApError::config("bad").into();
        assert!(matches!(err, TestError::Ap(_)));
    }
}
