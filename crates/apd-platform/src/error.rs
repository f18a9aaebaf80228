//! Platform error types.

use apd_core::ApError;

/// Result type alias for platform operations.
pub type Result<T> = std::result::Result<T, PlatformError>;

/// Platform-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// Interface name unusable as a sysfs path component.
    #[error("invalid interface name {0:?}")]
    InvalidName(String),

    /// A sysfs attribute could not be parsed.
    #[error("failed to parse {attribute}: {value:?}")]
    Parse {
        /// Attribute name.
        attribute: &'static str,
        /// Raw value read.
        value: String,
    },

    /// An external command failed.
    #[error("{command} failed: {reason}")]
    Command {
        /// Command line, for the log.
        command: String,
        /// Exit status and stderr.
        reason: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlatformError {
    /// Creates a command error.
    #[must_use]
    pub fn command(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Command {
            command: command.into(),
            reason: reason.into(),
        }
    }

    /// Converts into the core error for interface `name`.
    #[must_use]
    pub fn for_interface(self, name: &str) -> ApError {
        ApError::interface(name, self.to_string())
    }
}
