//! Error types for apd-core.
//!
//! Errors stay inside the daemon: callers on the control surface see
//! `false` or an empty result, never a crash.

/// Result type alias for access point operations.
pub type Result<T> = std::result::Result<T, ApError>;

/// Error type for access point operations.
#[derive(Debug, thiserror::Error)]
pub enum ApError {
    /// Daemon configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// SSID failed validation.
    #[error("invalid ssid: {0}")]
    InvalidSsid(String),

    /// Passphrase failed validation.
    #[error("invalid passphrase: {0}")]
    InvalidPassphrase(String),

    /// Channel does not map to a supported band.
    #[error("invalid channel {0}: not in a supported band")]
    InvalidChannel(u32),

    /// Interface control failed.
    #[error("interface {name}: {reason}")]
    Interface {
        /// The interface name.
        name: String,
        /// What went wrong.
        reason: String,
    },

    /// Session or interface not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The control server rejected a request or has gone away.
    #[error("control request failed: {0}")]
    Control(String),
}

impl ApError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an interface control error.
    #[must_use]
    pub fn interface(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Interface {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a control surface error.
    #[must_use]
    pub fn control(msg: impl Into<String>) -> Self {
        Self::Control(msg.into())
    }

    /// Returns true if this error came from validating a hostapd config.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidSsid(_) | Self::InvalidPassphrase(_) | Self::InvalidChannel(_)
        )
    }
}
