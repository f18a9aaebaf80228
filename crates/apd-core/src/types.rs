//! Core types for access point sessions and the authenticator lifecycle.
//!
//! UUIDs for stable session handles, explicit state machines, no
//! implicit transitions.

use serde::{Deserialize, Serialize};

/// Unique identifier for an AP interface session.
///
/// Handles on the control surface refer to sessions by this ID, so a
/// torn-down handle can never alias a later session on the same interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(uuid::Uuid);

impl SessionId {
    /// Creates a new random session ID.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Creates a session ID from a UUID.
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authenticator process lifecycle state.
///
/// ```text
/// NotStarted → Starting → Running → Stopping → Stopped
///                  ↓          ↓                   ↑
///                  └──→ Dead ←┘  ───(stop)────────┘
/// ```
///
/// `Stopped` accepts a new `start`; `Dead` must be stopped (reaped) first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthenticatorState {
    /// No process has ever been started for this session.
    NotStarted,
    /// Process launched, not yet confirmed running.
    Starting,
    /// Process alive and the interface has been brought up.
    Running,
    /// Termination in progress.
    Stopping,
    /// Process reaped after a stop request.
    Stopped,
    /// Process exited without being asked to.
    Dead(FailureReason),
}

impl AuthenticatorState {
    /// Returns true if `start` is accepted in this state.
    #[must_use]
    pub const fn can_start(&self) -> bool {
        matches!(self, Self::NotStarted | Self::Stopped)
    }

    /// Returns true if a process handle is held in this state.
    #[must_use]
    pub const fn has_process(&self) -> bool {
        matches!(
            self,
            Self::Starting | Self::Running | Self::Stopping | Self::Dead(_)
        )
    }

    /// Returns true if the process is believed to be alive.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        matches!(self, Self::Starting | Self::Running | Self::Stopping)
    }

    /// Returns the state name as a static string.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NotStarted => "not-started",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Dead(_) => "dead",
        }
    }
}

impl std::fmt::Display for AuthenticatorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dead(reason) => write!(f, "dead ({reason})"),
            other => f.write_str(other.name()),
        }
    }
}

/// Why an authenticator process died.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// Killed by a signal.
    Signal(i32),
    /// Exited with the given code.
    ExitCode(i32),
    /// Exit status could not be collected.
    Lost,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Signal(sig) => write!(f, "signal {sig}"),
            Self::ExitCode(code) => write!(f, "exit code {code}"),
            Self::Lost => f.write_str("exit status lost"),
        }
    }
}

/// Encryption offered by the access point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EncryptionType {
    /// Open network, no passphrase.
    Open,
    /// WPA2-Personal (CCMP, pre-shared passphrase).
    Wpa2Psk,
}

impl EncryptionType {
    /// Returns true if this encryption type needs a passphrase.
    #[must_use]
    pub const fn requires_passphrase(&self) -> bool {
        matches!(self, Self::Wpa2Psk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn test_session_id_display() {
        let display = SessionId::new().to_string();
        assert!(display.contains('-'));
        assert_eq!(display.len(), 36);
    }

    #[test]
    fn test_session_id_from_uuid() {
        let uuid = uuid::Uuid::nil();
        assert_eq!(SessionId::from_uuid(uuid).as_uuid(), &uuid);
    }

    #[test]
    fn test_can_start() {
        assert!(AuthenticatorState::NotStarted.can_start());
        assert!(AuthenticatorState::Stopped.can_start());
        assert!(!AuthenticatorState::Starting.can_start());
        assert!(!AuthenticatorState::Running.can_start());
        assert!(!AuthenticatorState::Stopping.can_start());
        assert!(!AuthenticatorState::Dead(FailureReason::ExitCode(1)).can_start());
    }

    #[test]
    fn test_has_process() {
        assert!(!AuthenticatorState::NotStarted.has_process());
        assert!(!AuthenticatorState::Stopped.has_process());
        assert!(AuthenticatorState::Dead(FailureReason::Signal(11)).has_process());
        assert!(AuthenticatorState::Running.has_process());
    }

    #[test]
    fn test_dead_is_not_alive() {
        assert!(!AuthenticatorState::Dead(FailureReason::Lost).is_alive());
        assert!(AuthenticatorState::Starting.is_alive());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(AuthenticatorState::Running.to_string(), "running");
        assert_eq!(
            AuthenticatorState::Dead(FailureReason::ExitCode(1)).to_string(),
            "dead (exit code 1)"
        );
    }

    #[test]
    fn test_encryption_requires_passphrase() {
        assert!(EncryptionType::Wpa2Psk.requires_passphrase());
        assert!(!EncryptionType::Open.requires_passphrase());
    }

    #[test]
    fn test_encryption_serde_names() {
        let json = serde_json::to_string(&EncryptionType::Wpa2Psk).unwrap();
        assert_eq!(json, "\"wpa2-psk\"");
    }
}
