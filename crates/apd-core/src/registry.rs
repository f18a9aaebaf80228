//! Interface registry - exclusive ownership of AP interfaces.
//!
//! The claim map is the single source of truth for which interface belongs
//! to which session. It is locked for the whole of a create or a teardown,
//! so two callers can never claim the same interface and a teardown never
//! races a claim.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::{ApdConfig, AuthenticatorConfig};
use crate::error::{ApError, Result};
use crate::interface::InterfaceControl;
use crate::session::ApInterface;
use crate::types::SessionId;

/// Registry of claimed AP interfaces.
pub struct InterfaceRegistry {
    /// Candidate interfaces, in preference order.
    candidates: Vec<String>,
    /// Maximum number of live claims.
    max_sessions: usize,
    /// Shared authenticator launch settings.
    launch: Arc<AuthenticatorConfig>,
    /// Interface control collaborator.
    control: Arc<dyn InterfaceControl>,
    /// Interface name to owning session.
    claims: Mutex<HashMap<String, Arc<ApInterface>>>,
}

impl InterfaceRegistry {
    /// Creates a registry from daemon configuration.
    #[must_use]
    pub fn new(config: &ApdConfig, control: Arc<dyn InterfaceControl>) -> Self {
        Self {
            candidates: config.interfaces.candidates.clone(),
            max_sessions: config.interfaces.max_sessions,
            launch: Arc::new(config.authenticator.clone()),
            control,
            claims: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the candidate interfaces.
    #[must_use]
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Claims a free interface and returns a session for it.
    ///
    /// Picks the first candidate that is unclaimed and exists, and forces it
    /// down before recording the claim. Returns `None` when capacity is
    /// reached or no candidate is available; that is a normal outcome, not
    /// an error.
    pub async fn create_ap_interface(&self) -> Option<Arc<ApInterface>> {
        let mut claims = self.claims.lock().await;

        if claims.len() >= self.max_sessions {
            tracing::info!(
                claimed = claims.len(),
                max = self.max_sessions,
                "AP interface capacity reached"
            );
            return None;
        }

        for name in &self.candidates {
            if claims.contains_key(name) {
                continue;
            }
            if !self.control.exists(name).await {
                tracing::debug!(interface = %name, "candidate interface not present");
                continue;
            }
            if let Err(e) = self.control.set_up_state(name, false).await {
                tracing::warn!(interface = %name, error = %e, "cannot force interface down, not claiming");
                continue;
            }

            let session = Arc::new(ApInterface::new(
                name.clone(),
                Arc::clone(&self.launch),
                Arc::clone(&self.control),
            ));
            claims.insert(name.clone(), Arc::clone(&session));

            tracing::info!(interface = %name, session = %session.id(), "claimed AP interface");
            return Some(session);
        }

        tracing::info!("no AP interface available");
        None
    }

    /// Releases every claim.
    ///
    /// Each session stops its authenticator, forces its interface down and
    /// removes its config file. Idempotent; always returns true.
    pub async fn tear_down_interfaces(&self) -> bool {
        let mut claims = self.claims.lock().await;
        let count = claims.len();

        for (_, session) in claims.drain() {
            session.tear_down().await;
        }

        if count > 0 {
            tracing::info!(count, "released all AP interfaces");
        }
        true
    }

    /// Looks up a live session by handle.
    ///
    /// # Errors
    /// Returns `ApError::NotFound` if no live session has this handle.
    pub async fn session(&self, id: SessionId) -> Result<Arc<ApInterface>> {
        self.claims
            .lock()
            .await
            .values()
            .find(|s| s.id() == id)
            .cloned()
            .ok_or_else(|| ApError::NotFound(format!("session {id}")))
    }

    /// Returns the live session holding `interface`, if any.
    pub async fn session_for(&self, interface: &str) -> Option<Arc<ApInterface>> {
        self.claims.lock().await.get(interface).cloned()
    }

    /// Returns the claimed interface names, sorted.
    pub async fn claimed_interfaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self.claims.lock().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the number of live sessions.
    pub async fn session_count(&self) -> usize {
        self.claims.lock().await.len()
    }
}

impl std::fmt::Debug for InterfaceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterfaceRegistry")
            .field("candidates", &self.candidates)
            .field("max_sessions", &self.max_sessions)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;
    use crate::tests::{MockInterfaceControl, fixtures};
    use crate::types::{AuthenticatorState, EncryptionType};

    fn registry(
        dir: &std::path::Path,
        candidates: &[&str],
        max: usize,
    ) -> (InterfaceRegistry, MockInterfaceControl) {
        let control = MockInterfaceControl::with_interfaces(["wlan0", "wlan1"]);
        let config = ApdConfig::new("/bin/sh", dir)
            .with_authenticator(fixtures::sleeper(dir))
            .with_candidates(candidates.iter().copied())
            .with_max_sessions(max);
        (InterfaceRegistry::new(&config, Arc::new(control.clone())), control)
    }

    #[tokio::test]
    async fn test_create_claims_and_forces_down() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, control) = registry(dir.path(), &["wlan0"], 1);
        control.force_state("wlan0", true);

        let session = registry.create_ap_interface().await.unwrap();
        assert_eq!(session.interface_name(), "wlan0");
        assert_eq!(control.peek("wlan0"), Some(false));
        assert_eq!(registry.claimed_interfaces().await, vec!["wlan0".to_string()]);
        assert_eq!(registry.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_second_create_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, _) = registry(dir.path(), &["wlan0"], 1);

        assert!(registry.create_ap_interface().await.is_some());
        assert!(registry.create_ap_interface().await.is_none());
        assert_eq!(registry.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_capacity_limits_claims() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, _) = registry(dir.path(), &["wlan0", "wlan1"], 1);

        assert!(registry.create_ap_interface().await.is_some());
        assert!(registry.create_ap_interface().await.is_none());
    }

    #[tokio::test]
    async fn test_multiple_sessions_use_distinct_interfaces() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, _) = registry(dir.path(), &["wlan0", "wlan1"], 2);

        let a = registry.create_ap_interface().await.unwrap();
        let b = registry.create_ap_interface().await.unwrap();
        assert_ne!(a.interface_name(), b.interface_name());
        assert_ne!(a.id(), b.id());
        assert!(registry.create_ap_interface().await.is_none());
    }

    #[tokio::test]
    async fn test_missing_candidate_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, _) = registry(dir.path(), &["wlan9", "wlan1"], 1);

        let session = registry.create_ap_interface().await.unwrap();
        assert_eq!(session.interface_name(), "wlan1");
    }

    #[tokio::test]
    async fn test_no_candidates_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, _) = registry(dir.path(), &[], 1);
        assert!(registry.create_ap_interface().await.is_none());
    }

    #[tokio::test]
    async fn test_force_down_failure_does_not_claim() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, control) = registry(dir.path(), &["wlan0"], 1);
        control.fail_set_up_state(true);

        assert!(registry.create_ap_interface().await.is_none());
        assert_eq!(registry.session_count().await, 0);

        control.fail_set_up_state(false);
        assert!(registry.create_ap_interface().await.is_some());
    }

    #[tokio::test]
    async fn test_teardown_releases_and_allows_reclaim() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, control) = registry(dir.path(), &["wlan0"], 1);

        let first = registry.create_ap_interface().await.unwrap();
        assert!(
            first
                .write_hostapd_config("foobar", false, 6, EncryptionType::Open, "")
                .await
        );
        assert!(first.start_hostapd().await);
        control.force_state("wlan0", true);

        assert!(registry.tear_down_interfaces().await);
        assert_eq!(registry.session_count().await, 0);
        assert_eq!(control.peek("wlan0"), Some(false));
        assert!(first.is_released().await);
        assert!(!first.config_path().exists());
        assert_ne!(first.authenticator_state().await, AuthenticatorState::Running);

        let second = registry.create_ap_interface().await.unwrap();
        assert_eq!(second.interface_name(), "wlan0");
        assert_ne!(second.id(), first.id());
    }

    #[tokio::test]
    async fn test_released_session_cannot_stop_new_owner() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, control) = registry(dir.path(), &["wlan0"], 1);

        let old = registry.create_ap_interface().await.unwrap();
        assert!(registry.tear_down_interfaces().await);

        let current = registry.create_ap_interface().await.unwrap();
        assert_eq!(current.interface_name(), "wlan0");
        assert!(
            current
                .write_hostapd_config("foobar", false, 6, EncryptionType::Open, "")
                .await
        );
        assert!(current.start_hostapd().await);
        control.force_state("wlan0", true);
        assert_eq!(current.authenticator_state().await, AuthenticatorState::Running);

        assert!(old.stop_hostapd().await);
        assert_eq!(control.peek("wlan0"), Some(true));
        assert_eq!(current.authenticator_state().await, AuthenticatorState::Running);

        assert!(current.stop_hostapd().await);
        assert_eq!(control.peek("wlan0"), Some(false));
    }

    #[tokio::test]
    async fn test_teardown_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, _) = registry(dir.path(), &["wlan0"], 1);

        assert!(registry.tear_down_interfaces().await);
        registry.create_ap_interface().await.unwrap();
        assert!(registry.tear_down_interfaces().await);
        assert!(registry.tear_down_interfaces().await);
    }

    #[tokio::test]
    async fn test_session_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, _) = registry(dir.path(), &["wlan0"], 1);

        let session = registry.create_ap_interface().await.unwrap();
        let found = registry.session(session.id()).await.unwrap();
        assert!(Arc::ptr_eq(&found, &session));
        assert!(registry.session_for("wlan0").await.is_some());

        let missing = registry.session(SessionId::new()).await;
        assert!(matches!(missing, Err(ApError::NotFound(_))));

        registry.tear_down_interfaces().await;
        assert!(registry.session(session.id()).await.is_err());
        assert!(registry.session_for("wlan0").await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_creates_claim_once() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, _) = registry(dir.path(), &["wlan0"], 4);
        let registry = Arc::new(registry);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry.create_ap_interface().await.is_some()
            }));
        }

        let mut claimed = 0;
        for handle in handles {
            if handle.await.unwrap() {
                claimed += 1;
            }
        }
        assert_eq!(claimed, 1);
    }
}
