//! AP interface session.
//!
//! An [`ApInterface`] is handed out by the registry for one claimed
//! interface. It owns the interface's hostapd config and authenticator
//! supervisor; every lifecycle operation takes the session lock, so
//! operations on one session never interleave.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::AuthenticatorConfig;
use crate::hostapd::{self, HostapdConfig};
use crate::interface::InterfaceControl;
use crate::supervisor::{AuthenticatorSupervisor, StopOutcome};
use crate::types::{AuthenticatorState, EncryptionType, SessionId};
use crate::wait::{PollConfig, wait_for};

/// A claimed access point interface.
pub struct ApInterface {
    id: SessionId,
    interface: String,
    config_path: PathBuf,
    launch: Arc<AuthenticatorConfig>,
    inner: Mutex<SessionState>,
}

struct SessionState {
    config: Option<HostapdConfig>,
    supervisor: AuthenticatorSupervisor,
    released: bool,
}

impl ApInterface {
    /// Creates a session for an interface the registry has just claimed.
    pub(crate) fn new(
        interface: impl Into<String>,
        launch: Arc<AuthenticatorConfig>,
        control: Arc<dyn InterfaceControl>,
    ) -> Self {
        let interface = interface.into();
        let supervisor =
            AuthenticatorSupervisor::new(interface.clone(), Arc::clone(&launch), control);
        Self {
            id: SessionId::new(),
            config_path: launch.config_path(&interface),
            interface,
            launch,
            inner: Mutex::new(SessionState {
                config: None,
                supervisor,
                released: false,
            }),
        }
    }

    /// Returns the session handle.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Returns the claimed interface name. Never empty.
    #[must_use]
    pub fn interface_name(&self) -> &str {
        &self.interface
    }

    /// Returns where this session writes its hostapd config.
    #[must_use]
    pub fn config_path(&self) -> &std::path::Path {
        &self.config_path
    }

    /// Validates, renders and durably writes a new hostapd config.
    ///
    /// Returns false if validation or the write fails; the stored config
    /// and the file on disk are then exactly as before. On success the file
    /// has been flushed before the stored config is replaced. A running
    /// authenticator keeps the config it was started with.
    pub async fn write_hostapd_config(
        &self,
        ssid: impl Into<Vec<u8>>,
        hidden: bool,
        channel: u32,
        encryption: EncryptionType,
        passphrase: impl Into<Vec<u8>>,
    ) -> bool {
        let mut state = self.inner.lock().await;
        if state.released {
            tracing::warn!(interface = %self.interface, "config write on released session");
            return false;
        }

        let config = match HostapdConfig::new(ssid, hidden, channel, encryption, passphrase) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(interface = %self.interface, error = %e, "rejected hostapd config");
                return false;
            }
        };

        let text = config.render(&self.interface, &self.launch.ctrl_interface);
        if let Err(e) = hostapd::write_durable(&self.config_path, &text).await {
            tracing::warn!(
                interface = %self.interface,
                path = %self.config_path.display(),
                error = %e,
                "failed to write hostapd config"
            );
            return false;
        }

        tracing::info!(
            interface = %self.interface,
            channel = config.channel(),
            encryption = ?config.encryption(),
            hidden = config.hidden(),
            "hostapd config written"
        );
        state.config = Some(config);
        true
    }

    /// Returns the last successfully written config.
    pub async fn config(&self) -> Option<HostapdConfig> {
        self.inner.lock().await.config.clone()
    }

    /// Starts the authenticator against the written config.
    ///
    /// Returns false without a config, after release, or if a process is
    /// already held. Does not wait for the authenticator to come up.
    pub async fn start_hostapd(&self) -> bool {
        let mut state = self.inner.lock().await;
        if state.released {
            tracing::warn!(interface = %self.interface, "start on released session");
            return false;
        }
        if state.config.is_none() {
            tracing::warn!(interface = %self.interface, "start without hostapd config");
            return false;
        }
        state.supervisor.start(&self.config_path)
    }

    /// Stops the authenticator and forces the interface down.
    ///
    /// Always returns true, including when nothing was started. A released
    /// session no longer owns its interface and leaves it untouched.
    pub async fn stop_hostapd(&self) -> bool {
        let mut state = self.inner.lock().await;
        if state.released {
            tracing::debug!(interface = %self.interface, "stop on released session ignored");
            return true;
        }
        state.supervisor.stop().await
    }

    /// Polls and returns the authenticator state.
    pub async fn authenticator_state(&self) -> AuthenticatorState {
        self.inner.lock().await.supervisor.refresh().await
    }

    /// Liveness predicate: true while the authenticator process is alive.
    pub async fn is_hostapd_running(&self) -> bool {
        self.authenticator_state().await.is_alive()
    }

    /// Waits for the authenticator to be confirmed running.
    ///
    /// Stops polling early once the state leaves `Starting`. Returns true
    /// only if the final state is `Running`.
    pub async fn wait_until_running(&self, poll: PollConfig) -> bool {
        wait_for(poll, move || async move {
            self.authenticator_state().await != AuthenticatorState::Starting
        })
        .await;
        self.inner.lock().await.supervisor.state() == AuthenticatorState::Running
    }

    /// Returns how the most recent stop ended.
    pub async fn last_stop(&self) -> Option<StopOutcome> {
        self.inner.lock().await.supervisor.last_stop()
    }

    /// Returns true once the session has been torn down.
    pub async fn is_released(&self) -> bool {
        self.inner.lock().await.released
    }

    /// Stops the authenticator, forces the interface down and removes the
    /// config file. The session is unusable afterwards.
    pub(crate) async fn tear_down(&self) {
        let mut state = self.inner.lock().await;
        if state.released {
            return;
        }

        state.supervisor.stop().await;

        match tokio::fs::remove_file(&self.config_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                interface = %self.interface,
                path = %self.config_path.display(),
                error = %e,
                "failed to remove hostapd config"
            ),
        }

        state.config = None;
        state.released = true;
        tracing::info!(interface = %self.interface, session = %self.id, "session released");
    }
}

impl std::fmt::Debug for ApInterface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApInterface")
            .field("id", &self.id)
            .field("interface", &self.interface)
            .field("config_path", &self.config_path)
            .finish_non_exhaustive()
    }
}
