//! Dev-mode service harness.
//!
//! Builds a complete [`ApService`] inside a temp directory: file-backed
//! interfaces, a config directory and a fake authenticator. Nothing touches
//! real network devices, so tests run unprivileged.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use apd_core::{ApService, ApdConfig, ControlClient, ControlServer, PollConfig, wait_for};

use crate::error::{Result, TestError};
use crate::fake::{self, FakeAuthenticator};
use crate::file_control::FileInterfaceControl;

/// A running dev-mode service.
pub struct DevModeHarness {
    // Held for its Drop; removes the tree when the harness goes away.
    _dir: tempfile::TempDir,
    interfaces_root: PathBuf,
    config: ApdConfig,
    control: Arc<FileInterfaceControl>,
    service: Arc<ApService>,
}

impl DevModeHarness {
    /// Creates a new harness builder.
    #[must_use]
    pub fn builder() -> DevModeHarnessBuilder {
        DevModeHarnessBuilder::default()
    }

    /// Returns the service under test.
    #[must_use]
    pub fn service(&self) -> &Arc<ApService> {
        &self.service
    }

    /// Returns the file-backed interface control.
    #[must_use]
    pub fn control(&self) -> &Arc<FileInterfaceControl> {
        &self.control
    }

    /// Returns the effective configuration.
    #[must_use]
    pub const fn config(&self) -> &ApdConfig {
        &self.config
    }

    /// Returns the readiness window from the configuration.
    #[must_use]
    pub const fn readiness(&self) -> PollConfig {
        self.config.readiness.poll()
    }

    /// Returns the directory holding interface directories.
    #[must_use]
    pub fn interfaces_root(&self) -> &Path {
        &self.interfaces_root
    }

    /// Returns the hostapd config directory.
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config.authenticator.config_dir
    }

    /// Starts a control server on its own task and returns a client.
    #[must_use]
    pub fn spawn_control(&self) -> ControlClient {
        let (server, client) = ControlServer::new(Arc::clone(&self.service));
        tokio::spawn(server.run());
        client
    }

    /// Returns the PID the fake authenticator recorded for `interface`.
    #[must_use]
    pub fn authenticator_pid(&self, interface: &str) -> Option<i32> {
        fake::recorded_pid(&self.interfaces_root, interface)
    }

    /// Waits until `interface` reaches the given up state.
    ///
    /// # Errors
    /// Returns `TestError::Timeout` if it does not within the readiness window.
    pub async fn wait_for_interface(&self, interface: &str, up: bool) -> Result<()> {
        let poll = self.readiness();
        let control = &self.control;
        let reached = wait_for(poll, move || async move { control.peek(interface) == up }).await;
        if reached {
            Ok(())
        } else {
            Err(TestError::Timeout(poll.timeout))
        }
    }

    /// Tears down every interface.
    pub async fn shutdown(&self) -> bool {
        self.service.tear_down_interfaces().await
    }
}

impl std::fmt::Debug for DevModeHarness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevModeHarness")
            .field("interfaces_root", &self.interfaces_root)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`DevModeHarness`].
#[derive(Debug, Clone)]
pub struct DevModeHarnessBuilder {
    interfaces: Vec<String>,
    max_sessions: usize,
    authenticator: FakeAuthenticator,
    stop_timeout: Duration,
    kill_timeout: Duration,
    readiness: PollConfig,
}

impl Default for DevModeHarnessBuilder {
    fn default() -> Self {
        Self {
            interfaces: vec!["wlan0".to_string()],
            max_sessions: 1,
            authenticator: FakeAuthenticator::default(),
            stop_timeout: Duration::from_secs(1),
            kill_timeout: Duration::from_secs(1),
            readiness: PollConfig::new(Duration::from_secs(3), Duration::from_millis(20)),
        }
    }
}

impl DevModeHarnessBuilder {
    /// Sets the interfaces to create (and use as candidates).
    #[must_use]
    pub fn with_interfaces<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interfaces = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the session capacity.
    #[must_use]
    pub const fn with_max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = max;
        self
    }

    /// Sets the fake authenticator behaviour.
    #[must_use]
    pub const fn with_authenticator(mut self, authenticator: FakeAuthenticator) -> Self {
        self.authenticator = authenticator;
        self
    }

    /// Sets the SIGTERM grace period.
    #[must_use]
    pub const fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Sets the readiness window.
    #[must_use]
    pub const fn with_readiness(mut self, readiness: PollConfig) -> Self {
        self.readiness = readiness;
        self
    }

    /// Builds the harness.
    ///
    /// # Errors
    /// Returns an error if the temp tree cannot be created or the resulting
    /// configuration is invalid.
    pub fn build(self) -> Result<DevModeHarness> {
        let dir = tempfile::tempdir()?;
        let interfaces_root = dir.path().join("net");
        let config_dir = dir.path().join("conf");
        std::fs::create_dir_all(&interfaces_root)?;

        let control = Arc::new(FileInterfaceControl::new(&interfaces_root));
        for name in &self.interfaces {
            control.add_interface(name)?;
        }

        let mut launch = self.authenticator.launch_config(&interfaces_root, &config_dir);
        launch.ctrl_interface = dir.path().join("ctrl");
        launch.stop_timeout = self.stop_timeout;
        launch.kill_timeout = self.kill_timeout;

        let config = ApdConfig::new("/bin/sh", &config_dir)
            .with_authenticator(launch)
            .with_candidates(self.interfaces)
            .with_max_sessions(self.max_sessions)
            .with_readiness(self.readiness.timeout, self.readiness.interval);

        let service = ApService::new(&config, Arc::clone(&control) as Arc<dyn apd_core::InterfaceControl>)
            .map_err(|e| TestError::harness(format!("invalid harness config: {e}")))?;

        tracing::debug!(root = %dir.path().display(), "dev-mode harness ready");

        Ok(DevModeHarness {
            _dir: dir,
            interfaces_root,
            config,
            control,
            service: Arc::new(service),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_default() {
        let harness = DevModeHarness::builder().build().unwrap();
        assert!(harness.interfaces_root().join("wlan0").is_dir());
        assert_eq!(harness.config().interfaces.candidates, vec!["wlan0".to_string()]);
        assert!(!harness.control().peek("wlan0"));
    }

    #[tokio::test]
    async fn test_build_rejects_zero_capacity() {
        let result = DevModeHarness::builder().with_max_sessions(0).build();
        assert!(matches!(result, Err(TestError::Harness(_))));
    }

    #[tokio::test]
    async fn test_wait_for_interface_timeout() {
        let harness = DevModeHarness::builder()
            .with_readiness(PollConfig::new(Duration::from_millis(100), Duration::from_millis(10)))
            .build()
            .unwrap();
        let result = harness.wait_for_interface("wlan0", true).await;
        assert!(matches!(result, Err(TestError::Timeout(_))));
        assert!(harness.wait_for_interface("wlan0", false).await.is_ok());
    }
}
