//! Authenticator process supervision.
//!
//! Owns one child process at a time and couples its lifecycle to the
//! interface's kernel state:
//!
//! - `start` spawns and returns as soon as the process exists. Bringing the
//!   interface up is the authenticator's job once it has programmed the
//!   driver; the supervisor never forces it up.
//! - `refresh` is the only way state advances on its own: a poll notices a
//!   crash (`Dead`) or a live process with the interface up (`Running`).
//! - `stop` terminates with a bounded wait, escalates to SIGKILL, and then
//!   forces the interface down no matter how the process went away.
//!
//! # Known race
//!
//! Between spawn and the authenticator finishing driver setup, a stop can
//! leave the driver half-configured. This is not handled here. Callers
//! wait for `Running` (see `ApInterface::wait_until_running`) before
//! treating the authenticator as controllable.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use tokio::process::{Child, Command};

use crate::config::AuthenticatorConfig;
use crate::interface::{self, InterfaceControl};
use crate::types::{AuthenticatorState, FailureReason};

/// How the last stop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// No process was held.
    NoProcess,
    /// The process had already exited before termination was requested.
    AlreadyExited,
    /// The process exited after SIGTERM.
    Terminated,
    /// The process ignored SIGTERM and was killed.
    Killed,
    /// The process could not be confirmed dead; the handle was dropped.
    Abandoned,
}

/// Supervises the authenticator for one interface.
pub struct AuthenticatorSupervisor {
    interface: String,
    launch: Arc<AuthenticatorConfig>,
    control: Arc<dyn InterfaceControl>,
    state: AuthenticatorState,
    child: Option<Child>,
    pid: Option<u32>,
    spawn_count: u64,
    last_stop: Option<StopOutcome>,
}

impl AuthenticatorSupervisor {
    /// Creates a supervisor in the `NotStarted` state.
    #[must_use]
    pub fn new(
        interface: impl Into<String>,
        launch: Arc<AuthenticatorConfig>,
        control: Arc<dyn InterfaceControl>,
    ) -> Self {
        Self {
            interface: interface.into(),
            launch,
            control,
            state: AuthenticatorState::NotStarted,
            child: None,
            pid: None,
            spawn_count: 0,
            last_stop: None,
        }
    }

    /// Returns the supervised interface name.
    #[must_use]
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Returns the last observed state without polling.
    #[must_use]
    pub const fn state(&self) -> AuthenticatorState {
        self.state
    }

    /// Returns the PID of the current process, if one is held.
    #[must_use]
    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Returns how many processes this supervisor has spawned.
    #[must_use]
    pub const fn spawn_count(&self) -> u64 {
        self.spawn_count
    }

    /// Returns how the most recent stop ended.
    #[must_use]
    pub const fn last_stop(&self) -> Option<StopOutcome> {
        self.last_stop
    }

    /// Spawns the authenticator with `config_path` as its last argument.
    ///
    /// Returns false without changing state if a process is already held
    /// (including a dead one that has not been stopped) or the spawn fails.
    pub fn start(&mut self, config_path: &Path) -> bool {
        if !self.state.can_start() {
            tracing::warn!(
                interface = %self.interface,
                state = %self.state,
                "refusing to start authenticator"
            );
            return false;
        }

        let mut command = Command::new(&self.launch.binary);
        command
            .args(&self.launch.args)
            .arg(config_path)
            .envs(&self.launch.env)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(
                    interface = %self.interface,
                    binary = %self.launch.binary.display(),
                    error = %e,
                    "failed to spawn authenticator"
                );
                return false;
            }
        };

        self.pid = child.id();
        self.child = Some(child);
        self.state = AuthenticatorState::Starting;
        self.spawn_count += 1;

        tracing::info!(
            interface = %self.interface,
            pid = ?self.pid,
            spawn = self.spawn_count,
            "authenticator spawned"
        );
        true
    }

    /// Polls the process and interface, advancing state if warranted.
    ///
    /// Non-blocking apart from the up-state query.
    pub async fn refresh(&mut self) -> AuthenticatorState {
        let Some(child) = self.child.as_mut() else {
            return self.state;
        };
        if !matches!(
            self.state,
            AuthenticatorState::Starting | AuthenticatorState::Running
        ) {
            return self.state;
        }

        match child.try_wait() {
            Ok(Some(status)) => {
                let reason = failure_reason(status);
                tracing::warn!(
                    interface = %self.interface,
                    pid = ?self.pid,
                    reason = %reason,
                    "authenticator exited unexpectedly"
                );
                self.state = AuthenticatorState::Dead(reason);
            }
            Ok(None) => {
                if self.state == AuthenticatorState::Starting
                    && interface::is_up(self.control.as_ref(), &self.interface).await
                {
                    tracing::info!(
                        interface = %self.interface,
                        pid = ?self.pid,
                        "authenticator confirmed running"
                    );
                    self.state = AuthenticatorState::Running;
                }
            }
            Err(e) => {
                tracing::warn!(
                    interface = %self.interface,
                    error = %e,
                    "failed to poll authenticator"
                );
                self.state = AuthenticatorState::Dead(FailureReason::Lost);
            }
        }

        self.state
    }

    /// Returns true if the authenticator process is alive right now.
    pub async fn is_running(&mut self) -> bool {
        self.refresh().await.is_alive()
    }

    /// Stops the authenticator and forces the interface down.
    ///
    /// Always returns true: a process that will not die is killed, and one
    /// that cannot be confirmed dead is abandoned so the session stays
    /// usable. The interface is forced down even if no process was held.
    pub async fn stop(&mut self) -> bool {
        let outcome = match self.child.take() {
            None => StopOutcome::NoProcess,
            Some(mut child) => {
                let previous = self.state;
                self.state = AuthenticatorState::Stopping;
                // Lost means the status was never collected; the process
                // may still be alive.
                let reaped = matches!(
                    previous,
                    AuthenticatorState::Dead(FailureReason::ExitCode(_) | FailureReason::Signal(_))
                );
                let outcome = if reaped {
                    StopOutcome::AlreadyExited
                } else {
                    self.terminate(&mut child).await
                };
                drop(child);
                self.state = AuthenticatorState::Stopped;
                outcome
            }
        };

        interface::force_down(self.control.as_ref(), &self.interface).await;

        tracing::info!(
            interface = %self.interface,
            pid = ?self.pid,
            outcome = ?outcome,
            "authenticator stopped"
        );

        self.pid = None;
        self.last_stop = Some(outcome);
        true
    }

    async fn terminate(&self, child: &mut Child) -> StopOutcome {
        if let Ok(Some(status)) = child.try_wait() {
            tracing::debug!(
                interface = %self.interface,
                status = %status,
                "authenticator already exited"
            );
            return StopOutcome::AlreadyExited;
        }

        self.send_term(child);

        if wait_bounded(child, self.launch.stop_timeout).await {
            return StopOutcome::Terminated;
        }

        tracing::warn!(
            interface = %self.interface,
            pid = ?self.pid,
            timeout = ?self.launch.stop_timeout,
            "authenticator ignored SIGTERM, killing"
        );
        if let Err(e) = child.start_kill() {
            tracing::debug!(interface = %self.interface, error = %e, "SIGKILL failed");
        }

        if wait_bounded(child, self.launch.kill_timeout).await {
            StopOutcome::Killed
        } else {
            tracing::error!(
                interface = %self.interface,
                pid = ?self.pid,
                "authenticator did not exit after SIGKILL, abandoning handle"
            );
            StopOutcome::Abandoned
        }
    }

    #[cfg(unix)]
    fn send_term(&self, child: &Child) {
        use nix::sys::signal::{self, Signal};
        use nix::unistd::Pid;

        let Some(pid) = child.id() else {
            return;
        };
        if let Err(e) = signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            // ESRCH: exited between try_wait and here; the wait reaps it.
            tracing::debug!(interface = %self.interface, pid, error = %e, "SIGTERM failed");
        }
    }

    #[cfg(not(unix))]
    fn send_term(&self, child: &mut Child) {
        if let Err(e) = child.start_kill() {
            tracing::debug!(interface = %self.interface, error = %e, "terminate failed");
        }
    }
}

impl std::fmt::Debug for AuthenticatorSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatorSupervisor")
            .field("interface", &self.interface)
            .field("state", &self.state)
            .field("pid", &self.pid)
            .field("spawn_count", &self.spawn_count)
            .finish_non_exhaustive()
    }
}

/// Waits for exit up to `timeout`; true if the process was reaped.
async fn wait_bounded(child: &mut Child, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => {
            tracing::debug!(status = %status, "authenticator reaped");
            true
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "failed to wait for authenticator");
            false
        }
        Err(_) => false,
    }
}

fn failure_reason(status: ExitStatus) -> FailureReason {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return FailureReason::Signal(sig);
        }
    }
    status
        .code()
        .map_or(FailureReason::Lost, FailureReason::ExitCode)
}
