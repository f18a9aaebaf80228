//! Daemon configuration types.
//!
//! Configuration is validated at load time with sensible defaults and
//! clear error messages.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ApError, Result};
use crate::wait::PollConfig;

/// Top-level daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApdConfig {
    /// How to launch the authenticator.
    pub authenticator: AuthenticatorConfig,

    /// Which interfaces may be claimed.
    #[serde(default)]
    pub interfaces: InterfacesConfig,

    /// Confirmed-running wait used by callers and the dev harness.
    #[serde(default)]
    pub readiness: ReadinessConfig,
}

impl ApdConfig {
    /// Creates a configuration with required fields and defaults elsewhere.
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>, config_dir: impl Into<PathBuf>) -> Self {
        Self {
            authenticator: AuthenticatorConfig::new(binary, config_dir),
            interfaces: InterfacesConfig::default(),
            readiness: ReadinessConfig::default(),
        }
    }

    /// Sets the candidate AP interfaces.
    #[must_use]
    pub fn with_candidates<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interfaces.candidates = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the maximum number of concurrently claimed interfaces.
    #[must_use]
    pub const fn with_max_sessions(mut self, max: usize) -> Self {
        self.interfaces.max_sessions = max;
        self
    }

    /// Sets extra arguments passed before the config file path.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authenticator = self.authenticator.with_args(args);
        self
    }

    /// Replaces the authenticator launch configuration.
    #[must_use]
    pub fn with_authenticator(mut self, authenticator: AuthenticatorConfig) -> Self {
        self.authenticator = authenticator;
        self
    }

    /// Sets the graceful stop timeout.
    #[must_use]
    pub const fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.authenticator.stop_timeout = timeout;
        self
    }

    /// Sets the readiness polling window.
    #[must_use]
    pub const fn with_readiness(mut self, timeout: Duration, interval: Duration) -> Self {
        self.readiness = ReadinessConfig { timeout, interval };
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        self.authenticator.validate()?;
        self.interfaces.validate()?;
        self.readiness.validate()?;
        Ok(())
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ApError::config(format!("failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    /// Returns an error if the text cannot be parsed or validated.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ApError::config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for ApdConfig {
    fn default() -> Self {
        Self::new("/usr/sbin/hostapd", "/run/apd")
    }
}

/// Authenticator launch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatorConfig {
    /// Path to the authenticator binary.
    pub binary: PathBuf,

    /// Arguments placed before the config file path.
    #[serde(default)]
    pub args: Vec<String>,

    /// Extra environment variables.
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Directory holding generated config files.
    pub config_dir: PathBuf,

    /// Control socket directory written into the generated config.
    #[serde(default = "default_ctrl_interface")]
    pub ctrl_interface: PathBuf,

    /// How long to wait for exit after SIGTERM.
    #[serde(default = "default_stop_timeout")]
    #[serde(with = "humantime_serde")]
    pub stop_timeout: Duration,

    /// How long to wait for exit after SIGKILL.
    #[serde(default = "default_kill_timeout")]
    #[serde(with = "humantime_serde")]
    pub kill_timeout: Duration,
}

fn default_ctrl_interface() -> PathBuf {
    PathBuf::from("/run/hostapd")
}

fn default_stop_timeout() -> Duration {
    Duration::from_secs(3)
}

fn default_kill_timeout() -> Duration {
    Duration::from_secs(1)
}

impl AuthenticatorConfig {
    /// Creates an authenticator configuration with defaults.
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>, config_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            args: vec![],
            env: HashMap::new(),
            config_dir: config_dir.into(),
            ctrl_interface: default_ctrl_interface(),
            stop_timeout: default_stop_timeout(),
            kill_timeout: default_kill_timeout(),
        }
    }

    /// Sets arguments placed before the config file path.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Adds an environment variable for the authenticator process.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Returns the config file path for an interface.
    ///
    /// One file per interface, so the file is owned by whichever session
    /// holds the claim.
    #[must_use]
    pub fn config_path(&self, interface: &str) -> PathBuf {
        self.config_dir.join(format!("hostapd-{interface}.conf"))
    }

    /// Validates the launch configuration.
    ///
    /// # Errors
    /// Returns an error if a required field is empty or a timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if self.binary.as_os_str().is_empty() {
            return Err(ApError::config("authenticator.binary cannot be empty"));
        }
        if self.config_dir.as_os_str().is_empty() {
            return Err(ApError::config("authenticator.config_dir cannot be empty"));
        }
        if self.stop_timeout.is_zero() {
            return Err(ApError::config("authenticator.stop_timeout must be positive"));
        }
        if self.kill_timeout.is_zero() {
            return Err(ApError::config("authenticator.kill_timeout must be positive"));
        }
        Ok(())
    }
}

/// Interface selection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfacesConfig {
    /// Interfaces that may be claimed, in preference order.
    ///
    /// Empty means "discover AP-capable interfaces at startup".
    #[serde(default)]
    pub candidates: Vec<String>,

    /// Maximum number of live sessions.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_max_sessions() -> usize {
    1
}

impl Default for InterfacesConfig {
    fn default() -> Self {
        Self {
            candidates: vec![],
            max_sessions: default_max_sessions(),
        }
    }
}

impl InterfacesConfig {
    /// Validates interface selection.
    ///
    /// # Errors
    /// Returns an error on empty or duplicate names, or zero capacity.
    pub fn validate(&self) -> Result<()> {
        if self.max_sessions == 0 {
            return Err(ApError::config("interfaces.max_sessions must be at least 1"));
        }
        let mut seen = HashSet::new();
        for name in &self.candidates {
            if name.is_empty() {
                return Err(ApError::config("interface names cannot be empty"));
            }
            if name.contains('/') {
                return Err(ApError::config(format!(
                    "interface name {name:?} contains '/'"
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(ApError::config(format!("duplicate interface {name}")));
            }
        }
        Ok(())
    }
}

/// Readiness polling configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReadinessConfig {
    /// Total time to wait for the authenticator to be confirmed running.
    #[serde(default = "default_readiness_timeout")]
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Time between polls.
    #[serde(default = "default_readiness_interval")]
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

fn default_readiness_timeout() -> Duration {
    Duration::from_secs(3)
}

fn default_readiness_interval() -> Duration {
    Duration::from_millis(50)
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            timeout: default_readiness_timeout(),
            interval: default_readiness_interval(),
        }
    }
}

impl ReadinessConfig {
    /// Returns the polling window as a [`PollConfig`].
    #[must_use]
    pub const fn poll(&self) -> PollConfig {
        PollConfig::new(self.timeout, self.interval)
    }

    /// Validates the polling window.
    ///
    /// # Errors
    /// Returns an error if the interval is zero.
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(ApError::config("readiness.interval must be positive"));
        }
        Ok(())
    }
}

/// Serde helper for humantime durations.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    /// Serializes a duration as a human-readable string.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    /// Deserializes a duration from a human-readable string.
    ///
    /// # Errors
    /// Returns an error if the string cannot be parsed.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new_defaults() {
        let config = ApdConfig::new("/usr/sbin/hostapd", "/run/apd");
        assert_eq!(config.authenticator.binary, PathBuf::from("/usr/sbin/hostapd"));
        assert!(config.authenticator.args.is_empty());
        assert!(config.authenticator.env.is_empty());
        assert_eq!(config.authenticator.stop_timeout, Duration::from_secs(3));
        assert_eq!(config.authenticator.kill_timeout, Duration::from_secs(1));
        assert!(config.interfaces.candidates.is_empty());
        assert_eq!(config.interfaces.max_sessions, 1);
        assert_eq!(config.readiness.timeout, Duration::from_secs(3));
        assert_eq!(config.readiness.interval, Duration::from_millis(50));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_path_per_interface() {
        let config = AuthenticatorConfig::new("/bin/true", "/run/apd");
        assert_eq!(
            config.config_path("wlan0"),
            PathBuf::from("/run/apd/hostapd-wlan0.conf")
        );
        assert_ne!(config.config_path("wlan0"), config.config_path("wlan1"));
    }

    #[test]
    fn test_validate_empty_binary() {
        let config = ApdConfig::new("", "/run/apd");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_config_dir() {
        let config = ApdConfig::new("/usr/sbin/hostapd", "");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_stop_timeout() {
        let config = ApdConfig::default().with_stop_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_max_sessions() {
        let config = ApdConfig::default().with_max_sessions(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_duplicate_candidates() {
        let config = ApdConfig::default().with_candidates(["wlan0", "wlan0"]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_validate_bad_candidate_names() {
        assert!(ApdConfig::default().with_candidates([""]).validate().is_err());
        assert!(
            ApdConfig::default()
                .with_candidates(["../etc"])
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_validate_zero_interval() {
        let config = ApdConfig::default().with_readiness(Duration::from_secs(1), Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml() {
        let text = r#"
            [authenticator]
            binary = "/opt/hostapd"
            args = ["-d"]
            config_dir = "/tmp/apd"
            stop_timeout = "500ms"

            [interfaces]
            candidates = ["wlan0", "wlan1"]
            max_sessions = 2

            [readiness]
            timeout = "5s"
            interval = "100ms"
        "#;
        let config = ApdConfig::from_toml(text).unwrap();
        assert_eq!(config.authenticator.args, vec!["-d".to_string()]);
        assert_eq!(config.authenticator.stop_timeout, Duration::from_millis(500));
        assert_eq!(config.authenticator.kill_timeout, Duration::from_secs(1));
        assert_eq!(config.interfaces.candidates.len(), 2);
        assert_eq!(config.interfaces.max_sessions, 2);
        assert_eq!(config.readiness.poll().timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_from_toml_rejects_invalid() {
        let text = r#"
            [authenticator]
            binary = "/opt/hostapd"
            config_dir = "/tmp/apd"

            [interfaces]
            max_sessions = 0
        "#;
        assert!(ApdConfig::from_toml(text).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let result = ApdConfig::load("/nonexistent/apd.toml");
        assert!(matches!(result, Err(ApError::Config(_))));
    }

    #[test]
    fn test_config_serialize_roundtrip() {
        let config = ApdConfig::default().with_candidates(["wlan0"]);
        let text = toml::to_string(&config).unwrap();
        let parsed = ApdConfig::from_toml(&text).unwrap();
        assert_eq!(parsed.interfaces.candidates, config.interfaces.candidates);
        assert_eq!(parsed.authenticator.stop_timeout, config.authenticator.stop_timeout);
    }
}
