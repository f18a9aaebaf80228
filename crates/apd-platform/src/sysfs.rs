//! Linux interface control via sysfs and `ip link`.
//!
//! Reads come straight from `/sys/class/net/<name>`; writes go through the
//! `ip` tool so no netlink code lives in the daemon.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use apd_core::InterfaceControl;

use crate::error::{PlatformError, Result};

/// Default sysfs network class directory.
pub const SYSFS_NET: &str = "/sys/class/net";

#[cfg(unix)]
const IFF_UP: u32 = libc::IFF_UP as u32;
#[cfg(not(unix))]
const IFF_UP: u32 = 0x1;

/// Interface control backed by sysfs and `ip link`.
#[derive(Debug, Clone)]
pub struct SysfsInterfaceTool {
    sysfs_root: PathBuf,
    ip_binary: PathBuf,
}

impl Default for SysfsInterfaceTool {
    fn default() -> Self {
        Self::new()
    }
}

impl SysfsInterfaceTool {
    /// Creates a tool reading `/sys/class/net` and running `ip` from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sysfs_root: PathBuf::from(SYSFS_NET),
            ip_binary: PathBuf::from("ip"),
        }
    }

    /// Reads interfaces from a different directory.
    #[must_use]
    pub fn with_sysfs_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.sysfs_root = root.into();
        self
    }

    /// Uses a different `ip` binary.
    #[must_use]
    pub fn with_ip_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.ip_binary = binary.into();
        self
    }

    /// Returns the sysfs directory in use.
    #[must_use]
    pub fn sysfs_root(&self) -> &Path {
        &self.sysfs_root
    }

    fn interface_dir(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name == "." || name == ".." || name.contains('/') {
            return Err(PlatformError::InvalidName(name.to_string()));
        }
        Ok(self.sysfs_root.join(name))
    }

    async fn read_flags(&self, name: &str) -> Result<u32> {
        let path = self.interface_dir(name)?.join("flags");
        let raw = tokio::fs::read_to_string(&path).await?;
        parse_flags(&raw)
    }

    async fn ip_link_set(&self, name: &str, up: bool) -> Result<()> {
        self.interface_dir(name)?;
        let state = if up { "up" } else { "down" };
        let command_line = format!("{} link set dev {name} {state}", self.ip_binary.display());

        let output = Command::new(&self.ip_binary)
            .args(["link", "set", "dev", name, state])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| PlatformError::command(&command_line, e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PlatformError::command(
                command_line,
                format!("{}: {}", output.status, stderr.trim()),
            ));
        }

        tracing::debug!(interface = %name, state, "ip link set");
        Ok(())
    }
}

/// Parses a sysfs `flags` value such as `0x1003`.
fn parse_flags(raw: &str) -> Result<u32> {
    let trimmed = raw.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    u32::from_str_radix(hex, 16).map_err(|_| PlatformError::Parse {
        attribute: "flags",
        value: trimmed.to_string(),
    })
}

#[async_trait]
impl InterfaceControl for SysfsInterfaceTool {
    async fn exists(&self, name: &str) -> bool {
        match self.interface_dir(name) {
            Ok(dir) => tokio::fs::metadata(dir).await.is_ok(),
            Err(_) => false,
        }
    }

    async fn get_up_state(&self, name: &str) -> apd_core::Result<bool> {
        let flags = self
            .read_flags(name)
            .await
            .map_err(|e| e.for_interface(name))?;
        Ok(flags & IFF_UP != 0)
    }

    async fn set_up_state(&self, name: &str, up: bool) -> apd_core::Result<()> {
        self.ip_link_set(name, up)
            .await
            .map_err(|e| e.for_interface(name))
    }
}
