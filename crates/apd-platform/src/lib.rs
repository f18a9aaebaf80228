// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # apd-platform
//!
//! Linux implementation of [`apd_core::InterfaceControl`]:
//!
//! - existence: `/sys/class/net/<name>` is present
//! - up state: the `IFF_UP` bit of `/sys/class/net/<name>/flags`
//! - set up/down: `ip link set dev <name> up|down`
//!
//! plus discovery of wireless interfaces for when none are configured.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use apd_platform::{SysfsInterfaceTool, discover_ap_interfaces, SYSFS_NET};
//!
//! let candidates = discover_ap_interfaces(SYSFS_NET.as_ref()).await?;
//! let control = Arc::new(SysfsInterfaceTool::new());
//! ```

#![warn(missing_docs)]

pub mod detect;
pub mod error;
pub mod sysfs;

pub use detect::discover_ap_interfaces;
pub use error::{PlatformError, Result};
pub use sysfs::{SYSFS_NET, SysfsInterfaceTool};
