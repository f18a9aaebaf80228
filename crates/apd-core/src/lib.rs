// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # apd-core
//!
//! Core of the apd software access point daemon.
//!
//! - [`InterfaceRegistry`] hands out exclusive claims on AP-capable interfaces
//! - [`HostapdConfig`] validates and renders the authenticator configuration
//! - [`AuthenticatorSupervisor`] runs the authenticator process and keeps the
//!   interface's up/down state consistent with it
//! - [`ApInterface`] is the per-interface session tying those together
//! - [`ApService`], [`ControlServer`] and [`ControlClient`] form the control
//!   surface
//!
//! Kernel interface plumbing is behind the [`InterfaceControl`] trait; the
//! Linux implementation lives in `apd-platform`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use apd_core::{ApService, ApdConfig, EncryptionType};
//!
//! let config = ApdConfig::new("/usr/sbin/hostapd", "/run/apd").with_candidates(["wlan0"]);
//! let service = ApService::new(&config, Arc::new(interface_tool))?;
//!
//! let ap = service.create_ap_interface().await.ok_or("no interface")?;
//! ap.write_hostapd_config("foobar", false, 6, EncryptionType::Wpa2Psk, "super secret").await;
//! ap.start_hostapd().await;
//! ap.wait_until_running(config.readiness.poll()).await;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Allow significant_drop_tightening - overly aggressive for async code with locks
#![allow(clippy::significant_drop_tightening)]

pub mod config;
pub mod control;
pub mod error;
pub mod hostapd;
pub mod interface;
pub mod registry;
pub mod session;
pub mod supervisor;
#[cfg(test)]
pub mod tests;
pub mod types;
pub mod wait;

pub use config::{ApdConfig, AuthenticatorConfig, InterfacesConfig, ReadinessConfig};
pub use control::{ApService, ControlClient, ControlRequest, ControlResponse, ControlServer};
pub use error::{ApError, Result};
pub use hostapd::{Band, HostapdConfig};
pub use interface::InterfaceControl;
pub use registry::InterfaceRegistry;
pub use session::ApInterface;
pub use supervisor::{AuthenticatorSupervisor, StopOutcome};
pub use types::{AuthenticatorState, EncryptionType, FailureReason, SessionId};
pub use wait::{PollConfig, wait_for, wait_for_sync};
