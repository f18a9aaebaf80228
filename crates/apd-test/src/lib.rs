// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # apd-test
//!
//! Testing infrastructure for apd.
//!
//! - [`FileInterfaceControl`]: interfaces as directories, so a separate
//!   process can bring one "up"
//! - [`FakeAuthenticator`]: `/bin/sh` stand-ins for hostapd with
//!   well-behaved, crashing and SIGTERM-ignoring variants
//! - [`DevModeHarness`]: a full service on a temp directory
//!
//! ## Example
//!
//! ```rust,ignore
//! use apd_core::EncryptionType;
//! use apd_test::DevModeHarness;
//!
//! let harness = DevModeHarness::builder().build()?;
//! let ap = harness.service().create_ap_interface().await.unwrap();
//! ap.write_hostapd_config("foobar", false, 6, EncryptionType::Wpa2Psk, "super secret").await;
//! ap.start_hostapd().await;
//! assert!(ap.wait_until_running(harness.readiness()).await);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod fake;
pub mod file_control;
pub mod harness;

pub use error::{Result, TestError};
pub use fake::FakeAuthenticator;
pub use file_control::FileInterfaceControl;
pub use harness::{DevModeHarness, DevModeHarnessBuilder};
