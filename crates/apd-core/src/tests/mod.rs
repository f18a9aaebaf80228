//! Shared test infrastructure for apd-core unit tests.
//!
//! `mocks` stands in for the kernel; `fixtures` launches short-lived
//! `/bin/sh` processes that behave like an authenticator.


pub use mocks::MockInterfaceControl;
