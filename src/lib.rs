//! apd: software access point daemon.
//!
//! Claims a wireless interface, writes a validated hostapd configuration
//! for it and supervises the authenticator process, keeping the interface's
//! up/down state consistent with that process.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use apd::prelude::*;
//!
//! // Re-exports from sub-crates for convenience
//! ```

pub use apd_core as core;
pub use apd_platform as platform;

/// Prelude module for common imports.
pub mod prelude {
    pub use apd_core::{
        ApInterface, ApService, ApdConfig, AuthenticatorState, ControlClient, ControlRequest,
        ControlResponse, ControlServer, EncryptionType, HostapdConfig, InterfaceControl,
        InterfaceRegistry, PollConfig, SessionId,
    };
    pub use apd_platform::{SysfsInterfaceTool, discover_ap_interfaces};
}
