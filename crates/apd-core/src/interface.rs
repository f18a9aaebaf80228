//! Interface control abstraction.
//!
//! Kernel plumbing (netlink, ioctl, sysfs) lives behind this trait so the
//! registry and supervisor only ever ask three questions: does the
//! interface exist, is it up, and please set it up or down.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

/// Interface control collaborator.
///
/// State is always read through to the implementation; nothing above this
/// trait caches the up/down state.
#[async_trait]
pub trait InterfaceControl: Send + Sync + 'static {
    /// Returns true if an interface with this name exists.
    async fn exists(&self, name: &str) -> bool;

    /// Returns the kernel up state of the interface.
    ///
    /// # Errors
    /// Returns an error if the interface does not exist or cannot be read.
    async fn get_up_state(&self, name: &str) -> Result<bool>;

    /// Sets the kernel up state of the interface.
    ///
    /// # Errors
    /// Returns an error if the interface does not exist or the change fails.
    async fn set_up_state(&self, name: &str, up: bool) -> Result<()>;
}

#[async_trait]
impl<T: InterfaceControl + ?Sized> InterfaceControl for Arc<T> {
    async fn exists(&self, name: &str) -> bool {
        (**self).exists(name).await
    }

    async fn get_up_state(&self, name: &str) -> Result<bool> {
        (**self).get_up_state(name).await
    }

    async fn set_up_state(&self, name: &str, up: bool) -> Result<()> {
        (**self).set_up_state(name, up).await
    }
}

/// Reads the up state, treating any error as "down".
///
/// Used by polling loops where an unreadable interface is simply not up yet.
pub async fn is_up(control: &dyn InterfaceControl, name: &str) -> bool {
    match control.get_up_state(name).await {
        Ok(up) => up,
        Err(e) => {
            tracing::debug!(interface = %name, error = %e, "up state unreadable");
            false
        }
    }
}

/// Forces an interface down, logging instead of failing.
///
/// Returns true if the interface is down afterwards as far as we know.
pub async fn force_down(control: &dyn InterfaceControl, name: &str) -> bool {
    match control.set_up_state(name, false).await {
        Ok(()) => {
            tracing::debug!(interface = %name, "interface forced down");
            true
        }
        Err(e) => {
            tracing::warn!(interface = %name, error = %e, "failed to force interface down");
            false
        }
    }
}
