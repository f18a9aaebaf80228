//! File-backed interface control.
//!
//! Each interface is a directory under a root; it is up while an `up`
//! file exists inside it. A fake authenticator running as a separate
//! process can bring "its" interface up with nothing more than `touch`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use apd_core::{ApError, InterfaceControl};

/// Name of the marker file meaning "interface is up".
pub const UP_MARKER: &str = "up";

/// Interface control backed by a directory tree.
#[derive(Debug)]
pub struct FileInterfaceControl {
    root: PathBuf,
    /// Every successful `set_up_state`, in order.
    history: parking_lot::Mutex<Vec<(String, bool)>>,
}

impl FileInterfaceControl {
    /// Creates a control rooted at `root`. The directory must exist.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            history: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates an interface in the down state.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn add_interface(&self, name: &str) -> std::io::Result<()> {
        std::fs::create_dir_all(self.root.join(name))
    }

    /// Removes an interface, as if the device disappeared.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be removed.
    pub fn remove_interface(&self, name: &str) -> std::io::Result<()> {
        std::fs::remove_dir_all(self.root.join(name))
    }

    /// Returns the path of an interface's up marker.
    #[must_use]
    pub fn up_marker(&self, name: &str) -> PathBuf {
        self.root.join(name).join(UP_MARKER)
    }

    /// Reads the up state synchronously; false for unknown interfaces.
    #[must_use]
    pub fn peek(&self, name: &str) -> bool {
        self.up_marker(name).exists()
    }

    /// Returns the successful `set_up_state` calls, in order.
    #[must_use]
    pub fn history(&self) -> Vec<(String, bool)> {
        self.history.lock().clone()
    }

    fn interface_dir(&self, name: &str) -> apd_core::Result<PathBuf> {
        if name.is_empty() || name.contains('/') {
            return Err(ApError::interface(name, "invalid interface name"));
        }
        let dir = self.root.join(name);
        if !dir.is_dir() {
            return Err(ApError::interface(name, "no such interface"));
        }
        Ok(dir)
    }
}

#[async_trait]
impl InterfaceControl for FileInterfaceControl {
    async fn exists(&self, name: &str) -> bool {
        self.interface_dir(name).is_ok()
    }

    async fn get_up_state(&self, name: &str) -> apd_core::Result<bool> {
        let dir = self.interface_dir(name)?;
        Ok(tokio::fs::try_exists(dir.join(UP_MARKER)).await?)
    }

    async fn set_up_state(&self, name: &str, up: bool) -> apd_core::Result<()> {
        let marker = self.interface_dir(name)?.join(UP_MARKER);
        if up {
            tokio::fs::write(&marker, b"").await?;
        } else {
            match tokio::fs::remove_file(&marker).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        self.history.lock().push((name.to_string(), up));
        Ok(())
    }
}
