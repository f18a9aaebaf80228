//! AP-capable interface discovery.
//!
//! Used when no candidate interfaces are configured. A netdev counts as
//! wireless if sysfs exposes `wireless/` or `phy80211` for it.

use std::path::Path;

use crate::error::Result;

/// Returns the wireless interfaces under `sysfs_root`, sorted by name.
///
/// # Errors
/// Returns an error if `sysfs_root` cannot be listed.
pub async fn discover_ap_interfaces(sysfs_root: &Path) -> Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(sysfs_root).await?;
    let mut found = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if is_wireless(&entry.path()).await {
            found.push(name);
        }
    }

    found.sort();
    tracing::debug!(interfaces = ?found, root = %sysfs_root.display(), "discovered wireless interfaces");
    Ok(found)
}

async fn is_wireless(dir: &Path) -> bool {
    for marker in ["wireless", "phy80211"] {
        if tokio::fs::symlink_metadata(dir.join(marker)).await.is_ok() {
            return true;
        }
    }
    false
}
