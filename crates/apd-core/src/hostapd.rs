//! hostapd configuration generation and validation.
//!
//! A [`HostapdConfig`] can only be built through [`HostapdConfig::new`], so
//! holding one means it passed validation. Rendering produces the text
//! file the authenticator reads at spawn time; [`write_durable`] puts it on
//! disk so that a spawn immediately afterwards sees the complete file.

use std::fmt::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ApError, Result};
use crate::types::EncryptionType;

/// Maximum SSID length in bytes (IEEE 802.11).
pub const MAX_SSID_LEN: usize = 32;

/// Minimum WPA2 passphrase length in bytes.
pub const MIN_PASSPHRASE_LEN: usize = 8;

/// Maximum WPA2 passphrase length in bytes.
pub const MAX_PASSPHRASE_LEN: usize = 63;

/// Radio band a channel belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Band {
    /// 2.4 GHz, channels 1-14.
    Band2GHz,
    /// 5 GHz, channels 36-165.
    Band5GHz,
}

impl Band {
    /// Maps a channel number to its band.
    #[must_use]
    pub const fn for_channel(channel: u32) -> Option<Self> {
        match channel {
            1..=14 => Some(Self::Band2GHz),
            36..=165 => Some(Self::Band5GHz),
            _ => None,
        }
    }

    /// Returns the hostapd `hw_mode` value for this band.
    #[must_use]
    pub const fn hw_mode(&self) -> &'static str {
        match self {
            Self::Band2GHz => "g",
            Self::Band5GHz => "a",
        }
    }
}

/// A validated access point configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostapdConfig {
    ssid: Vec<u8>,
    hidden: bool,
    channel: u32,
    band: Band,
    encryption: EncryptionType,
    passphrase: Vec<u8>,
}

impl HostapdConfig {
    /// Validates the parameters and builds a config.
    ///
    /// Checks run in order: SSID length, passphrase (WPA2 only), channel.
    /// For an open network the passphrase is ignored and stored empty.
    ///
    /// # Errors
    /// Returns [`ApError::InvalidSsid`], [`ApError::InvalidPassphrase`] or
    /// [`ApError::InvalidChannel`] for the first rule that fails.
    pub fn new(
        ssid: impl Into<Vec<u8>>,
        hidden: bool,
        channel: u32,
        encryption: EncryptionType,
        passphrase: impl Into<Vec<u8>>,
    ) -> Result<Self> {
        let ssid = ssid.into();
        if ssid.is_empty() || ssid.len() > MAX_SSID_LEN {
            return Err(ApError::InvalidSsid(format!(
                "length {} outside 1..={MAX_SSID_LEN}",
                ssid.len()
            )));
        }

        let passphrase = if encryption.requires_passphrase() {
            let passphrase = passphrase.into();
            validate_passphrase(&passphrase)?;
            passphrase
        } else {
            Vec::new()
        };

        let band = Band::for_channel(channel).ok_or(ApError::InvalidChannel(channel))?;

        Ok(Self {
            ssid,
            hidden,
            channel,
            band,
            encryption,
            passphrase,
        })
    }

    /// Returns the SSID bytes.
    #[must_use]
    pub fn ssid(&self) -> &[u8] {
        &self.ssid
    }

    /// Returns true if the SSID is not broadcast.
    #[must_use]
    pub const fn hidden(&self) -> bool {
        self.hidden
    }

    /// Returns the channel number.
    #[must_use]
    pub const fn channel(&self) -> u32 {
        self.channel
    }

    /// Returns the band the channel belongs to.
    #[must_use]
    pub const fn band(&self) -> Band {
        self.band
    }

    /// Returns the encryption type.
    #[must_use]
    pub const fn encryption(&self) -> EncryptionType {
        self.encryption
    }

    /// Returns the passphrase bytes (empty for open networks).
    #[must_use]
    pub fn passphrase(&self) -> &[u8] {
        &self.passphrase
    }

    /// Renders the hostapd config file for `interface`.
    #[must_use]
    pub fn render(&self, interface: &str, ctrl_interface: &Path) -> String {
        let mut out = String::new();

        // writeln! into a String cannot fail.
        let _ = writeln!(out, "interface={interface}");
        out.push_str("driver=nl80211\n");
        let _ = writeln!(out, "ctrl_interface={}", ctrl_interface.display());
        // ssid2 takes hex, which keeps arbitrary SSID bytes out of the
        // line-oriented parser.
        let _ = writeln!(out, "ssid2={}", hex::encode(&self.ssid));
        let _ = writeln!(out, "channel={}", self.channel);
        out.push_str("ieee80211n=1\n");
        let _ = writeln!(out, "hw_mode={}", self.band.hw_mode());
        let _ = writeln!(out, "ignore_broadcast_ssid={}", u8::from(self.hidden));
        out.push_str("wowlan_triggers=any\n");

        match self.encryption {
            EncryptionType::Open => {}
            EncryptionType::Wpa2Psk => {
                out.push_str("wpa=2\n");
                out.push_str("rsn_pairwise=CCMP\n");
                // Printable ASCII was enforced in validate_passphrase.
                let _ = writeln!(
                    out,
                    "wpa_passphrase={}",
                    String::from_utf8_lossy(&self.passphrase)
                );
            }
        }

        out
    }
}

fn validate_passphrase(passphrase: &[u8]) -> Result<()> {
    let len = passphrase.len();
    if !(MIN_PASSPHRASE_LEN..=MAX_PASSPHRASE_LEN).contains(&len) {
        return Err(ApError::InvalidPassphrase(format!(
            "length {len} outside {MIN_PASSPHRASE_LEN}..={MAX_PASSPHRASE_LEN}"
        )));
    }
    if let Some(pos) = passphrase.iter().position(|b| !(0x20..=0x7e).contains(b)) {
        return Err(ApError::InvalidPassphrase(format!(
            "non-printable byte at offset {pos}"
        )));
    }
    Ok(())
}

/// Writes `contents` to `path` so it is complete on disk before returning.
///
/// Writes a sibling temp file (mode 0600, the passphrase is in it), syncs
/// it, renames it over `path` and syncs the directory. If anything fails
/// the previous file at `path` is left as it was.
///
/// # Errors
/// Returns an I/O error if any step fails.
pub async fn write_durable(path: &Path, contents: &str) -> Result<()> {
    use tokio::io::AsyncWriteExt;

    let dir = path
        .parent()
        .ok_or_else(|| ApError::config(format!("{} has no parent directory", path.display())))?;
    let file_name = path
        .file_name()
        .ok_or_else(|| ApError::config(format!("{} has no file name", path.display())))?;
    let tmp = dir.join(format!(".{}.tmp", file_name.to_string_lossy()));

    tokio::fs::create_dir_all(dir).await?;

    let result = async {
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&tmp).await?;
        file.write_all(contents.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok::<(), std::io::Error>(())
    }
    .await;

    if let Err(e) = result {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }

    // Persist the rename itself.
    #[cfg(unix)]
    tokio::fs::File::open(dir).await?.sync_all().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const PASSPHRASE: &[u8] = b"super secret";

    #[test]
    fn test_valid_wpa2_config() {
        let config =
            HostapdConfig::new(b"foobar".to_vec(), false, 6, EncryptionType::Wpa2Psk, PASSPHRASE)
                .unwrap();
        assert_eq!(config.ssid(), b"foobar");
        assert!(!config.hidden());
        assert_eq!(config.channel(), 6);
        assert_eq!(config.band(), Band::Band2GHz);
        assert_eq!(config.encryption(), EncryptionType::Wpa2Psk);
        assert_eq!(config.passphrase(), PASSPHRASE);
    }

    #[test]
    fn test_ssid_33_bytes_rejected() {
        let ssid = b"012345678901234567890123456789012".to_vec();
        assert_eq!(ssid.len(), 33);
        let err = HostapdConfig::new(ssid, false, 2, EncryptionType::Wpa2Psk, PASSPHRASE)
            .unwrap_err();
        assert!(matches!(err, ApError::InvalidSsid(_)));
    }

    #[test]
    fn test_ssid_32_bytes_accepted() {
        let ssid = vec![b'a'; 32];
        assert!(HostapdConfig::new(ssid, false, 2, EncryptionType::Open, Vec::new()).is_ok());
    }

    #[test]
    fn test_empty_ssid_rejected() {
        let err =
            HostapdConfig::new(Vec::new(), false, 6, EncryptionType::Open, Vec::new()).unwrap_err();
        assert!(matches!(err, ApError::InvalidSsid(_)));
    }

    #[test]
    fn test_ssid_checked_before_passphrase_and_channel() {
        let err = HostapdConfig::new(vec![b'x'; 40], false, 0, EncryptionType::Wpa2Psk, b"short")
            .unwrap_err();
        assert!(matches!(err, ApError::InvalidSsid(_)));
    }

    #[test]
    fn test_passphrase_checked_before_channel() {
        let err =
            HostapdConfig::new(b"ap".to_vec(), false, 0, EncryptionType::Wpa2Psk, b"short")
                .unwrap_err();
        assert!(matches!(err, ApError::InvalidPassphrase(_)));
    }

    #[test]
    fn test_passphrase_bounds() {
        let new = |p: Vec<u8>| HostapdConfig::new(b"ap".to_vec(), false, 6, EncryptionType::Wpa2Psk, p);
        assert!(new(vec![b'p'; 7]).is_err());
        assert!(new(vec![b'p'; 8]).is_ok());
        assert!(new(vec![b'p'; 63]).is_ok());
        assert!(new(vec![b'p'; 64]).is_err());
    }

    #[test]
    fn test_passphrase_non_printable_rejected() {
        let err = HostapdConfig::new(
            b"ap".to_vec(),
            false,
            6,
            EncryptionType::Wpa2Psk,
            b"secret\npass".to_vec(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("offset 6"));
    }

    #[test]
    fn test_open_ignores_passphrase() {
        let config =
            HostapdConfig::new(b"ap".to_vec(), false, 6, EncryptionType::Open, b"x".to_vec())
                .unwrap();
        assert!(config.passphrase().is_empty());
    }

    #[test]
    fn test_channel_bands() {
        assert_eq!(Band::for_channel(1), Some(Band::Band2GHz));
        assert_eq!(Band::for_channel(14), Some(Band::Band2GHz));
        assert_eq!(Band::for_channel(15), None);
        assert_eq!(Band::for_channel(35), None);
        assert_eq!(Band::for_channel(36), Some(Band::Band5GHz));
        assert_eq!(Band::for_channel(165), Some(Band::Band5GHz));
        assert_eq!(Band::for_channel(166), None);
        assert_eq!(Band::for_channel(0), None);
    }

    #[test]
    fn test_invalid_channel_rejected() {
        let err =
            HostapdConfig::new(b"ap".to_vec(), false, 20, EncryptionType::Open, Vec::new())
                .unwrap_err();
        assert!(matches!(err, ApError::InvalidChannel(20)));
    }

    #[test]
    fn test_render_wpa2() {
        let config =
            HostapdConfig::new(b"foobar".to_vec(), false, 6, EncryptionType::Wpa2Psk, PASSPHRASE)
                .unwrap();
        let text = config.render("wlan0", Path::new("/run/hostapd"));
        assert_eq!(
            text,
            "interface=wlan0\n\
             driver=nl80211\n\
             ctrl_interface=/run/hostapd\n\
             ssid2=666f6f626172\n\
             channel=6\n\
             ieee80211n=1\n\
             hw_mode=g\n\
             ignore_broadcast_ssid=0\n\
             wowlan_triggers=any\n\
             wpa=2\n\
             rsn_pairwise=CCMP\n\
             wpa_passphrase=super secret\n"
        );
    }

    #[test]
    fn test_render_open_hidden_5ghz() {
        let config =
            HostapdConfig::new(vec![0x00, 0xff], true, 36, EncryptionType::Open, Vec::new())
                .unwrap();
        let text = config.render("wlan1", Path::new("/run/hostapd"));
        assert!(text.contains("ssid2=00ff\n"));
        assert!(text.contains("hw_mode=a\n"));
        assert!(text.contains("ignore_broadcast_ssid=1\n"));
        assert!(!text.contains("wpa"));
    }

    #[tokio::test]
    async fn test_write_durable_creates_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("hostapd-wlan0.conf");

        write_durable(&path, "first\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\n");

        write_durable(&path, "second\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second\n");

        // No temp file left behind.
        let entries: Vec<_> = std::fs::read_dir(path.parent().unwrap()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_write_durable_mode_0600() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hostapd-wlan0.conf");
        write_durable(&path, "wpa_passphrase=x\n").await.unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    proptest! {
        #[test]
        fn prop_long_ssid_always_rejected(
            ssid in proptest::collection::vec(any::<u8>(), 33..128),
            hidden in any::<bool>(),
            channel in 0u32..200,
        ) {
            let result = HostapdConfig::new(ssid, hidden, channel, EncryptionType::Wpa2Psk, PASSPHRASE);
            prop_assert!(matches!(result, Err(ApError::InvalidSsid(_))));
        }

        #[test]
        fn prop_valid_ssid_and_passphrase_accepted(
            ssid in proptest::collection::vec(any::<u8>(), 1..=32),
            passphrase in proptest::collection::vec(0x20u8..=0x7e, 8..=63),
            hidden in any::<bool>(),
            channel in prop_oneof![1u32..=14, 36u32..=165],
        ) {
            let config = HostapdConfig::new(
                ssid.clone(), hidden, channel, EncryptionType::Wpa2Psk, passphrase.clone(),
            ).unwrap();
            prop_assert_eq!(config.ssid(), ssid.as_slice());
            prop_assert_eq!(config.passphrase(), passphrase.as_slice());
            prop_assert_eq!(config.channel(), channel);
            prop_assert_eq!(config.hidden(), hidden);
        }

        #[test]
        fn prop_render_has_one_line_per_key(
            ssid in proptest::collection::vec(any::<u8>(), 1..=32),
        ) {
            let config = HostapdConfig::new(ssid, false, 6, EncryptionType::Open, Vec::new()).unwrap();
            let text = config.render("wlan0", Path::new("/run/hostapd"));
            prop_assert_eq!(text.lines().count(), 9);
        }
    }
}
