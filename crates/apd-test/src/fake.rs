//! Fake authenticator processes.
//!
//! Each behaviour is a `/bin/sh` script. Scripts that "come up" read the
//! `interface=` line from the config file they are given (`$1`), record
//! their PID in `<root>/<iface>/pid` and touch `<root>/<iface>/up`, which a
//! [`FileInterfaceControl`](crate::FileInterfaceControl) on the same root
//! reports as the interface being up.

use std::path::Path;
use std::time::Duration;

use apd_core::AuthenticatorConfig;

/// Name of the PID file a fake authenticator writes.
pub const PID_FILE: &str = "pid";

/// How the fake authenticator behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FakeAuthenticator {
    /// Brings the interface up and runs until SIGTERM.
    #[default]
    WellBehaved,
    /// Like `WellBehaved`, after a delay.
    SlowStart(Duration),
    /// Exits immediately with the given code.
    Crashing(i32),
    /// Brings the interface up, then exits with code 1 after the delay.
    DiesAfterReady(Duration),
    /// Brings the interface up and ignores SIGTERM.
    Stubborn,
    /// Runs until SIGTERM but never brings the interface up.
    NeverReady,
}

impl FakeAuthenticator {
    /// Builds the launch configuration for this behaviour.
    ///
    /// `interfaces_root` is the root of the file-backed interface tree;
    /// `config_dir` is where sessions write their hostapd configs.
    #[must_use]
    pub fn launch_config(&self, interfaces_root: &Path, config_dir: &Path) -> AuthenticatorConfig {
        AuthenticatorConfig::new("/bin/sh", config_dir).with_args([
            "-c".to_string(),
            self.script(interfaces_root),
            "fake-hostapd".to_string(),
        ])
    }

    /// Returns the shell script for this behaviour.
    #[must_use]
    pub fn script(&self, interfaces_root: &Path) -> String {
        let root = shell_quote(&interfaces_root.display().to_string());
        match *self {
            Self::WellBehaved => format!("{}exec sleep 3600", come_up(&root, None)),
            Self::SlowStart(delay) => format!("{}exec sleep 3600", come_up(&root, Some(delay))),
            Self::Crashing(code) => format!("exit {code}"),
            Self::DiesAfterReady(delay) => {
                format!("{}sleep {}\nexit 1", come_up(&root, None), seconds(delay))
            }
            Self::Stubborn => format!(
                "trap '' TERM\n{}while :; do sleep 1; done",
                come_up(&root, None)
            ),
            Self::NeverReady => "exec sleep 3600".to_string(),
        }
    }
}

/// Script prefix: find our interface, record the PID, bring it up.
fn come_up(root: &str, delay: Option<Duration>) -> String {
    let mut script = String::from(
        "iface=$(sed -n 's/^interface=//p' \"$1\")\n[ -n \"$iface\" ] || exit 2\n",
    );
    if let Some(delay) = delay {
        script.push_str(&format!("sleep {}\n", seconds(delay)));
    }
    script.push_str(&format!(
        "echo $$ > {root}/\"$iface\"/{PID_FILE}\ntouch {root}/\"$iface\"/up\n"
    ));
    script
}

fn seconds(d: Duration) -> String {
    format!("{}.{:03}", d.as_secs(), d.subsec_millis())
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Reads the PID a fake authenticator recorded for `interface`.
#[must_use]
pub fn recorded_pid(interfaces_root: &Path, interface: &str) -> Option<i32> {
    std::fs::read_to_string(interfaces_root.join(interface).join(PID_FILE))
        .ok()?
        .trim()
        .parse()
        .ok()
}
