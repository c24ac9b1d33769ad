//! Device fingerprints for license binding.
//!
//! Verification only compares fingerprints as opaque strings. Where they come
//! from is a [`FingerprintSource`]; [`HostFingerprint`] derives a stable one
//! from this machine's identifiers.

use std::env;

use sha2::{Digest, Sha256};

/// Supplies the fingerprint of the machine a license is checked on.
pub trait FingerprintSource: Send + Sync {
    /// Returns the current device fingerprint.
    fn current_fingerprint(&self) -> String;
}

impl<F> FingerprintSource for F
where
    F: Fn() -> String + Send + Sync,
{
    fn current_fingerprint(&self) -> String {
        self()
    }
}

/// A fixed fingerprint, for callers that obtain it elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticFingerprint(pub String);

impl StaticFingerprint {
    /// Wraps a fingerprint string.
    #[must_use]
    pub fn new(fingerprint: impl Into<String>) -> Self {
        Self(fingerprint.into())
    }
}

impl FingerprintSource for StaticFingerprint {
    fn current_fingerprint(&self) -> String {
        self.0.clone()
    }
}

/// Fingerprint of the current host: lower-case hex SHA-256 over OS,
/// architecture, hostname, machine id and user name.
///
/// Survives reboots; changes if the machine id or hostname changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostFingerprint;

impl HostFingerprint {
    /// Computes the fingerprint for this host.
    #[must_use]
    pub fn generate() -> String {
        let combined = collect_hardware_ids().join("|");
        hex::encode(Sha256::digest(combined.as_bytes()))
    }
}

impl FingerprintSource for HostFingerprint {
    fn current_fingerprint(&self) -> String {
        Self::generate()
    }
}

/// Collects host identifiers for fingerprinting.
fn collect_hardware_ids() -> Vec<String> {
    let mut ids = vec![
        env::consts::OS.to_string(),
        env::consts::ARCH.to_string(),
        get_hostname(),
    ];

    if let Some(machine_id) = get_machine_id() {
        ids.push(machine_id);
    }

    if let Ok(user) = env::var("USER").or_else(|_| env::var("USERNAME")) {
        ids.push(user);
    }

    ids
}

fn get_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Platform-specific stable machine identifier.
fn get_machine_id() -> Option<String> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("ioreg")
            .args(["-rd1", "-c", "IOPlatformExpertDevice"])
            .output()
            .ok()
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .and_then(|output| {
                output
                    .lines()
                    .find(|l| l.contains("IOPlatformUUID"))
                    .and_then(|l| l.split('"').nth(3))
                    .map(String::from)
            })
    }

    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/etc/machine-id")
            .or_else(|_| std::fs::read_to_string("/var/lib/dbus/machine-id"))
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("reg")
            .args([
                "query",
                r"HKLM\SOFTWARE\Microsoft\Cryptography",
                "/v",
                "MachineGuid",
            ])
            .output()
            .ok()
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .and_then(|output| {
                output
                    .lines()
                    .find(|l| l.contains("MachineGuid"))
                    .and_then(|l| l.split_whitespace().last())
                    .map(String::from)
            })
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
    {
        None
    }
}
