//! Device identity resolution.
//!
//! The device identifier keys the remote device record and addresses
//! commands, so it should survive reboots. The board serial from
//! `/proc/cpuinfo` gives that stability; when it cannot be read (not a
//! board, stripped kernel, permissions) the agent degrades to a
//! session-scoped random identifier whose prefix marks it as non-stable.
//! One best-effort read, no retries, never fatal.

use rand::Rng;
use rollcall_core::constants::{UNSTABLE_ID_PREFIX, UNSTABLE_ID_SUFFIX_LEN};
use std::path::Path;
use tracing::debug;

/// Length of the serial value as the hardware reports it.
const SERIAL_LENGTH: usize = 16;

/// Resolve the device identifier. Called once at startup.
pub fn resolve_device_id(cpuinfo: &Path) -> String {
    match serial_from_cpuinfo(cpuinfo) {
        Ok(Some(serial)) => serial,
        Ok(None) => {
            debug!(path = %cpuinfo.display(), "no serial line in cpuinfo");
            fallback_device_id()
        }
        Err(error) => {
            debug!(path = %cpuinfo.display(), %error, "cpuinfo unreadable");
            fallback_device_id()
        }
    }
}

/// Extract the board serial from a cpuinfo-format file.
///
/// The kernel reports it as a `Serial` line padded to 16 hex characters;
/// only the last 16 characters of the value are kept.
fn serial_from_cpuinfo(path: &Path) -> std::io::Result<Option<String>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(contents.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        if key.trim() != "Serial" {
            return None;
        }
        let value = value.trim();
        if value.is_empty() || !value.is_ascii() {
            return None;
        }
        let start = value.len().saturating_sub(SERIAL_LENGTH);
        Some(value[start..].to_ascii_lowercase())
    }))
}

/// Random identifier marked as non-stable by its prefix.
fn fallback_device_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (&mut rng)
        .sample_iter(rand::distributions::Alphanumeric)
        .take(UNSTABLE_ID_SUFFIX_LEN)
        .map(|b| (b as char).to_ascii_uppercase())
        .collect();
    format!("{UNSTABLE_ID_PREFIX}{suffix}")
}
