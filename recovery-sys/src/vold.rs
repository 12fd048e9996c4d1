// SPDX-License-Identifier: GPL-3.0-only

//! Managed storage daemon client
//!
//! Daemon-managed volumes are mounted, unmounted and formatted by the storage
//! daemon rather than by the engine. The production client talks to it
//! through the `vdc` command-line tool and only looks at the numeric response
//! code of each reply.

use std::path::PathBuf;
use std::process::Command;

use recovery_types::{DaemonStatus, VolumeRecord};
use tracing::{debug, warn};
use which::which;

/// Response code of a `volume list` row
const VOLUME_LIST_RESULT: u16 = 110;

/// Volume states meaning "nothing inserted"
const STATE_NO_MEDIA: &[i32] = &[-1, 0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnmountFlags {
    pub force: bool,
    pub detach: bool,
}

/// Client contract of the storage daemon
pub trait VolumeDaemon: Send + Sync {
    fn mount_volume(&self, mount_point: &str, wait: bool) -> DaemonStatus;

    fn unmount_volume(&self, mount_point: &str, flags: UnmountFlags) -> DaemonStatus;

    fn format_volume(&self, mount_point: &str, wipe: bool) -> DaemonStatus;

    /// Whether the daemon reports media present for `mount_point`
    fn is_volume_available(&self, mount_point: &str) -> bool;

    fn is_managed(&self, record: &VolumeRecord) -> bool {
        record.is_daemon_managed()
    }
}

/// `vdc` based daemon client
#[derive(Debug, Clone)]
pub struct VdcClient {
    binary_path: Option<PathBuf>,
}

impl VdcClient {
    /// Locate `vdc` in PATH. A missing binary is not an error: every call
    /// then reports the daemon as unreachable.
    pub fn new() -> Self {
        let binary_path = which("vdc").ok();
        if binary_path.is_none() {
            warn!("vdc not found; daemon-managed volumes are unavailable");
        }
        Self { binary_path }
    }

    fn request(&self, args: &[&str]) -> Option<String> {
        let binary = self.binary_path.as_ref()?;
        debug!("vdc {}", args.join(" "));

        let output = Command::new(binary)
            .args(args)
            .output()
            .map_err(|error| warn!("Failed to execute vdc: {}", error))
            .ok()?;

        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn command(&self, args: &[&str]) -> DaemonStatus {
        self.request(args)
            .and_then(|reply| final_status(&reply))
            .unwrap_or(DaemonStatus::UNREACHABLE)
    }
}

impl Default for VdcClient {
    fn default() -> Self {
        Self::new()
    }
}

impl VolumeDaemon for VdcClient {
    fn mount_volume(&self, mount_point: &str, _wait: bool) -> DaemonStatus {
        // vdc blocks until the daemon replies, so every call waits.
        self.command(&["volume", "mount", mount_point])
    }

    fn unmount_volume(&self, mount_point: &str, flags: UnmountFlags) -> DaemonStatus {
        let mut args = vec!["volume", "unmount", mount_point];
        // vdc has a single "force" switch; a lazy detach is part of it.
        if flags.force || flags.detach {
            args.push("force");
        }
        self.command(&args)
    }

    fn format_volume(&self, mount_point: &str, wipe: bool) -> DaemonStatus {
        let mut args = vec!["volume", "format", mount_point];
        if wipe {
            args.push("wipe");
        }
        self.command(&args)
    }

    fn is_volume_available(&self, mount_point: &str) -> bool {
        self.request(&["volume", "list"])
            .map(|reply| volume_available_in_list(&reply, mount_point))
            .unwrap_or(false)
    }
}

/// Status code of the last numeric reply line
fn final_status(reply: &str) -> Option<DaemonStatus> {
    reply
        .lines()
        .filter_map(|line| line.split_whitespace().next()?.parse::<u16>().ok())
        .filter(|code| (200..600).contains(code))
        .last()
        .map(DaemonStatus)
}

/// `volume list` rows look like `110 <cmd> <label> <mount_point> <state>`
/// (older daemons omit the command number).
fn volume_available_in_list(reply: &str, mount_point: &str) -> bool {
    reply.lines().any(|line| {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.first().and_then(|code| code.parse::<u16>().ok()) != Some(VOLUME_LIST_RESULT) {
            return false;
        }
        let Some(position) = fields.iter().position(|field| *field == mount_point) else {
            return false;
        };
        fields
            .get(position + 1)
            .and_then(|state| state.parse::<i32>().ok())
            .is_some_and(|state| !STATE_NO_MEDIA.contains(&state))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_last_final_status() {
        let reply = "110 0 sdcard1 /storage/sdcard1 4\n200 0 Volumes listed.\n";
        assert_eq!(final_status(reply), Some(DaemonStatus::OKAY));
        assert_eq!(final_status("garbage\n"), None);
        assert_eq!(
            final_status("400 0 Command failed\n"),
            Some(DaemonStatus(400))
        );
    }

    #[test]
    fn detects_available_volumes() {
        let reply = "110 0 sdcard1 /storage/sdcard1 4\n\
                     110 0 usbdisk /storage/usbdisk 0\n\
                     200 0 Volumes listed.\n";
        assert!(volume_available_in_list(reply, "/storage/sdcard1"));
        assert!(!volume_available_in_list(reply, "/storage/usbdisk"));
        assert!(!volume_available_in_list(reply, "/storage/missing"));
    }

    #[test]
    fn managed_follows_record_label() {
        let client = VdcClient { binary_path: None };
        let mut record = VolumeRecord::new(
            "/storage/sdcard1",
            recovery_types::FsType::Vfat,
            Some("/devices/platform/mmc".into()),
        );
        assert!(!client.is_managed(&record));
        record.daemon_label = Some("sdcard1".to_string());
        assert!(client.is_managed(&record));
        assert_eq!(
            client.mount_volume("/storage/sdcard1", true),
            DaemonStatus::UNREACHABLE
        );
    }
}
