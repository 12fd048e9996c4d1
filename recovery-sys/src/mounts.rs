// SPDX-License-Identifier: GPL-3.0-only

//! Live mount table and the mount/unmount syscalls

use std::fs;

use nix::mount::{MntFlags, MsFlags, mount, umount2};
use recovery_types::MountedVolume;
use tracing::{debug, info};

use crate::error::{Result, SysError};

const PROC_MOUNTS: &str = "/proc/mounts";

/// Access to the kernel's mount table
pub trait MountPrimitives: Send + Sync {
    /// Fresh snapshot of everything currently mounted
    fn mounted_volumes(&self) -> Result<Vec<MountedVolume>>;

    /// Direct mount syscall with no option string
    fn mount(&self, device: &str, mount_point: &str, fs_type: &str, flags: MsFlags) -> Result<()>;

    /// Unmount a live entry
    fn unmount(&self, volume: &MountedVolume) -> Result<()>;
}

/// Linux implementation backed by `/proc/mounts` and `nix::mount`
#[derive(Debug, Default, Clone, Copy)]
pub struct LinuxMounts;

impl MountPrimitives for LinuxMounts {
    fn mounted_volumes(&self) -> Result<Vec<MountedVolume>> {
        let contents = fs::read_to_string(PROC_MOUNTS)?;
        Ok(parse_proc_mounts(&contents))
    }

    fn mount(&self, device: &str, mount_point: &str, fs_type: &str, flags: MsFlags) -> Result<()> {
        debug!(
            "mount({}, {}, {}, {:?})",
            device, mount_point, fs_type, flags
        );
        mount(Some(device), mount_point, Some(fs_type), flags, Some(""))
            .map_err(|errno| SysError::syscall("mount", mount_point, errno))?;
        info!("Mounted {} at {} ({})", device, mount_point, fs_type);
        Ok(())
    }

    fn unmount(&self, volume: &MountedVolume) -> Result<()> {
        umount2(volume.mount_point.as_str(), MntFlags::empty())
            .map_err(|errno| SysError::syscall("umount", &volume.mount_point, errno))?;
        info!("Unmounted {}", volume.mount_point);
        Ok(())
    }
}

/// Parse `/proc/mounts` content. Malformed lines are skipped.
pub fn parse_proc_mounts(input: &str) -> Vec<MountedVolume> {
    input
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let device = fields.next()?;
            let mount_point = fields.next()?;
            let fs_type = fields.next()?;
            let options = fields.next().unwrap_or_default();

            Some(MountedVolume {
                device: unescape_mount_field(device),
                mount_point: unescape_mount_field(mount_point),
                fs_type: fs_type.to_string(),
                options: options.to_string(),
            })
        })
        .collect()
}

/// Unescape octal sequences in mount table fields (e.g. `\040` -> ` `)
fn unescape_mount_field(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut output = Vec::with_capacity(bytes.len());
    let mut index = 0;

    while index < bytes.len() {
        if bytes[index] == b'\\'
            && index + 3 < bytes.len()
            && bytes[index + 1..=index + 3]
                .iter()
                .all(|byte| (b'0'..=b'7').contains(byte))
            && let Ok(decoded) = u8::from_str_radix(&value[index + 1..index + 4], 8)
        {
            output.push(decoded);
            index += 4;
            continue;
        }

        output.push(bytes[index]);
        index += 1;
    }

    String::from_utf8_lossy(&output).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_proc_mounts() {
        let sample = "rootfs / rootfs rw 0 0\n\
                      tmpfs /tmp tmpfs rw,relatime 0 0\n\
                      /dev/block/mmcblk0p10 /data ext4 rw,nosuid,nodev,noatime 0 0\n\
                      \n";

        let mounted = parse_proc_mounts(sample);
        assert_eq!(mounted.len(), 3);
        assert_eq!(mounted[2].device, "/dev/block/mmcblk0p10");
        assert_eq!(mounted[2].mount_point, "/data");
        assert_eq!(mounted[2].fs_type, "ext4");
        assert_eq!(mounted[2].options, "rw,nosuid,nodev,noatime");
    }

    #[test]
    fn unescapes_octal_sequences() {
        let mounted = parse_proc_mounts("/dev/sdb1 /mnt/usb\\040stick vfat rw 0 0\n");
        assert_eq!(mounted[0].mount_point, "/mnt/usb stick");
    }

    #[test]
    fn keeps_incomplete_escapes() {
        assert_eq!(unescape_mount_field("/mnt/a\\04"), "/mnt/a\\04");
        assert_eq!(unescape_mount_field("/mnt/a\\9x1"), "/mnt/a\\9x1");
    }
}
