// SPDX-License-Identifier: GPL-3.0-only

//! Partition-table sources
//!
//! Only the fields the engine needs are extracted from each line:
//!
//! ```text
//! <device> <mount_point> <type> <mount_flags,options> <fs_mgr_flags>
//! ```
//!
//! Known mount flags (`ro`, `noatime`, ...) are dropped; anything else in the
//! fourth column becomes the record's option string. From the fs_mgr flags
//! only `voldmanaged=<label>:<partition>` and `length=<bytes>` are kept.

use std::fs;
use std::path::Path;

use recovery_types::{FsType, VolumeRecord};
use tracing::debug;

use crate::error::{Result, SysError};

const MOUNT_FLAGS: &[&str] = &[
    "defaults",
    "ro",
    "rw",
    "nosuid",
    "nodev",
    "noexec",
    "sync",
    "dirsync",
    "noatime",
    "nodiratime",
    "relatime",
    "remount",
    "bind",
    "rec",
    "unbindable",
    "private",
    "slave",
    "shared",
];

/// Reads a volume table from a source location
pub trait TableReader: Send + Sync {
    /// Records of the table at `path`; `Err` when missing or unparseable
    fn read_table(&self, path: &Path) -> Result<Vec<VolumeRecord>>;
}

/// Reads fs_mgr-style fstab files from disk
#[derive(Debug, Default, Clone, Copy)]
pub struct FstabReader;

impl TableReader for FstabReader {
    fn read_table(&self, path: &Path) -> Result<Vec<VolumeRecord>> {
        let contents = fs::read_to_string(path).map_err(|error| {
            if error.kind() == std::io::ErrorKind::NotFound {
                SysError::DeviceNotFound(path.display().to_string())
            } else {
                SysError::Io(error)
            }
        })?;

        let records = parse_fstab(&contents).map_err(|reason| SysError::TableParse {
            source_name: path.display().to_string(),
            reason,
        })?;
        debug!("Read {} entries from {}", records.len(), path.display());
        Ok(records)
    }
}

/// Parse fstab content into volume records.
///
/// Returns the reason as a string so callers can attach the source name.
pub fn parse_fstab(input: &str) -> std::result::Result<Vec<VolumeRecord>, String> {
    let mut records = Vec::new();

    for (index, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 5 {
            return Err(format!(
                "line {}: expected 5 fields, found {}",
                index + 1,
                fields.len()
            ));
        }

        let mut record = VolumeRecord::new(
            fields[1],
            FsType::parse(fields[2]),
            Some(fields[0].to_string()),
        );
        record.fs_options = option_string(fields[3]);

        for flag in fields[4].split(',') {
            if let Some(value) = flag.strip_prefix("voldmanaged=") {
                let label = value.split(':').next().unwrap_or(value);
                record.daemon_label = Some(label.to_string());
            } else if let Some(value) = flag.strip_prefix("length=") {
                record.length = value
                    .parse()
                    .map_err(|_| format!("line {}: invalid length '{}'", index + 1, value))?;
            }
        }

        records.push(record);
    }

    Ok(records)
}

fn option_string(column: &str) -> Option<String> {
    let options: Vec<&str> = column
        .split(',')
        .filter(|option| !option.is_empty() && !MOUNT_FLAGS.contains(option))
        .collect();

    if options.is_empty() {
        None
    } else {
        Some(options.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# Android fstab file.
/dev/block/mtdblock0     /system      yaffs2  ro                         wait
/dev/block/mmcblk0p10    /data        ext4    noatime,nosuid,nodev       wait,length=-16384
/dev/block/mmcblk0p11    /cache       ext4    noatime,barrier=1,data=ordered  wait
/devices/platform/msm_sdcc.3/mmc_host  /storage/sdcard1  vfat  defaults  voldmanaged=sdcard1:auto
";

    #[test]
    fn parses_records_and_flags() {
        let records = parse_fstab(SAMPLE).unwrap();
        assert_eq!(records.len(), 4);

        assert_eq!(records[0].fs_type, FsType::Yaffs2);
        assert_eq!(records[0].fs_options, None);

        assert_eq!(records[1].mount_point, "/data");
        assert_eq!(records[1].length, -16384);

        assert_eq!(
            records[2].fs_options.as_deref(),
            Some("barrier=1,data=ordered")
        );

        assert!(records[3].is_daemon_managed());
        assert_eq!(records[3].daemon_label.as_deref(), Some("sdcard1"));
    }

    #[test]
    fn rejects_short_lines() {
        let error = parse_fstab("/dev/block/sda1 /data ext4\n").unwrap_err();
        assert!(error.contains("line 1"));
    }

    #[test]
    fn rejects_bad_length() {
        assert!(parse_fstab("/dev/a /data ext4 defaults length=big\n").is_err());
    }

    #[test]
    fn reader_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = FstabReader.read_table(&dir.path().join("missing.fstab"));
        assert!(matches!(result, Err(SysError::DeviceNotFound(_))));
    }

    #[test]
    fn reader_parses_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("primary.fstab");
        fs::write(&path, SAMPLE).unwrap();
        let records = FstabReader.read_table(&path).unwrap();
        assert_eq!(records.len(), 4);
    }
}
