// SPDX-License-Identifier: GPL-3.0-only

//! Volume records as declared by the partition table

use std::fmt;

use serde::{Deserialize, Serialize};

/// Filesystem type tag of a volume record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FsType {
    /// YAFFS2 on a raw MTD partition
    Yaffs2,

    /// Raw MTD partition without a filesystem
    Mtd,

    Ext4,
    Ext3,
    Rfs,
    Vfat,
    F2fs,

    /// Bind mount of another directory
    Bind,

    /// Filesystem image mounted through a loop device (`img`)
    LoopImage,

    /// In-memory filesystem that is always mounted
    Ramdisk,

    /// External storage backed by a directory on /data
    DataMedia,

    /// Anything else, kept verbatim
    Other(String),
}

impl FsType {
    /// Parse from the tag used in table sources
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "yaffs2" => Self::Yaffs2,
            "mtd" => Self::Mtd,
            "ext4" => Self::Ext4,
            "ext3" => Self::Ext3,
            "rfs" => Self::Rfs,
            "vfat" => Self::Vfat,
            "f2fs" => Self::F2fs,
            "bind" => Self::Bind,
            "img" => Self::LoopImage,
            "ramdisk" => Self::Ramdisk,
            "datamedia" => Self::DataMedia,
            _ => Self::Other(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Yaffs2 => "yaffs2",
            Self::Mtd => "mtd",
            Self::Ext4 => "ext4",
            Self::Ext3 => "ext3",
            Self::Rfs => "rfs",
            Self::Vfat => "vfat",
            Self::F2fs => "f2fs",
            Self::Bind => "bind",
            Self::LoopImage => "img",
            Self::Ramdisk => "ramdisk",
            Self::DataMedia => "datamedia",
            Self::Other(other) => other,
        }
    }

    /// Types that live directly on a flash partition
    pub fn is_flash(&self) -> bool {
        matches!(self, Self::Yaffs2 | Self::Mtd)
    }

    /// Types mounted from a block device, image file or directory
    pub fn is_block_family(&self) -> bool {
        matches!(
            self,
            Self::Ext4 | Self::Ext3 | Self::Rfs | Self::Vfat | Self::LoopImage | Self::Bind
        )
    }
}

impl fmt::Display for FsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for FsType {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&str> for FsType {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<FsType> for String {
    fn from(value: FsType) -> Self {
        value.as_str().to_string()
    }
}

/// One logical storage unit of the volume table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeRecord {
    /// Absolute mount point, unique within a table
    pub mount_point: String,

    pub fs_type: FsType,

    /// Primary backing device (absent for ramdisk and some daemon volumes)
    pub block_device: Option<String>,

    /// Mount option string for the primary device
    pub fs_options: Option<String>,

    /// Secondary device merged from the auxiliary table
    pub alt_block_device: Option<String>,

    pub alt_fs_type: Option<FsType>,

    pub alt_fs_options: Option<String>,

    /// Declared size in bytes; see [`effective_length`]
    pub length: i64,

    /// Label from the `voldmanaged=` flag; present for daemon-managed volumes
    pub daemon_label: Option<String>,
}

impl VolumeRecord {
    pub fn new(
        mount_point: impl Into<String>,
        fs_type: FsType,
        block_device: Option<String>,
    ) -> Self {
        Self {
            mount_point: mount_point.into(),
            fs_type,
            block_device,
            fs_options: None,
            alt_block_device: None,
            alt_fs_type: None,
            alt_fs_options: None,
            length: 0,
            daemon_label: None,
        }
    }

    /// Synthetic ramdisk record, as appended for `/tmp`
    pub fn ramdisk(mount_point: impl Into<String>) -> Self {
        Self::new(mount_point, FsType::Ramdisk, Some("ramdisk".to_string()))
    }

    pub fn is_ramdisk(&self) -> bool {
        self.fs_type == FsType::Ramdisk
    }

    pub fn is_daemon_managed(&self) -> bool {
        self.daemon_label.is_some()
    }

    /// Copy the device/type/options of an auxiliary record into the alt fields.
    ///
    /// Options are only copied when the auxiliary record declares them.
    pub fn merge_alternate(&mut self, extra: &VolumeRecord) {
        self.alt_block_device = extra.block_device.clone();
        self.alt_fs_type = Some(extra.fs_type.clone());
        if let Some(options) = &extra.fs_options {
            self.alt_fs_options = Some(options.clone());
        }
    }
}

/// Number of bytes a filesystem should span on a device of `device_size` bytes.
///
/// A declared length of zero fills the whole device. A negative length
/// reserves that many bytes at the end of the device. Positive lengths are
/// used as given.
pub fn effective_length(declared: i64, device_size: u64) -> u64 {
    match declared {
        0 => device_size,
        reserve if reserve < 0 => device_size.saturating_sub(reserve.unsigned_abs()),
        length => length as u64,
    }
}
