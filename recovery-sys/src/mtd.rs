// SPDX-License-Identifier: GPL-3.0-only

//! Raw flash (MTD) partitions
//!
//! Partitions are enumerated from `/proc/mtd`, mounted through their
//! `mtdblock` device and erased block by block with the MTD ioctls.

use std::fs::{self, File, OpenOptions};
use std::os::fd::AsRawFd;
use std::sync::Mutex;

use nix::mount::{MsFlags, mount};
use recovery_types::FlashPartition;
use tracing::{debug, info, warn};

use crate::error::{Result, SysError};

const PROC_MTD: &str = "/proc/mtd";

mod ioctl {
    /// `struct mtd_info_user`
    #[repr(C)]
    #[derive(Debug, Default)]
    #[allow(dead_code)]
    pub struct MtdInfoUser {
        pub kind: u8,
        pub flags: u32,
        pub size: u32,
        pub erase_size: u32,
        pub write_size: u32,
        pub oob_size: u32,
        pub padding: u64,
    }

    /// `struct erase_info_user`
    #[repr(C)]
    #[derive(Debug)]
    pub struct EraseInfoUser {
        pub start: u32,
        pub length: u32,
    }

    nix::ioctl_read!(mem_get_info, b'M', 1, MtdInfoUser);
    nix::ioctl_write_ptr!(mem_erase, b'M', 2, EraseInfoUser);
    nix::ioctl_write_ptr!(mem_get_bad_block, b'M', 11, i64);
}

use ioctl::{EraseInfoUser, MtdInfoUser, mem_erase, mem_get_bad_block, mem_get_info};

/// An open partition ready for erasing
#[derive(Debug)]
pub struct FlashWriteHandle {
    pub partition: FlashPartition,
    file: Option<File>,
}

impl FlashWriteHandle {
    /// Handle with no device behind it, for substitute implementations
    pub fn detached(partition: FlashPartition) -> Self {
        Self {
            partition,
            file: None,
        }
    }
}

/// Flash partition library contract
pub trait FlashPartitions: Send + Sync {
    /// Refresh the partition list
    fn scan_partitions(&self) -> Result<usize>;

    fn find_partition_by_name(&self, name: &str) -> Option<FlashPartition>;

    fn mount_partition(
        &self,
        partition: &FlashPartition,
        mount_point: &str,
        fs_type: &str,
        read_only: bool,
    ) -> Result<()>;

    fn open_for_write(&self, partition: &FlashPartition) -> Result<FlashWriteHandle>;

    /// Erase every good block; returns the number of blocks erased
    fn erase_all(&self, handle: &mut FlashWriteHandle) -> Result<u32>;

    fn close(&self, handle: FlashWriteHandle) -> Result<()>;
}

/// `/proc/mtd` backed implementation
#[derive(Debug, Default)]
pub struct ProcMtd {
    partitions: Mutex<Vec<FlashPartition>>,
}

impl ProcMtd {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FlashPartitions for ProcMtd {
    fn scan_partitions(&self) -> Result<usize> {
        let contents = fs::read_to_string(PROC_MTD)?;
        let scanned = parse_proc_mtd(&contents);
        let count = scanned.len();
        debug!("Found {} MTD partitions", count);

        let mut partitions = self
            .partitions
            .lock()
            .map_err(|_| SysError::OperationFailed("MTD partition cache poisoned".to_string()))?;
        *partitions = scanned;
        Ok(count)
    }

    fn find_partition_by_name(&self, name: &str) -> Option<FlashPartition> {
        let partitions = self.partitions.lock().ok()?;
        partitions
            .iter()
            .find(|partition| partition.name == name)
            .cloned()
    }

    fn mount_partition(
        &self,
        partition: &FlashPartition,
        mount_point: &str,
        fs_type: &str,
        read_only: bool,
    ) -> Result<()> {
        let mut flags = MsFlags::MS_NOATIME | MsFlags::MS_NODEV | MsFlags::MS_NODIRATIME;
        if read_only {
            flags |= MsFlags::MS_RDONLY;
        }

        let device = partition.block_device();
        mount(
            Some(device.as_str()),
            mount_point,
            Some(fs_type),
            flags,
            None::<&str>,
        )
        .map_err(|errno| SysError::syscall("mount", mount_point, errno))?;

        info!("Mounted MTD {} at {}", partition.name, mount_point);
        Ok(())
    }

    fn open_for_write(&self, partition: &FlashPartition) -> Result<FlashWriteHandle> {
        let device = partition.char_device();
        let file = OpenOptions::new()
            .write(true)
            .open(&device)
            .map_err(|error| match error.kind() {
                std::io::ErrorKind::NotFound => SysError::DeviceNotFound(device.clone()),
                std::io::ErrorKind::PermissionDenied => {
                    SysError::PermissionDenied(format!("Cannot open {} for writing", device))
                }
                _ => SysError::Io(error),
            })?;

        Ok(FlashWriteHandle {
            partition: partition.clone(),
            file: Some(file),
        })
    }

    fn erase_all(&self, handle: &mut FlashWriteHandle) -> Result<u32> {
        let device = handle.partition.char_device();
        let file = handle
            .file
            .as_ref()
            .ok_or_else(|| SysError::OperationFailed(format!("{} is not open", device)))?;
        let fd = file.as_raw_fd();

        let mut mtd_info = MtdInfoUser::default();
        // SAFETY: fd is an open MTD character device and mtd_info matches the
        // kernel's mtd_info_user layout.
        unsafe { mem_get_info(fd, &mut mtd_info) }
            .map_err(|errno| SysError::syscall("MEMGETINFO", &device, errno))?;

        if mtd_info.erase_size == 0 {
            return Err(SysError::OperationFailed(format!(
                "{} reports a zero erase size",
                device
            )));
        }

        let total_blocks = mtd_info.size / mtd_info.erase_size;
        let mut erased = 0;

        for block in 0..total_blocks {
            let start = block * mtd_info.erase_size;

            let offset = i64::from(start);
            // SAFETY: MEMGETBADBLOCK reads one loff_t from the pointer.
            if let Ok(bad) = unsafe { mem_get_bad_block(fd, &offset) }
                && bad > 0
            {
                warn!("Skipping bad block at 0x{:08x} on {}", start, device);
                continue;
            }

            let erase = EraseInfoUser {
                start,
                length: mtd_info.erase_size,
            };
            // SAFETY: erase points to a valid erase_info_user.
            if let Err(errno) = unsafe { mem_erase(fd, &erase) } {
                warn!("Erase failed at 0x{:08x} on {}: {}", start, device, errno);
                continue;
            }
            erased += 1;
        }

        if erased == 0 && total_blocks > 0 {
            return Err(SysError::OperationFailed(format!(
                "no block of {} could be erased",
                device
            )));
        }

        debug!("Erased {}/{} blocks of {}", erased, total_blocks, device);
        Ok(erased)
    }

    fn close(&self, handle: FlashWriteHandle) -> Result<()> {
        if let Some(file) = handle.file {
            file.sync_all()?;
        }
        Ok(())
    }
}

/// Parse `/proc/mtd`:
///
/// ```text
/// dev:    size   erasesize  name
/// mtd0: 00040000 00020000 "misc"
/// ```
pub fn parse_proc_mtd(input: &str) -> Vec<FlashPartition> {
    input
        .lines()
        .filter_map(|line| {
            let (device, rest) = line.split_once(':')?;
            let index = device.trim().strip_prefix("mtd")?.parse().ok()?;

            let mut fields = rest.split_whitespace();
            let size = u64::from_str_radix(fields.next()?, 16).ok()?;
            let erase_size = u32::from_str_radix(fields.next()?, 16).ok()?;

            let name = rest.split_once('"')?.1.trim_end().strip_suffix('"')?;

            Some(FlashPartition {
                index,
                name: name.to_string(),
                size,
                erase_size,
            })
        })
        .collect()
}
