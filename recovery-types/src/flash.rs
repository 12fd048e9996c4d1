// SPDX-License-Identifier: GPL-3.0-only

use serde::{Deserialize, Serialize};

/// A raw flash (MTD) partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashPartition {
    /// MTD index (`mtdN`)
    pub index: u32,

    /// Partition name as reported by the kernel, without quotes
    pub name: String,

    /// Size in bytes
    pub size: u64,

    /// Erase block size in bytes
    pub erase_size: u32,
}

impl FlashPartition {
    /// Character device used for raw reads, writes and erases
    pub fn char_device(&self) -> String {
        format!("/dev/mtd/mtd{}", self.index)
    }

    /// Block device used for mounting
    pub fn block_device(&self) -> String {
        format!("/dev/block/mtdblock{}", self.index)
    }
}
