// SPDX-License-Identifier: GPL-3.0-only

use serde::{Deserialize, Serialize};

/// An entry of the live mount table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountedVolume {
    /// Source device (or pseudo source such as `tmpfs`)
    pub device: String,

    pub mount_point: String,

    pub fs_type: String,

    /// Raw option string as reported by the kernel
    pub options: String,
}

/// Find the entry mounted at `mount_point`, if any
pub fn find_by_mount_point<'a>(
    mounted: &'a [MountedVolume],
    mount_point: &str,
) -> Option<&'a MountedVolume> {
    mounted.iter().find(|volume| volume.mount_point == mount_point)
}
