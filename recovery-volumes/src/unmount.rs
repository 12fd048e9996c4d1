// SPDX-License-Identifier: GPL-3.0-only

use recovery_sys::{ExternalCommand, UnmountFlags};
use recovery_types::find_by_mount_point;
use tracing::{debug, error, info};

use crate::error::{ForbiddenOperation, Result, VolumeError};
use crate::session::Session;

impl Session {
    /// Make sure the volume for `path` is not mounted.
    ///
    /// Data-media paths always succeed and leave `/data` mounted.
    pub fn unmount(&self, path: &str) -> Result<()> {
        if self.is_media_redirected(path) {
            debug!("not unmounting {}: backed by /data", path);
            return Ok(());
        }

        let Some(volume) = self.resolve(path) else {
            let command = ExternalCommand::new("umount").arg(path);
            return match self.run(&command) {
                0 => Ok(()),
                code => Err(VolumeError::unmount_failed(
                    path,
                    format!("`{}` exited with {}", command, code),
                )),
            };
        };

        if volume.is_ramdisk() {
            return Err(VolumeError::Forbidden {
                path: path.to_string(),
                operation: ForbiddenOperation::Unmount,
            });
        }

        let mounted = self.sys.mounts.mounted_volumes().map_err(|error| {
            error!("failed to scan mounted volumes");
            VolumeError::unmount_failed(&volume.mount_point, error)
        })?;
        let Some(live) = find_by_mount_point(&mounted, &volume.mount_point) else {
            return Ok(());
        };

        if self.sys.daemon.is_managed(volume) {
            let flags = UnmountFlags {
                force: true,
                detach: true,
            };
            let status = self.sys.daemon.unmount_volume(&volume.mount_point, flags);
            if status.is_ok() {
                return Ok(());
            }
            return Err(VolumeError::unmount_failed(
                &volume.mount_point,
                format!("storage daemon returned {}", status),
            ));
        }

        self.sys
            .mounts
            .unmount(live)
            .map_err(|error| VolumeError::unmount_failed(&volume.mount_point, error))?;
        info!("unmounted {}", volume.mount_point);
        Ok(())
    }
}
