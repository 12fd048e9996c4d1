// SPDX-License-Identifier: GPL-3.0-only

//! Formatting volumes by path

use recovery_sys::ExternalCommand;
use recovery_types::{FsType, VolumeRecord};
use tracing::{debug, error, info, warn};

use crate::error::{ForbiddenOperation, Result, VolumeError};
use crate::session::{DATA, Session};

/// Device name fragments of loop-mounted images that are cleared instead of
/// rebuilt, with the command that clears them
const IMAGE_CLEARS: &[(&str, &str)] = &[
    ("data.img", "mount data; rm -rf /data/*; rm -rf /data/.*"),
    ("system.img", "mount system; rm -rf /system/*; rm -rf /system/.*"),
];

impl Session {
    /// Erase the volume for `path`, or the contents of `path` when it has no
    /// filesystem of its own.
    pub fn format(&self, path: &str) -> Result<()> {
        if self.is_media_redirected(path) {
            return self.format_fallback(None, path, None);
        }
        if path.starts_with(DATA) && self.is_data_media() && !self.ignore_data_media {
            return self.format_fallback(None, path, None);
        }

        let sd_ext = self.config.paths.sd_ext.as_str();
        let Some(volume) = self.resolve(path) else {
            if path == sd_ext {
                return Err(VolumeError::Skipped(path.to_string()));
            }
            error!("unknown volume '{}'", path);
            return Err(VolumeError::UnknownVolume(path.to_string()));
        };

        if path == sd_ext {
            let present = volume
                .block_device
                .as_deref()
                .is_some_and(|device| self.host_path(device).exists());
            if !present {
                info!("Skipping format of sd-ext");
                return Err(VolumeError::Skipped(path.to_string()));
            }
        }

        let managed = self.sys.daemon.is_managed(volume);
        let alternate = volume.alt_block_device.as_deref().filter(|_| managed);
        let device = alternate.or(volume.block_device.as_deref());

        if managed && path == volume.mount_point && alternate.is_none() {
            if let Err(error) = self.unmount(path) {
                error!("format failed to unmount {}: {}", volume.mount_point, error);
            }
            let status = self.sys.daemon.format_volume(&volume.mount_point, true);
            if status.is_ok() {
                return Ok(());
            }
            return Err(VolumeError::format_failed(
                path,
                format!("storage daemon returned {}", status),
            ));
        }

        if volume.is_ramdisk() {
            error!("can't format_volume \"{}\"", path);
            return Err(VolumeError::Forbidden {
                path: path.to_string(),
                operation: ForbiddenOperation::Format,
            });
        }

        if path != volume.mount_point {
            return self.format_fallback(volume.block_device.as_deref(), path, None);
        }

        if let Err(error) = self.unmount(path) {
            error!("format failed to unmount \"{}\"", volume.mount_point);
            return Err(VolumeError::format_failed(path, error));
        }

        match &volume.fs_type {
            fs_type if fs_type.is_flash() => self.erase_flash(volume),
            FsType::Ext4 => self.format_ext4(volume, device),
            #[cfg(feature = "fs-f2fs")]
            FsType::F2fs => {
                let device = volume.block_device.as_deref().unwrap_or_default();
                self.sys
                    .images
                    .build_f2fs(device, &volume.mount_point)
                    .map_err(|error| {
                        error!("mkfs.f2fs failed on {}", device);
                        VolumeError::format_failed(path, error)
                    })
            }
            other => self.format_fallback(
                volume.block_device.as_deref(),
                path,
                Some(other.as_str()),
            ),
        }
    }

    fn erase_flash(&self, volume: &VolumeRecord) -> Result<()> {
        let path = volume.mount_point.as_str();
        let name = volume.block_device.as_deref().unwrap_or_default();

        if let Err(error) = self.sys.flash.scan_partitions() {
            warn!("failed to scan flash partitions: {}", error);
        }
        let Some(partition) = self.sys.flash.find_partition_by_name(name) else {
            error!("no MTD partition \"{}\"", name);
            return Err(VolumeError::format_failed(path, "no such flash partition"));
        };

        let mut handle = self.sys.flash.open_for_write(&partition).map_err(|error| {
            warn!("can't open MTD \"{}\"", name);
            VolumeError::format_failed(path, error)
        })?;

        if let Err(error) = self.sys.flash.erase_all(&mut handle) {
            warn!("can't erase MTD \"{}\"", name);
            if let Err(close_error) = self.sys.flash.close(handle) {
                debug!("close after failed erase: {}", close_error);
            }
            return Err(VolumeError::format_failed(path, error));
        }

        self.sys.flash.close(handle).map_err(|error| {
            warn!("can't close MTD \"{}\"", name);
            VolumeError::format_failed(path, error)
        })
    }

    fn format_ext4(&self, volume: &VolumeRecord, device: Option<&str>) -> Result<()> {
        let path = volume.mount_point.as_str();
        let primary = volume.block_device.as_deref().unwrap_or_default();

        // Image-backed volumes are matched by name only, so an unrelated
        // device whose path happens to contain the fragment is cleared too.
        let mut cleared = false;
        for (fragment, script) in IMAGE_CLEARS {
            if primary.contains(fragment) {
                cleared = true;
                let code = self.run(&ExternalCommand::shell(*script));
                debug!("clearing {} exited with {}", fragment, code);
            }
        }
        if cleared {
            return Ok(());
        }

        let Some(device) = device else {
            return Err(VolumeError::format_failed(path, "volume has no device"));
        };
        self.sys
            .images
            .build(
                device,
                volume.length,
                path,
                self.config.security_contexts.as_deref(),
            )
            .map_err(|error| {
                error!("make_ext4fs failed on {}", device);
                VolumeError::format_failed(path, error)
            })
    }

    /// Hand `path` to the fallback formatter.
    ///
    /// Without a device and type to rebuild, the path's contents are wiped,
    /// which needs it mounted for the duration.
    fn format_fallback(&self, device: Option<&str>, path: &str, fs_type: Option<&str>) -> Result<()> {
        let wipes_contents = device.is_none() || fs_type.is_none();
        if wipes_contents {
            self.mount(path, None).map_err(|error| {
                VolumeError::format_failed(path, format!("error mounting {}: {}", path, error))
            })?;
        }

        let result = self
            .sys
            .fallback
            .format(device, path, fs_type)
            .map_err(|error| VolumeError::format_failed(path, error));

        if wipes_contents && let Err(error) = self.unmount(path) {
            debug!("leaving {} mounted: {}", path, error);
        }
        result
    }
}
