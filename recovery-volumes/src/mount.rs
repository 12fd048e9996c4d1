// SPDX-License-Identifier: GPL-3.0-only

//! Mounting volumes by path

use std::fs;
use std::os::unix::fs::symlink;

use recovery_sys::{ExternalCommand, MsFlags};
use recovery_types::{FsType, VolumeRecord, find_by_mount_point};
use tracing::{debug, error, info, warn};

use crate::error::{Result, VolumeError};
use crate::session::{DATA, SYSTEM, Session};

/// One (device, type, options) combination tried when mounting a block volume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MountCandidate<'a> {
    pub device: Option<&'a str>,
    pub fs_type: Option<&'a FsType>,
    pub options: Option<&'a str>,
}

/// Candidates in the order they are tried. Duplicates are kept, so a volume
/// without alternates tries its primary triple more than once.
pub(crate) fn mount_candidates(volume: &VolumeRecord) -> [MountCandidate<'_>; 4] {
    let device = volume.block_device.as_deref();
    let alt_device = volume.alt_block_device.as_deref();
    let alt_type = volume.alt_fs_type.as_ref();

    [
        MountCandidate {
            device: alt_device.or(device),
            fs_type: alt_type.or(Some(&volume.fs_type)),
            options: volume.fs_options.as_deref(),
        },
        MountCandidate {
            device,
            fs_type: Some(&volume.fs_type),
            options: volume.fs_options.as_deref(),
        },
        MountCandidate {
            device,
            fs_type: alt_type,
            options: volume.alt_fs_options.as_deref(),
        },
        MountCandidate {
            device: alt_device,
            fs_type: alt_type,
            options: volume.alt_fs_options.as_deref(),
        },
    ]
}

impl Session {
    /// Make sure the volume for `path` is mounted.
    ///
    /// `mount_point` overrides where the volume is attached; by default it
    /// goes to the record's own mount point. Paths that do not name a volume
    /// succeed without doing anything, except `/data`, `/system` and the
    /// secondary data bind which go through their recovery commands.
    pub fn mount(&self, path: &str, mount_point: Option<&str>) -> Result<()> {
        if self.is_media_redirected(path) {
            info!("using /data/media for {}", path);
            if path == DATA {
                return Err(VolumeError::mount_failed(path, "/data cannot store media for itself"));
            }
            self.mount(DATA, None)?;
            self.setup_data_media();
            return Ok(());
        }

        let Some(volume) = self.resolve(path) else {
            return self.mount_unresolved(path);
        };
        debug!("trying to mount {} at {}", volume.mount_point, path);

        if volume.is_ramdisk() {
            return Ok(());
        }

        let target = mount_point.unwrap_or(&volume.mount_point);
        let device = volume.block_device.as_deref().unwrap_or(target);

        let mounted = self.sys.mounts.mounted_volumes().map_err(|error| {
            error!("failed to scan mounted volumes");
            VolumeError::mount_failed(device, error)
        })?;
        if find_by_mount_point(&mounted, target).is_some() {
            return Ok(());
        }

        let host = self.host_path(target);
        if let Err(error) = fs::create_dir_all(&host) {
            debug!("Could not create {}: {}", host.display(), error);
        }

        if self.sys.daemon.is_managed(volume) {
            let status = self.sys.daemon.mount_volume(target, true);
            if status.is_ok() {
                return Ok(());
            }
            return Err(VolumeError::mount_failed(
                device,
                format!("storage daemon returned {}", status),
            ));
        }

        if volume.fs_type == FsType::Yaffs2 {
            return self.mount_flash(volume, target);
        }

        if volume.fs_type.is_block_family() || volume.alt_fs_type == Some(FsType::Bind) {
            let mut last_error = None;
            for candidate in mount_candidates(volume) {
                match self.try_mount(&candidate, target) {
                    Ok(()) => return Ok(()),
                    Err(error) => last_error = Some(error),
                }
            }
            return Err(last_error
                .unwrap_or_else(|| VolumeError::mount_failed(device, "no mount candidates")));
        }

        let command = ExternalCommand::new("mount").arg(target);
        match self.run(&command) {
            0 => Ok(()),
            code => Err(VolumeError::mount_failed(
                device,
                format!("`{}` exited with {}", command, code),
            )),
        }
    }

    fn mount_unresolved(&self, path: &str) -> Result<()> {
        let scripts = &self.config.scripts;
        let code = if path.contains(&scripts.secondary_data_marker) {
            self.run_configured(&scripts.secondary_data_bind)
        } else if path == DATA {
            self.run_configured(&scripts.data_mount)
        } else if path == SYSTEM {
            self.run_configured(&scripts.system_mount)
        } else {
            return Ok(());
        };

        if code == 0 {
            return Ok(());
        }
        error!("unknown volume for path [{}]", path);
        Err(VolumeError::mount_failed(
            path,
            format!("recovery mount command exited with {}", code),
        ))
    }

    fn mount_flash(&self, volume: &VolumeRecord, target: &str) -> Result<()> {
        let name = volume.block_device.as_deref().unwrap_or_default();
        if let Err(error) = self.sys.flash.scan_partitions() {
            warn!("failed to scan flash partitions: {}", error);
        }

        let Some(partition) = self.sys.flash.find_partition_by_name(name) else {
            error!(
                "failed to find \"{}\" partition to mount at \"{}\"",
                name, target
            );
            return Err(VolumeError::mount_failed(name, "no such flash partition"));
        };

        self.sys
            .flash
            .mount_partition(&partition, target, volume.fs_type.as_str(), false)
            .map_err(|error| VolumeError::mount_failed(name, error))
    }

    /// One mount attempt, with the `/data` and `/system` recovery commands
    /// as a last resort
    fn try_mount(&self, candidate: &MountCandidate<'_>, mount_point: &str) -> Result<()> {
        let (Some(device), Some(fs_type)) = (candidate.device, candidate.fs_type) else {
            return Err(VolumeError::mount_failed(
                candidate.device.unwrap_or("(null)"),
                "incomplete mount candidate",
            ));
        };

        let reason = match (fs_type, candidate.options) {
            (FsType::Bind, _) => self.mount_command(
                ExternalCommand::new("mount")
                    .args(["--bind", device, mount_point]),
            ),
            (FsType::LoopImage, _) => self.mount_command(
                ExternalCommand::new("mount")
                    .args(["-o", "loop", device, mount_point]),
            ),
            (_, Some(options)) => self.mount_command(ExternalCommand::new("mount").args([
                "-t".to_string(),
                fs_type.to_string(),
                format!("-o{}", options),
                device.to_string(),
                mount_point.to_string(),
            ])),
            (_, None) => self
                .sys
                .mounts
                .mount(
                    device,
                    mount_point,
                    fs_type.as_str(),
                    MsFlags::MS_NOATIME | MsFlags::MS_NODEV | MsFlags::MS_NODIRATIME,
                )
                .err()
                .map(|error| error.to_string()),
        };

        let Some(reason) = reason else {
            return Ok(());
        };

        let recovery = match mount_point {
            DATA => Some(&self.config.scripts.data_mount),
            SYSTEM => Some(&self.config.scripts.system_mount),
            _ => None,
        };
        if let Some(argv) = recovery
            && self.run_configured(argv) == 0
        {
            info!("mounted {} through its recovery command", mount_point);
            return Ok(());
        }

        warn!("failed to mount {} ({})", device, reason);
        Err(VolumeError::mount_failed(device, reason))
    }

    /// Failure reason of a mount command, `None` when it succeeded
    fn mount_command(&self, command: ExternalCommand) -> Option<String> {
        match self.run(&command) {
            0 => None,
            code => Some(format!("`{}` exited with {}", command, code)),
        }
    }

    /// Link the data-media mount point to the directory backing it on
    /// `/data`. Failures are logged and otherwise ignored.
    fn setup_data_media(&self) {
        let paths = &self.config.paths;
        let mount_point = self
            .volumes()
            .iter()
            .find(|record| record.fs_type == FsType::DataMedia)
            .map_or(paths.legacy_storage.as_str(), |record| {
                record.mount_point.as_str()
            });

        info!("using {} for {}", paths.media_backing, mount_point);
        let link = self.host_path(mount_point);
        if let Err(error) = fs::remove_dir(&link) {
            debug!("Could not remove {}: {}", link.display(), error);
        }

        let backing = self.host_path(&paths.media_backing);
        if let Err(error) = fs::create_dir_all(&backing) {
            warn!("Could not create {}: {}", backing.display(), error);
        }
        if let Err(error) = symlink(&paths.media_backing, &link) {
            debug!("Could not link {}: {}", link.display(), error);
        }
    }
}
