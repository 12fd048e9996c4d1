// SPDX-License-Identifier: GPL-3.0-only

//! Storage locations derived from the volume table

use std::fs;
use std::io::ErrorKind;
use std::os::unix::fs::symlink;

use recovery_sys::SysError;
use tracing::{info, warn};

use crate::error::Result;
use crate::session::Session;

/// Upper bound on secondary storage paths reported to the UI
pub const MAX_MANAGED_VOLUMES: usize = 10;

impl Session {
    /// Canonical primary storage path.
    ///
    /// Memoized until the next table build.
    pub fn primary_storage_path(&self) -> &str {
        self.primary_storage.get_or_init(|| {
            let paths = &self.config.paths;
            if self.resolve(&paths.primary_storage).is_some() {
                paths.primary_storage.clone()
            } else {
                paths.legacy_storage.clone()
            }
        })
    }

    /// Secure app storage directory under the primary storage
    pub fn secure_app_storage_path(&self) -> &str {
        self.secure_storage.get_or_init(|| {
            format!(
                "{}/{}",
                self.primary_storage_path().trim_end_matches('/'),
                self.config.paths.secure_suffix
            )
        })
    }

    /// Mount points of secondary removable storage, in table order
    pub fn extra_storage_paths(&self) -> Vec<String> {
        let primary = self.primary_storage_path();
        let external = self.config.paths.external_storage.as_str();

        let mut paths = Vec::new();
        for record in self.volumes() {
            let qualifies = record.mount_point == external
                || (record.mount_point != primary
                    && self.sys.daemon.is_managed(record)
                    && self.sys.daemon.is_volume_available(&record.mount_point));
            if !qualifies {
                continue;
            }
            if paths.len() == MAX_MANAGED_VOLUMES {
                warn!(
                    "More than {} extra storage volumes, ignoring {}",
                    MAX_MANAGED_VOLUMES, record.mount_point
                );
                continue;
            }
            paths.push(record.mount_point.clone());
        }
        paths
    }

    /// Whether the storage daemon owns the primary storage volume
    pub fn is_primary_storage_daemon_managed(&self) -> bool {
        self.resolve(&self.config.paths.primary_storage)
            .is_some_and(|record| self.sys.daemon.is_managed(record))
    }

    /// Point the legacy storage path at the primary storage path
    pub fn setup_legacy_storage_alias(&self) -> Result<()> {
        let primary = self.primary_storage_path();
        let legacy = self.config.paths.legacy_storage.as_str();

        if self.is_media_redirected(primary) || primary == legacy {
            return Ok(());
        }

        let alias = self.host_path(legacy);
        match fs::remove_file(&alias) {
            Ok(()) => {}
            Err(error) if error.kind() == ErrorKind::NotFound => {}
            Err(_) => {
                // a leftover directory from an earlier mount
                if let Err(error) = fs::remove_dir(&alias) {
                    warn!("Could not remove {}: {}", alias.display(), error);
                }
            }
        }

        symlink(primary, &alias).map_err(SysError::from)?;
        info!("Linked {} to {}", legacy, primary);
        Ok(())
    }
}
