// SPDX-License-Identifier: GPL-3.0-only

//! The merged volume table

use recovery_types::{FsType, VolumeRecord};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::StoragePaths;
use crate::error::{Result, VolumeError};
use crate::session::{Session, TMP};

/// Ordered set of volume records with unique mount points
#[derive(Debug, Clone, Default, Serialize)]
pub struct VolumeTable {
    records: Vec<VolumeRecord>,
    data_media: bool,
}

impl VolumeTable {
    /// Build from parsed records. Later duplicates of a mount point are
    /// dropped so lookups stay unambiguous.
    pub fn new(records: Vec<VolumeRecord>) -> Self {
        let mut table = Self::default();
        for record in records {
            if table.get(&record.mount_point).is_some() {
                warn!("Ignoring duplicate entry for {}", record.mount_point);
                continue;
            }
            table.records.push(record);
        }
        table
    }

    pub fn records(&self) -> &[VolumeRecord] {
        &self.records
    }

    pub fn get(&self, mount_point: &str) -> Option<&VolumeRecord> {
        self.records
            .iter()
            .find(|record| record.mount_point == mount_point)
    }

    /// Append a record; refused when its mount point is already taken
    pub fn add_entry(&mut self, record: VolumeRecord) -> Result<()> {
        if self.get(&record.mount_point).is_some() {
            return Err(VolumeError::Config(format!(
                "{} is already in the volume table",
                record.mount_point
            )));
        }
        self.records.push(record);
        Ok(())
    }

    /// Copy alternate device/type/options from auxiliary records onto the
    /// records sharing their mount point. Returns how many matched.
    pub fn merge_extra(&mut self, extra: &[VolumeRecord]) -> usize {
        let mut merged = 0;
        for alternate in extra {
            match self
                .records
                .iter_mut()
                .find(|record| record.mount_point == alternate.mount_point)
            {
                Some(record) => {
                    record.merge_alternate(alternate);
                    merged += 1;
                }
                None => debug!("No volume for extra entry {}", alternate.mount_point),
            }
        }
        merged
    }

    /// Whether external storage lives on /data for this table
    pub fn is_data_media(&self) -> bool {
        self.data_media
    }

    /// Table-wide data-media classification: any `datamedia` record, or no
    /// record providing external storage of its own.
    pub(crate) fn classify(&mut self, paths: &StoragePaths) {
        let mut has_external = false;
        for record in &self.records {
            if record.fs_type == FsType::DataMedia {
                self.data_media = true;
                return;
            }
            if record.mount_point == paths.legacy_storage
                || (record.is_daemon_managed() && record.mount_point == paths.primary_storage)
            {
                has_external = true;
            }
        }
        self.data_media = !has_external;
    }
}

impl Session {
    /// Build the volume table from the configured sources.
    ///
    /// The first build of a session always reads layout 1; later builds use
    /// the layout chosen with [`Session::select_layout`]. Derived storage
    /// paths are recomputed after every build.
    pub fn load_volume_table(&mut self) -> Result<()> {
        self.table = None;
        self.clear_derived_paths();

        let layout = if self.initialized { self.layout } else { 1 };

        let Some(records) = self.read_first(&self.config.tables.primary_candidates(layout)) else {
            error!("failed to read a volume table");
            return Err(VolumeError::TableBuildFailed);
        };

        let mut table = VolumeTable::new(records);
        if let Some(declared) = table.get(TMP) {
            warn!(
                "volume table already declares {} as {}, keeping it",
                TMP, declared.fs_type
            );
        } else if let Err(error) = table.add_entry(VolumeRecord::ramdisk(TMP)) {
            error!("failed to add {} entry to volume table: {}", TMP, error);
            return Err(VolumeError::TableBuildFailed);
        }

        match self.read_first(&self.config.tables.extra_candidates(layout)) {
            Some(extra) => {
                let merged = table.merge_extra(&extra);
                info!("extra filesystem table (device2, fstype2, options2):");
                for (index, record) in extra.iter().enumerate() {
                    info!(
                        "  {} {} {} {} {}",
                        index,
                        record.mount_point,
                        record.fs_type,
                        record.block_device.as_deref().unwrap_or("(null)"),
                        record.length
                    );
                }
                debug!("{} extra entries matched a volume", merged);
            }
            None => info!("No extra filesystem table"),
        }

        table.classify(&self.config.paths);

        if !self.initialized {
            self.initialized = true;
            let code = self.run_configured(&self.config.scripts.initialize);
            if code != 0 {
                warn!("initialization script exited with {}", code);
            }
        }

        info!("recovery filesystem table");
        info!("=========================");
        for (index, record) in table.records().iter().enumerate() {
            info!(
                "  {} {} {} {} {}",
                index,
                record.mount_point,
                record.fs_type,
                record.block_device.as_deref().unwrap_or("(null)"),
                record.length
            );
        }

        self.table = Some(table);
        Ok(())
    }

    /// Discard the current table and parse the sources again
    pub fn rebuild_volume_table(&mut self) -> Result<()> {
        self.load_volume_table()
    }

    fn read_first(&self, candidates: &[&std::path::Path]) -> Option<Vec<VolumeRecord>> {
        candidates.iter().find_map(|candidate| {
            match self.sys.tables.read_table(candidate) {
                Ok(records) => {
                    debug!("Using {}", candidate.display());
                    Some(records)
                }
                Err(error) => {
                    debug!("Skipping {}: {}", candidate.display(), error);
                    None
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(mount_point: &str, fs_type: &str, device: &str) -> VolumeRecord {
        VolumeRecord::new(mount_point, FsType::parse(fs_type), Some(device.to_string()))
    }

    #[test]
    fn merge_is_idempotent_and_additive() {
        let mut table = VolumeTable::new(vec![
            record("/system", "ext4", "/dev/block/system"),
            record("/data", "ext4", "/dev/block/data"),
        ]);
        let mut alternate = record("/data", "bind", "/.secondrom/data");
        alternate.fs_options = Some("rw".to_string());
        let extra = vec![alternate, record("/preload", "ext4", "/dev/block/preload")];

        assert_eq!(table.merge_extra(&extra), 1);
        let first = table.records().to_vec();
        assert_eq!(table.merge_extra(&extra), 1);

        assert_eq!(table.records(), first.as_slice());
        assert_eq!(table.records().len(), 2);
        assert!(table.get("/preload").is_none());

        let data = table.get("/data").unwrap();
        assert_eq!(data.alt_block_device.as_deref(), Some("/.secondrom/data"));
        assert_eq!(data.alt_fs_type, Some(FsType::Bind));
        assert_eq!(data.alt_fs_options.as_deref(), Some("rw"));
    }

    #[test]
    fn duplicates_are_dropped() {
        let table = VolumeTable::new(vec![
            record("/cache", "ext4", "/dev/block/cache"),
            record("/cache", "yaffs2", "cache"),
        ]);
        assert_eq!(table.records().len(), 1);
        assert_eq!(table.get("/cache").unwrap().fs_type, FsType::Ext4);
    }

    #[test]
    fn add_entry_refuses_taken_mount_point() {
        let mut table = VolumeTable::new(vec![VolumeRecord::ramdisk("/tmp")]);
        assert!(table.add_entry(VolumeRecord::ramdisk("/tmp")).is_err());
    }

    #[test]
    fn classifies_data_media() {
        let paths = StoragePaths::default();

        let mut no_sdcard = VolumeTable::new(vec![record("/data", "ext4", "/dev/block/data")]);
        no_sdcard.classify(&paths);
        assert!(no_sdcard.is_data_media());

        let mut legacy = VolumeTable::new(vec![record("/sdcard", "vfat", "/dev/block/mmcblk1p1")]);
        legacy.classify(&paths);
        assert!(!legacy.is_data_media());

        let mut unmanaged = VolumeTable::new(vec![record("/storage/sdcard0", "vfat", "/dev/a")]);
        unmanaged.classify(&paths);
        assert!(unmanaged.is_data_media());

        let mut managed = unmanaged.clone();
        managed.records[0].daemon_label = Some("sdcard0".to_string());
        managed.classify(&paths);
        assert!(!managed.is_data_media());

        let mut explicit = VolumeTable::new(vec![
            record("/sdcard", "vfat", "/dev/block/mmcblk1p1"),
            record("/emmc", "datamedia", "/data/media"),
        ]);
        explicit.classify(&paths);
        assert!(explicit.is_data_media());
    }
}
