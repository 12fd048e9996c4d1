use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use recovery_sys::{Result, SysError, TableReader};
use recovery_types::{FsType, VolumeRecord};

use crate::ledger::lock;

/// Partition-table sources held in memory, keyed by path
#[derive(Debug, Clone, Default)]
pub struct StaticTables {
    tables: Arc<Mutex<HashMap<PathBuf, Vec<VolumeRecord>>>>,
    reads: Arc<Mutex<Vec<PathBuf>>>,
}

impl StaticTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, records: Vec<VolumeRecord>) {
        lock(&self.tables).insert(path.into(), records);
    }

    pub fn remove(&self, path: impl AsRef<Path>) {
        lock(&self.tables).remove(path.as_ref());
    }

    /// Every path a read was attempted on, oldest first
    pub fn reads(&self) -> Vec<PathBuf> {
        lock(&self.reads).clone()
    }
}

impl TableReader for StaticTables {
    fn read_table(&self, path: &Path) -> Result<Vec<VolumeRecord>> {
        lock(&self.reads).push(path.to_path_buf());
        lock(&self.tables)
            .get(path)
            .cloned()
            .ok_or_else(|| SysError::DeviceNotFound(path.display().to_string()))
    }
}

/// Record with a primary device and nothing else
pub fn volume(mount_point: &str, fs_type: &str, device: &str) -> VolumeRecord {
    VolumeRecord::new(mount_point, FsType::parse(fs_type), Some(device.to_string()))
}

/// Record owned by the storage daemon under `label`
pub fn managed(mount_point: &str, fs_type: &str, device: &str, label: &str) -> VolumeRecord {
    let mut record = volume(mount_point, fs_type, device);
    record.daemon_label = Some(label.to_string());
    record
}
