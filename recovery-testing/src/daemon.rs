use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use recovery_sys::{UnmountFlags, VolumeDaemon};
use recovery_types::DaemonStatus;

use crate::ledger::{Ledger, Source, lock};
use crate::mounts::MountTable;

/// Storage daemon that mounts into a shared [`MountTable`]
#[derive(Debug, Clone)]
pub struct FakeDaemon {
    ledger: Ledger,
    table: MountTable,
    available: Arc<Mutex<HashSet<String>>>,
    statuses: Arc<Mutex<HashMap<&'static str, DaemonStatus>>>,
}

impl FakeDaemon {
    pub fn new(ledger: Ledger, table: MountTable) -> Self {
        Self {
            ledger,
            table,
            available: Arc::default(),
            statuses: Arc::default(),
        }
    }

    /// Report media present at `mount_point`
    pub fn set_available(&self, mount_point: impl Into<String>) {
        lock(&self.available).insert(mount_point.into());
    }

    /// Answer every `operation` (`mount`, `unmount`, `format`) with `status`
    pub fn respond(&self, operation: &'static str, status: DaemonStatus) {
        lock(&self.statuses).insert(operation, status);
    }

    fn status(&self, operation: &'static str) -> DaemonStatus {
        lock(&self.statuses)
            .get(operation)
            .copied()
            .unwrap_or(DaemonStatus::OKAY)
    }
}

impl VolumeDaemon for FakeDaemon {
    fn mount_volume(&self, mount_point: &str, wait: bool) -> DaemonStatus {
        self.ledger
            .record(Source::Daemon, format!("mount {} wait={}", mount_point, wait));
        let status = self.status("mount");
        if status.is_ok() {
            self.table.attach("vold", mount_point, "vfat");
        }
        status
    }

    fn unmount_volume(&self, mount_point: &str, flags: UnmountFlags) -> DaemonStatus {
        self.ledger.record(
            Source::Daemon,
            format!(
                "unmount {} force={} detach={}",
                mount_point, flags.force, flags.detach
            ),
        );
        let status = self.status("unmount");
        if status.is_ok() {
            self.table.detach(mount_point);
        }
        status
    }

    fn format_volume(&self, mount_point: &str, wipe: bool) -> DaemonStatus {
        self.ledger
            .record(Source::Daemon, format!("format {} wipe={}", mount_point, wipe));
        self.status("format")
    }

    fn is_volume_available(&self, mount_point: &str) -> bool {
        lock(&self.available).contains(mount_point)
    }
}
