use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use recovery_sys::{MountPrimitives, MsFlags, Result, SysError};
use recovery_types::{MountedVolume, find_by_mount_point};

use crate::ledger::{Ledger, Source, lock};

/// Live mount table shared by the fakes that can attach volumes
#[derive(Debug, Clone, Default)]
pub struct MountTable {
    volumes: Arc<Mutex<Vec<MountedVolume>>>,
}

impl MountTable {
    pub fn attach(&self, device: &str, mount_point: &str, fs_type: &str) {
        lock(&self.volumes).push(MountedVolume {
            device: device.to_string(),
            mount_point: mount_point.to_string(),
            fs_type: fs_type.to_string(),
            options: "rw".to_string(),
        });
    }

    pub fn detach(&self, mount_point: &str) {
        lock(&self.volumes).retain(|volume| volume.mount_point != mount_point);
    }

    pub fn snapshot(&self) -> Vec<MountedVolume> {
        lock(&self.volumes).clone()
    }

    pub fn is_mounted(&self, mount_point: &str) -> bool {
        find_by_mount_point(&lock(&self.volumes), mount_point).is_some()
    }

    /// Number of live entries at `mount_point`
    pub fn count(&self, mount_point: &str) -> usize {
        lock(&self.volumes)
            .iter()
            .filter(|volume| volume.mount_point == mount_point)
            .count()
    }
}

/// Mount syscalls against a [`MountTable`], with injectable failures
#[derive(Debug, Clone)]
pub struct FakeMounts {
    ledger: Ledger,
    table: MountTable,
    failing: Arc<Mutex<HashSet<String>>>,
    scan_fails: Arc<Mutex<bool>>,
}

impl FakeMounts {
    pub fn new(ledger: Ledger, table: MountTable) -> Self {
        Self {
            ledger,
            table,
            failing: Arc::default(),
            scan_fails: Arc::default(),
        }
    }

    /// Make mount syscalls for `device` fail with EINVAL
    pub fn fail_device(&self, device: impl Into<String>) {
        lock(&self.failing).insert(device.into());
    }

    pub fn fail_scan(&self, fails: bool) {
        *lock(&self.scan_fails) = fails;
    }

    /// Mount syscalls made so far
    pub fn mount_calls(&self) -> Vec<String> {
        self.ledger
            .details(Source::Syscall)
            .into_iter()
            .filter(|detail| detail.starts_with("mount "))
            .collect()
    }
}

impl MountPrimitives for FakeMounts {
    fn mounted_volumes(&self) -> Result<Vec<MountedVolume>> {
        if *lock(&self.scan_fails) {
            return Err(SysError::OperationFailed(
                "cannot read /proc/mounts".to_string(),
            ));
        }
        Ok(self.table.snapshot())
    }

    fn mount(&self, device: &str, mount_point: &str, fs_type: &str, flags: MsFlags) -> Result<()> {
        self.ledger.record(
            Source::Syscall,
            format!(
                "mount {} {} {} {:#x}",
                device,
                mount_point,
                fs_type,
                flags.bits()
            ),
        );
        if lock(&self.failing).contains(device) {
            return Err(SysError::Syscall {
                operation: "mount",
                target: mount_point.to_string(),
                errno: nix::errno::Errno::EINVAL,
            });
        }
        self.table.attach(device, mount_point, fs_type);
        Ok(())
    }

    fn unmount(&self, volume: &MountedVolume) -> Result<()> {
        self.ledger
            .record(Source::Syscall, format!("umount {}", volume.mount_point));
        self.table.detach(&volume.mount_point);
        Ok(())
    }
}
