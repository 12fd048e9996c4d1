use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use recovery_sys::{FlashPartitions, FlashWriteHandle, Result, SysError};
use recovery_types::FlashPartition;

use crate::ledger::{Ledger, Source, lock};
use crate::mounts::MountTable;

/// Flash stages that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlashStage {
    Open,
    Erase,
    Close,
    Mount,
}

/// In-memory MTD partitions
#[derive(Debug, Clone)]
pub struct FakeFlash {
    ledger: Ledger,
    table: MountTable,
    partitions: Arc<Mutex<Vec<FlashPartition>>>,
    failing: Arc<Mutex<HashSet<FlashStage>>>,
}

impl FakeFlash {
    pub fn new(ledger: Ledger, table: MountTable) -> Self {
        Self {
            ledger,
            table,
            partitions: Arc::default(),
            failing: Arc::default(),
        }
    }

    pub fn add_partition(&self, name: &str) {
        let mut partitions = lock(&self.partitions);
        let index = partitions.len() as u32;
        partitions.push(FlashPartition {
            index,
            name: name.to_string(),
            size: 0x0400_0000,
            erase_size: 0x0002_0000,
        });
    }

    pub fn fail(&self, stage: FlashStage) {
        lock(&self.failing).insert(stage);
    }

    fn check(&self, stage: FlashStage, partition: &FlashPartition) -> Result<()> {
        if lock(&self.failing).contains(&stage) {
            return Err(SysError::OperationFailed(format!(
                "{:?} of {} failed",
                stage, partition.name
            )));
        }
        Ok(())
    }
}

impl FlashPartitions for FakeFlash {
    fn scan_partitions(&self) -> Result<usize> {
        self.ledger.record(Source::Flash, "scan");
        Ok(lock(&self.partitions).len())
    }

    fn find_partition_by_name(&self, name: &str) -> Option<FlashPartition> {
        lock(&self.partitions)
            .iter()
            .find(|partition| partition.name == name)
            .cloned()
    }

    fn mount_partition(
        &self,
        partition: &FlashPartition,
        mount_point: &str,
        fs_type: &str,
        read_only: bool,
    ) -> Result<()> {
        self.ledger.record(
            Source::Flash,
            format!(
                "mount {} {} {} ro={}",
                partition.name, mount_point, fs_type, read_only
            ),
        );
        self.check(FlashStage::Mount, partition)?;
        self.table
            .attach(&partition.block_device(), mount_point, fs_type);
        Ok(())
    }

    fn open_for_write(&self, partition: &FlashPartition) -> Result<FlashWriteHandle> {
        self.ledger
            .record(Source::Flash, format!("open {}", partition.name));
        self.check(FlashStage::Open, partition)?;
        Ok(FlashWriteHandle::detached(partition.clone()))
    }

    fn erase_all(&self, handle: &mut FlashWriteHandle) -> Result<u32> {
        self.ledger
            .record(Source::Flash, format!("erase {}", handle.partition.name));
        self.check(FlashStage::Erase, &handle.partition)?;
        let partition = &handle.partition;
        Ok((partition.size / u64::from(partition.erase_size)) as u32)
    }

    fn close(&self, handle: FlashWriteHandle) -> Result<()> {
        self.ledger
            .record(Source::Flash, format!("close {}", handle.partition.name));
        self.check(FlashStage::Close, &handle.partition)
    }
}
