#![allow(dead_code)]

use std::path::{Path, PathBuf};

use recovery_testing::FakeSystem;
use recovery_types::VolumeRecord;
use recovery_volumes::{Collaborators, EngineConfig, Session};
use tempfile::TempDir;

pub const PRIMARY_TABLE: &str = "/etc/primary.fstab";
pub const SECONDARY_TABLE: &str = "/etc/secondary.fstab";
pub const DEFAULT_TABLE: &str = "/etc/default.fstab";
pub const EXTRA_TABLE: &str = "/etc/extra1.fstab";
pub const INIT_SCRIPT: &str = "/sbin/mount_fs.sh initial";

pub struct Harness {
    pub fakes: FakeSystem,
    pub session: Session,
    pub root: TempDir,
}

impl Harness {
    /// Session over fakes with `records` as the layout 1 table. Nothing is
    /// built yet.
    pub fn unloaded(records: Vec<VolumeRecord>) -> Self {
        let fakes = FakeSystem::new();
        fakes.tables.insert(PRIMARY_TABLE, records);

        let root = tempfile::tempdir().unwrap();
        let mut config = EngineConfig::default();
        config.paths.sysroot = root.path().to_path_buf();
        config.logging.file = None;

        let session = Session::new(config, collaborators(&fakes));
        Self {
            fakes,
            session,
            root,
        }
    }

    /// Session with the table already built
    pub fn new(records: Vec<VolumeRecord>) -> Self {
        let mut harness = Self::unloaded(records);
        harness.session.load_volume_table().unwrap();
        harness.fakes.ledger.clear();
        harness
    }

    /// Where a logical path lands inside the test sysroot
    pub fn host(&self, path: &str) -> PathBuf {
        self.root.path().join(path.trim_start_matches('/'))
    }

    pub fn touch(&self, path: &str) {
        let host = self.host(path);
        if let Some(parent) = host.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(host, b"").unwrap();
    }

    pub fn commands(&self) -> Vec<String> {
        self.fakes.commands.invocations()
    }
}

pub fn collaborators(fakes: &FakeSystem) -> Collaborators {
    Collaborators {
        tables: Box::new(fakes.tables.clone()),
        commands: std::sync::Arc::new(fakes.commands.clone()),
        mounts: Box::new(fakes.mounts.clone()),
        daemon: Box::new(fakes.daemon.clone()),
        flash: Box::new(fakes.flash.clone()),
        images: Box::new(fakes.images.clone()),
        fallback: Box::new(fakes.fallback.clone()),
    }
}

pub fn read_link(path: &Path) -> PathBuf {
    std::fs::read_link(path).unwrap()
}
