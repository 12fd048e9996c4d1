// SPDX-License-Identifier: GPL-3.0-only

//! Session state shared by every volume operation

use std::cell::OnceCell;
use std::path::PathBuf;
use std::sync::Arc;

use recovery_sys::{
    CommandRunner, ContentsFormatter, ExternalCommand, FallbackFormatter, FlashPartitions,
    FstabReader, ImageBuilder, LinuxMounts, MakeExt4fs, MountPrimitives, ProcMtd, SystemCommand,
    TableReader, VdcClient, VolumeDaemon,
};
use recovery_types::VolumeRecord;
use tracing::warn;

use crate::config::EngineConfig;
use crate::table::VolumeTable;

pub(crate) const DATA: &str = "/data";
pub(crate) const SYSTEM: &str = "/system";
pub(crate) const TMP: &str = "/tmp";

/// External collaborators the engine drives
pub struct Collaborators {
    pub tables: Box<dyn TableReader>,
    pub commands: Arc<dyn CommandRunner>,
    pub mounts: Box<dyn MountPrimitives>,
    pub daemon: Box<dyn VolumeDaemon>,
    pub flash: Box<dyn FlashPartitions>,
    pub images: Box<dyn ImageBuilder>,
    pub fallback: Box<dyn FallbackFormatter>,
}

impl Collaborators {
    /// Production collaborators for a live recovery environment
    pub fn system(config: &EngineConfig) -> Self {
        let commands: Arc<dyn CommandRunner> = Arc::new(SystemCommand);
        Self {
            tables: Box::new(FstabReader),
            mounts: Box::new(LinuxMounts),
            daemon: Box::new(VdcClient::new()),
            flash: Box::new(ProcMtd::new()),
            images: Box::new(MakeExt4fs::new(commands.clone())),
            fallback: Box::new(ContentsFormatter::new(
                commands.clone(),
                config.paths.sysroot.clone(),
                config.paths.preserve_on_wipe.clone(),
            )),
            commands,
        }
    }
}

/// One recovery session: the volume table plus everything derived from it.
///
/// The engine is single-threaded; a session is meant to be owned by the
/// recovery UI's control thread.
pub struct Session {
    pub(crate) config: EngineConfig,
    pub(crate) sys: Collaborators,
    pub(crate) table: Option<VolumeTable>,
    pub(crate) initialized: bool,
    pub(crate) layout: usize,
    pub(crate) ignore_data_media: bool,
    pub(crate) primary_storage: OnceCell<String>,
    pub(crate) secure_storage: OnceCell<String>,
}

impl Session {
    /// A session with no table loaded yet; see [`Session::load_volume_table`]
    pub fn new(config: EngineConfig, sys: Collaborators) -> Self {
        Self {
            config,
            sys,
            table: None,
            initialized: false,
            layout: 1,
            ignore_data_media: false,
            primary_storage: OnceCell::new(),
            secure_storage: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn table(&self) -> Option<&VolumeTable> {
        self.table.as_ref()
    }

    /// Records of the current table, empty when none was built
    pub fn volumes(&self) -> &[VolumeRecord] {
        self.table
            .as_ref()
            .map(VolumeTable::records)
            .unwrap_or_default()
    }

    /// Whether a table has been built successfully at least once
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Table layout used by rebuilds after the first one
    pub fn select_layout(&mut self, layout: usize) {
        self.layout = layout;
    }

    /// Format `/data` paths normally even when storage lives on `/data`
    pub fn set_ignore_data_media(&mut self, ignore: bool) {
        self.ignore_data_media = ignore;
    }

    /// Where a logical path lives on the host, for side effects outside
    /// mount(2): directory creation, symlinks and device existence checks
    pub(crate) fn host_path(&self, path: &str) -> PathBuf {
        self.config
            .paths
            .sysroot
            .join(path.trim_start_matches('/'))
    }

    /// Exit code of `command`; `-1` when it could not be started
    pub(crate) fn run(&self, command: &ExternalCommand) -> i32 {
        match self.sys.commands.run(command) {
            Ok(code) => code,
            Err(error) => {
                warn!("{}", error);
                -1
            }
        }
    }

    /// Run a configured argv; an empty one counts as a failure
    pub(crate) fn run_configured(&self, argv: &[String]) -> i32 {
        match ExternalCommand::from_argv(argv) {
            Some(command) => self.run(&command),
            None => -1,
        }
    }

    pub(crate) fn clear_derived_paths(&mut self) {
        self.primary_storage = OnceCell::new();
        self.secure_storage = OnceCell::new();
    }
}
