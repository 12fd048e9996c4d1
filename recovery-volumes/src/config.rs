// SPDX-License-Identifier: GPL-3.0-only

//! Engine configuration
//!
//! Everything is optional in the TOML file; missing keys fall back to the
//! layout of a stock recovery image.
//!
//! ```toml
//! [tables]
//! layouts = ["/etc/primary.fstab", "/etc/secondary.fstab"]
//! fallback = "/etc/default.fstab"
//!
//! [paths]
//! primary_storage = "/storage/sdcard0"
//!
//! [logging]
//! level = "debug"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, VolumeError};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/recovery-volumes.toml";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LoggingLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LoggingLevel {
    pub fn as_directive(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub tables: TableSources,
    pub scripts: Scripts,
    pub paths: StoragePaths,
    pub logging: LoggingConfig,

    /// SELinux file contexts handed to the image builder
    pub security_contexts: Option<PathBuf>,
}

impl EngineConfig {
    /// Load from `path`, or from [`DEFAULT_CONFIG_PATH`] when it exists,
    /// or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_PATH);
                if !default.exists() {
                    debug!("No {}, using built-in defaults", DEFAULT_CONFIG_PATH);
                    return Ok(Self::default());
                }
                default
            }
        };

        let raw = fs::read_to_string(&path)
            .map_err(|error| VolumeError::Config(format!("{}: {}", path.display(), error)))?;
        Self::from_toml(&raw)
            .map_err(|error| VolumeError::Config(format!("{}: {}", path.display(), error)))
    }

    pub fn from_toml(raw: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }
}

/// Candidate table locations, tried in priority order
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct TableSources {
    /// Primary table per layout; layout 1 is the first entry
    pub layouts: Vec<PathBuf>,

    /// Tried when the selected layout's table does not parse
    pub fallback: PathBuf,

    /// Auxiliary (alternate device) table per layout
    pub extra_layouts: Vec<PathBuf>,

    pub extra_fallback: PathBuf,
}

impl Default for TableSources {
    fn default() -> Self {
        Self {
            layouts: vec![
                PathBuf::from("/etc/primary.fstab"),
                PathBuf::from("/etc/secondary.fstab"),
            ],
            fallback: PathBuf::from("/etc/default.fstab"),
            extra_layouts: vec![
                PathBuf::from("/etc/extra1.fstab"),
                PathBuf::from("/etc/extra2.fstab"),
            ],
            extra_fallback: PathBuf::from("/etc/extra_default.fstab"),
        }
    }
}

impl TableSources {
    pub fn primary_candidates(&self, layout: usize) -> Vec<&Path> {
        candidates(&self.layouts, &self.fallback, layout)
    }

    pub fn extra_candidates(&self, layout: usize) -> Vec<&Path> {
        candidates(&self.extra_layouts, &self.extra_fallback, layout)
    }
}

fn candidates<'a>(layouts: &'a [PathBuf], fallback: &'a Path, layout: usize) -> Vec<&'a Path> {
    layout
        .checked_sub(1)
        .and_then(|index| layouts.get(index))
        .map(PathBuf::as_path)
        .into_iter()
        .chain(std::iter::once(fallback))
        .collect()
}

/// Helper commands, as argv lists
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct Scripts {
    /// Run once after the first successful table build
    pub initialize: Vec<String>,

    /// Recovery path for mounting `/data`
    pub data_mount: Vec<String>,

    /// Recovery path for mounting `/system`
    pub system_mount: Vec<String>,

    /// Paths containing this fragment are bind-mounted onto `/data`
    pub secondary_data_marker: String,

    pub secondary_data_bind: Vec<String>,
}

impl Default for Scripts {
    fn default() -> Self {
        Self {
            initialize: argv(&["/sbin/mount_fs.sh", "initial"]),
            data_mount: argv(&["/sbin/data_mount.sh"]),
            system_mount: argv(&["mount", "system"]),
            secondary_data_marker: "/.secondrom/media/.secondrom/data".to_string(),
            secondary_data_bind: argv(&[
                "mount",
                "-o",
                "bind",
                "/.secondrom/media/.secondrom/data",
                "/data",
            ]),
        }
    }
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|part| part.to_string()).collect()
}

/// Well-known storage locations
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct StoragePaths {
    /// Root for host-side side effects (mkdir, symlink, device checks)
    pub sysroot: PathBuf,

    /// Canonical primary external storage mount point
    pub primary_storage: String,

    /// Legacy alias of the primary storage, also the data-media mount point
    pub legacy_storage: String,

    /// Secondary removable storage alias
    pub external_storage: String,

    /// Directory name of secure app storage under the primary storage
    pub secure_suffix: String,

    /// Legacy second ext partition on the sdcard
    pub sd_ext: String,

    /// Directory backing data-media storage
    pub media_backing: String,

    /// Absolute paths a contents wipe leaves in place
    pub preserve_on_wipe: Vec<PathBuf>,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self {
            sysroot: PathBuf::from("/"),
            primary_storage: "/storage/sdcard0".to_string(),
            legacy_storage: "/sdcard".to_string(),
            external_storage: "/external_sd".to_string(),
            secure_suffix: ".android_secure".to_string(),
            sd_ext: "/sd-ext".to_string(),
            media_backing: "/.secondrom/media".to_string(),
            preserve_on_wipe: vec![PathBuf::from("/data/media")],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LoggingLevel,

    /// Log file; `None` logs to stderr only
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LoggingLevel::Info,
            file: Some(PathBuf::from("/tmp/recovery-volumes.log")),
        }
    }
}
