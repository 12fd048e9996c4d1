// SPDX-License-Identifier: GPL-3.0-only

//! Formatter for paths without first-class handling
//!
//! When a type hint and a device are known and a matching `mkfs.<type>` tool
//! exists, the device is reformatted with it. Otherwise "formatting" means
//! wiping the contents of the directory, which is also what happens for
//! paths that have no backing filesystem of their own.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};
use which::which;

use crate::command::{CommandRunner, ExternalCommand};
use crate::error::{Result, SysError};

pub trait FallbackFormatter: Send + Sync {
    fn format(&self, device: Option<&str>, path: &str, fs_type: Option<&str>) -> Result<()>;
}

pub struct ContentsFormatter {
    runner: Arc<dyn CommandRunner>,
    sysroot: PathBuf,
    preserved: Vec<PathBuf>,
}

impl ContentsFormatter {
    /// `preserved` lists absolute paths that a wipe must leave in place
    pub fn new(runner: Arc<dyn CommandRunner>, sysroot: PathBuf, preserved: Vec<PathBuf>) -> Self {
        Self {
            runner,
            sysroot,
            preserved,
        }
    }

    fn try_mkfs(&self, device: &str, fs_type: &str) -> Result<bool> {
        let tool = format!("mkfs.{}", fs_type);
        if which(&tool).is_err() {
            debug!("{} not available, wiping contents instead", tool);
            return Ok(false);
        }

        let command = ExternalCommand::new(tool).arg(device);
        let code = self.runner.run(&command)?;
        if code != 0 {
            warn!("{} exited with {}, wiping contents instead", command, code);
            return Ok(false);
        }
        Ok(true)
    }

    fn wipe_contents(&self, path: &str) -> Result<()> {
        let logical = Path::new(path);
        let host = self.sysroot.join(path.trim_start_matches('/'));

        if !host.exists() {
            info!("{} does not exist, nothing to wipe", path);
            return Ok(());
        }
        if !host.is_dir() {
            return Err(SysError::OperationFailed(format!(
                "{} is not a directory",
                path
            )));
        }

        let mut failures = 0;
        for entry in fs::read_dir(&host)? {
            let entry = entry?;
            let name = entry.file_name();
            if self.preserved.iter().any(|kept| *kept == logical.join(&name)) {
                debug!("Keeping {}/{}", path, name.to_string_lossy());
                continue;
            }

            let entry_path = entry.path();
            let removed = if entry.file_type()?.is_dir() {
                fs::remove_dir_all(&entry_path)
            } else {
                fs::remove_file(&entry_path)
            };
            if let Err(error) = removed {
                warn!("Failed to remove {}: {}", entry_path.display(), error);
                failures += 1;
            }
        }

        if failures > 0 {
            return Err(SysError::OperationFailed(format!(
                "{} entries of {} could not be removed",
                failures, path
            )));
        }

        info!("Wiped contents of {}", path);
        Ok(())
    }
}

impl FallbackFormatter for ContentsFormatter {
    fn format(&self, device: Option<&str>, path: &str, fs_type: Option<&str>) -> Result<()> {
        if let (Some(device), Some(fs_type)) = (device, fs_type)
            && self.try_mkfs(device, fs_type)?
        {
            info!("Formatted {} ({}) for {}", device, fs_type, path);
            return Ok(());
        }

        self.wipe_contents(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::SystemCommand;

    fn formatter(root: &Path) -> ContentsFormatter {
        ContentsFormatter::new(
            Arc::new(SystemCommand),
            root.to_path_buf(),
            vec![PathBuf::from("/data/media")],
        )
    }

    #[test]
    fn wipes_contents_but_keeps_preserved_entries() {
        let root = tempfile::tempdir().unwrap();
        let data = root.path().join("data");
        fs::create_dir_all(data.join("media/0")).unwrap();
        fs::create_dir_all(data.join("app/com.example")).unwrap();
        fs::write(data.join(".layout_version"), "3").unwrap();

        formatter(root.path()).format(None, "/data", None).unwrap();

        assert!(data.join("media/0").exists());
        assert!(!data.join("app").exists());
        assert!(!data.join(".layout_version").exists());
    }

    #[test]
    fn missing_path_is_a_no_op() {
        let root = tempfile::tempdir().unwrap();
        formatter(root.path())
            .format(None, "/sdcard/foo", None)
            .unwrap();
    }

    #[test]
    fn regular_file_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("cache"), "").unwrap();
        assert!(formatter(root.path()).format(None, "/cache", None).is_err());
    }
}
