// SPDX-License-Identifier: GPL-3.0-only

//! Filesystem image builders

use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use recovery_types::effective_length;
use tracing::{debug, info};
use which::which;

use crate::command::{CommandRunner, ExternalCommand};
use crate::error::{Result, SysError};

/// Builds a fresh filesystem on a device
pub trait ImageBuilder: Send + Sync {
    /// Build an ext4 filesystem of the declared `length` on `device`.
    ///
    /// `length` follows the volume table convention: zero fills the device,
    /// a negative value reserves that many bytes at its end.
    fn build(
        &self,
        device: &str,
        length: i64,
        mount_point: &str,
        security_contexts: Option<&Path>,
    ) -> Result<()>;

    /// Build an f2fs filesystem spanning the whole device
    fn build_f2fs(&self, device: &str, mount_point: &str) -> Result<()>;
}

/// Size in bytes of a block device or image file
pub fn device_size(device: &str) -> Result<u64> {
    let mut file = File::open(device).map_err(|error| {
        if error.kind() == std::io::ErrorKind::NotFound {
            SysError::DeviceNotFound(device.to_string())
        } else {
            SysError::Io(error)
        }
    })?;
    Ok(file.seek(SeekFrom::End(0))?)
}

/// Runs `make_ext4fs` when available, `mke2fs` otherwise
pub struct MakeExt4fs {
    runner: Arc<dyn CommandRunner>,
}

impl MakeExt4fs {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    fn run_checked(&self, command: ExternalCommand) -> Result<()> {
        let code = self.runner.run(&command)?;
        if code != 0 {
            return Err(SysError::CommandFailed {
                command: command.render(),
                reason: format!("exited with {}", code),
            });
        }
        Ok(())
    }
}

impl ImageBuilder for MakeExt4fs {
    fn build(
        &self,
        device: &str,
        length: i64,
        mount_point: &str,
        security_contexts: Option<&Path>,
    ) -> Result<()> {
        let bytes = if length > 0 {
            length as u64
        } else {
            effective_length(length, device_size(device)?)
        };
        debug!(
            "Building ext4 on {} ({} bytes, declared {})",
            device, bytes, length
        );

        let command = if which("make_ext4fs").is_ok() {
            let mut command = ExternalCommand::new("make_ext4fs")
                .arg("-l")
                .arg(bytes.to_string())
                .arg("-a")
                .arg(mount_point);
            if let Some(contexts) = security_contexts {
                command = command.arg("-S").arg(contexts.display().to_string());
            }
            command.arg(device)
        } else {
            ExternalCommand::new("mke2fs")
                .args(["-t", "ext4", "-F", device])
                .arg(format!("{}k", bytes / 1024))
        };

        self.run_checked(command)?;
        info!("Built ext4 filesystem on {} for {}", device, mount_point);
        Ok(())
    }

    fn build_f2fs(&self, device: &str, mount_point: &str) -> Result<()> {
        self.run_checked(ExternalCommand::new("mkfs.f2fs").arg(device))?;
        info!("Built f2fs filesystem on {} for {}", device, mount_point);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn measures_image_files() {
        let mut image = tempfile::NamedTempFile::new().unwrap();
        image.write_all(&[0u8; 8192]).unwrap();
        image.flush().unwrap();

        let path = image.path().to_str().unwrap();
        assert_eq!(device_size(path).unwrap(), 8192);
    }

    #[test]
    fn missing_device_is_reported() {
        assert!(matches!(
            device_size("/nonexistent/block/device"),
            Err(SysError::DeviceNotFound(_))
        ));
    }
}
