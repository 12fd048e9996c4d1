// SPDX-License-Identifier: GPL-3.0-only

use recovery_sys::SysError;
use thiserror::Error;

/// Operation a ramdisk refuses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForbiddenOperation {
    Unmount,
    Format,
}

impl std::fmt::Display for ForbiddenOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unmount => f.write_str("unmount"),
            Self::Format => f.write_str("format"),
        }
    }
}

/// Error types for volume operations
#[derive(Error, Debug)]
pub enum VolumeError {
    #[error("no usable volume table")]
    TableBuildFailed,

    #[error("unknown volume for path [{0}]")]
    UnknownVolume(String),

    #[error("failed to mount {device}: {reason}")]
    MountFailed { device: String, reason: String },

    #[error("failed to unmount {mount_point}: {reason}")]
    UnmountFailed { mount_point: String, reason: String },

    #[error("failed to format {volume}: {reason}")]
    FormatFailed { volume: String, reason: String },

    #[error("can't {operation} {path}: volume is a ramdisk")]
    Forbidden {
        path: String,
        operation: ForbiddenOperation,
    },

    #[error("skipped {0}")]
    Skipped(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Sys(#[from] SysError),
}

impl VolumeError {
    pub(crate) fn mount_failed(device: impl Into<String>, reason: impl ToString) -> Self {
        Self::MountFailed {
            device: device.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn unmount_failed(mount_point: impl Into<String>, reason: impl ToString) -> Self {
        Self::UnmountFailed {
            mount_point: mount_point.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn format_failed(volume: impl Into<String>, reason: impl ToString) -> Self {
        Self::FormatFailed {
            volume: volume.into(),
            reason: reason.to_string(),
        }
    }

    /// Failures that are expected and should not be shown to the user
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }
}

/// Result type alias for volume operations
pub type Result<T> = std::result::Result<T, VolumeError>;

/// Collapse an operation result to the `0` / `-1` status used across the
/// recovery UI boundary
pub fn status_code<T>(result: &Result<T>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(_) => -1,
    }
}
