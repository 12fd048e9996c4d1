// SPDX-License-Identifier: GPL-3.0-only

use nix::errno::Errno;
use thiserror::Error;

/// Error types for system-level operations
#[derive(Error, Debug)]
pub enum SysError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to run {command}: {reason}")]
    CommandFailed { command: String, reason: String },

    #[error("{operation} of {target} failed: {errno}")]
    Syscall {
        operation: &'static str,
        target: String,
        errno: Errno,
    },

    #[error("Invalid table {source_name}: {reason}")]
    TableParse { source_name: String, reason: String },

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl SysError {
    pub(crate) fn syscall(operation: &'static str, target: &str, errno: Errno) -> Self {
        if errno == Errno::EPERM || errno == Errno::EACCES {
            return Self::PermissionDenied(format!("{operation} of {target}"));
        }
        Self::Syscall {
            operation,
            target: target.to_string(),
            errno,
        }
    }
}

/// Result type alias for system operations
pub type Result<T> = std::result::Result<T, SysError>;
