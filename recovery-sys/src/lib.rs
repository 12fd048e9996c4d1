// SPDX-License-Identifier: GPL-3.0-only

//! Low-level system operations for the recovery volume engine
//!
//! This crate provides the collaborators the engine drives, each behind a
//! small trait so callers can substitute scripted fakes:
//! - External command execution (`mount`, `umount`, helper scripts)
//! - The live mount table and the mount/unmount syscalls
//! - Reading partition-table sources
//! - The managed storage daemon client
//! - Raw flash (MTD) partitions
//! - Filesystem image builders and the fallback formatter
//!
//! These operations require elevated privileges and are meant to run inside
//! the recovery environment.

pub mod command;
pub mod error;
pub mod fallback;
pub mod fstab;
pub mod mkfs;
pub mod mounts;
pub mod mtd;
pub mod vold;

pub use command::{CommandRunner, ExternalCommand, SystemCommand};
pub use error::{Result, SysError};
pub use fallback::{ContentsFormatter, FallbackFormatter};
pub use fstab::{FstabReader, TableReader, parse_fstab};
pub use mkfs::{ImageBuilder, MakeExt4fs, device_size};
pub use mounts::{LinuxMounts, MountPrimitives, parse_proc_mounts};
pub use mtd::{FlashPartitions, FlashWriteHandle, ProcMtd, parse_proc_mtd};
pub use nix::mount::MsFlags;
pub use vold::{UnmountFlags, VdcClient, VolumeDaemon};
