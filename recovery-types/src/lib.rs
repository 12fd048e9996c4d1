// SPDX-License-Identifier: GPL-3.0-only

//! Domain models for the recovery volume engine
//!
//! These types are shared by every crate in the workspace:
//!
//! - **recovery-sys**: produces `VolumeRecord`s from table sources and
//!   `MountedVolume`s from the live mount table
//! - **recovery-volumes**: owns the merged volume table and resolves paths
//!   against it
//! - **recovery-testing**: scripts fakes in terms of these types

pub mod daemon;
pub mod flash;
pub mod mount;
pub mod volume;

pub use daemon::DaemonStatus;
pub use flash::FlashPartition;
pub use mount::{MountedVolume, find_by_mount_point};
pub use volume::{FsType, VolumeRecord, effective_length};
