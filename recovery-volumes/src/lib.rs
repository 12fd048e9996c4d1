// SPDX-License-Identifier: GPL-3.0-only

//! Volume resolution and mount/format orchestration for recovery environments
//!
//! A [`Session`] owns the merged volume table of the device and turns
//! filesystem paths into mount, unmount and format operations on the volume
//! that backs them:
//! - Building the table from the configured partition-table sources
//! - Resolving paths to volumes, including data-media redirection to `/data`
//! - Deriving the primary, secure and extra storage locations
//! - Mounting, unmounting and formatting through the system collaborators
//!
//! ```no_run
//! use recovery_volumes::{Collaborators, EngineConfig, Session, status_code};
//!
//! let config = EngineConfig::load(None)?;
//! let mut session = Session::new(config.clone(), Collaborators::system(&config));
//! session.load_volume_table()?;
//! let status = status_code(&session.mount("/cache", None));
//! # let _ = status;
//! # Ok::<(), recovery_volumes::VolumeError>(())
//! ```

pub mod config;
pub mod error;
pub mod logging;

mod format;
mod mount;
mod resolver;
mod session;
mod storage;
mod table;
mod unmount;

pub use config::{DEFAULT_CONFIG_PATH, EngineConfig};
pub use error::{ForbiddenOperation, Result, VolumeError, status_code};
pub use session::{Collaborators, Session};
pub use storage::MAX_MANAGED_VOLUMES;
pub use table::VolumeTable;
