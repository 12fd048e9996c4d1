// SPDX-License-Identifier: GPL-3.0-only

use std::fmt;

use serde::{Deserialize, Serialize};

/// Response code returned by the storage daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonStatus(pub u16);

impl DaemonStatus {
    /// The daemon's "command okay" response
    pub const OKAY: Self = Self(200);

    /// Generic failure used when the daemon could not be reached
    pub const UNREACHABLE: Self = Self(500);

    pub fn is_ok(self) -> bool {
        self == Self::OKAY
    }
}

impl fmt::Display for DaemonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
