// SPDX-License-Identifier: GPL-3.0-only

use recovery_types::{FsType, VolumeRecord};

use crate::session::Session;

impl Session {
    /// Record whose mount point is exactly `path`.
    ///
    /// There is no prefix matching: `/data/app` does not resolve to `/data`.
    pub fn resolve(&self, path: &str) -> Option<&VolumeRecord> {
        self.table.as_ref()?.get(path)
    }

    /// Whether external storage of the current table lives on `/data`
    pub fn is_data_media(&self) -> bool {
        self.table
            .as_ref()
            .is_some_and(|table| table.is_data_media())
    }

    /// Whether operations on `path` are redirected into `/data`
    pub fn is_media_redirected(&self, path: &str) -> bool {
        if let Some(record) = self.resolve(path) {
            return record.fs_type == FsType::DataMedia;
        }

        let legacy = self.config.paths.legacy_storage.as_str();
        self.is_data_media()
            && (path == legacy
                || path
                    .strip_prefix(legacy)
                    .is_some_and(|rest| rest.starts_with('/')))
    }
}
