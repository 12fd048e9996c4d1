mod common;

use std::path::PathBuf;

use common::{DEFAULT_TABLE, EXTRA_TABLE, Harness, INIT_SCRIPT, SECONDARY_TABLE};
use recovery_testing::{managed, volume};
use recovery_types::{FsType, VolumeRecord};
use recovery_volumes::VolumeError;

fn stock_table() -> Vec<VolumeRecord> {
    vec![
        volume("/system", "ext4", "/dev/block/platform/msm_sdcc.1/by-name/system"),
        volume("/data", "ext4", "/dev/block/platform/msm_sdcc.1/by-name/userdata"),
        volume("/cache", "ext4", "/dev/block/platform/msm_sdcc.1/by-name/cache"),
        managed("/storage/sdcard0", "vfat", "/devices/platform/msm_sdcc.2/mmc_host", "sdcard0"),
    ]
}

#[test]
fn resolves_exact_mount_points_only() {
    let harness = Harness::new(stock_table());
    let session = &harness.session;

    for record in session.volumes() {
        let resolved = session.resolve(&record.mount_point).unwrap();
        assert_eq!(resolved.mount_point, record.mount_point);
    }
    assert!(session.resolve("/data/app").is_none());
    assert!(session.resolve("/dat").is_none());
    assert!(session.resolve("/data/").is_none());
    assert!(session.resolve("/").is_none());
}

#[test]
fn appends_ramdisk_for_tmp() {
    let harness = Harness::new(stock_table());
    let tmp = harness.session.resolve("/tmp").unwrap();
    assert_eq!(tmp.fs_type, FsType::Ramdisk);
    assert_eq!(harness.session.volumes().len(), 5);
    assert_eq!(harness.session.volumes().last().unwrap().mount_point, "/tmp");
}

#[test]
fn falls_back_to_default_table() {
    let mut harness = Harness::unloaded(vec![]);
    harness.fakes.tables.remove(common::PRIMARY_TABLE);
    harness
        .fakes
        .tables
        .insert(DEFAULT_TABLE, vec![volume("/cache", "yaffs2", "cache")]);

    harness.session.load_volume_table().unwrap();

    assert!(harness.session.resolve("/cache").is_some());
    assert_eq!(
        harness.fakes.tables.reads()[..2],
        [PathBuf::from(common::PRIMARY_TABLE), PathBuf::from(DEFAULT_TABLE)]
    );
}

#[test]
fn missing_tables_leave_session_without_table() {
    let mut harness = Harness::unloaded(vec![]);
    harness.fakes.tables.remove(common::PRIMARY_TABLE);

    let result = harness.session.load_volume_table();

    assert!(matches!(result, Err(VolumeError::TableBuildFailed)));
    assert!(harness.session.table().is_none());
    assert!(harness.session.resolve("/tmp").is_none());
    assert!(!harness.session.is_data_media());
    assert!(!harness.session.is_initialized());
    assert!(harness.commands().is_empty());
}

#[test]
fn declared_tmp_is_kept() {
    let mut harness = Harness::unloaded(vec![
        volume("/cache", "ext4", "/dev/block/cache"),
        volume("/tmp", "ramdisk", "ramdisk"),
    ]);

    harness.session.load_volume_table().unwrap();

    assert_eq!(harness.session.volumes().len(), 2);
    assert!(harness.session.resolve("/tmp").unwrap().is_ramdisk());

    harness.session.mount("/cache", None).unwrap();
    assert_eq!(harness.fakes.mounts.mount_calls().len(), 1);
    assert!(harness.fakes.mounted.is_mounted("/cache"));
}

#[test]
fn merges_auxiliary_alternates() {
    let mut harness = Harness::unloaded(stock_table());
    let mut data = volume("/data", "bind", "/.secondrom/media/.secondrom/data");
    data.fs_options = Some("rw".to_string());
    harness.fakes.tables.insert(
        EXTRA_TABLE,
        vec![data, volume("/preload", "ext4", "/dev/block/preload")],
    );

    harness.session.load_volume_table().unwrap();

    let data = harness.session.resolve("/data").unwrap();
    assert_eq!(
        data.alt_block_device.as_deref(),
        Some("/.secondrom/media/.secondrom/data")
    );
    assert_eq!(data.alt_fs_type, Some(FsType::Bind));
    assert_eq!(data.alt_fs_options.as_deref(), Some("rw"));
    assert_eq!(data.fs_type, FsType::Ext4);
    assert!(harness.session.resolve("/preload").is_none());

    let system = harness.session.resolve("/system").unwrap();
    assert_eq!(system.alt_block_device, None);
}

#[test]
fn initialization_script_runs_once() {
    let mut harness = Harness::unloaded(stock_table());

    harness.session.load_volume_table().unwrap();
    harness.session.rebuild_volume_table().unwrap();
    harness.session.rebuild_volume_table().unwrap();

    let runs = harness
        .commands()
        .iter()
        .filter(|command| *command == INIT_SCRIPT)
        .count();
    assert_eq!(runs, 1);
    assert!(harness.session.is_initialized());
}

#[test]
fn failing_initialization_script_is_not_fatal() {
    let mut harness = Harness::unloaded(stock_table());
    harness.fakes.commands.fail(INIT_SCRIPT);

    harness.session.load_volume_table().unwrap();
    assert!(harness.session.is_initialized());
}

#[test]
fn selected_layout_applies_to_rebuilds() {
    let mut harness = Harness::unloaded(stock_table());
    harness.fakes.tables.insert(
        SECONDARY_TABLE,
        vec![volume("/data", "f2fs", "/dev/block/userdata")],
    );

    harness.session.select_layout(2);
    harness.session.load_volume_table().unwrap();
    assert_eq!(
        harness.session.resolve("/data").unwrap().fs_type,
        FsType::Ext4
    );

    harness.session.rebuild_volume_table().unwrap();
    assert_eq!(
        harness.session.resolve("/data").unwrap().fs_type,
        FsType::F2fs
    );
    assert!(harness.session.resolve("/system").is_none());
}

#[test]
fn rebuild_recomputes_storage_paths() {
    let mut harness = Harness::new(vec![volume("/data", "ext4", "/dev/block/data")]);
    assert_eq!(harness.session.primary_storage_path(), "/sdcard");
    assert_eq!(
        harness.session.secure_app_storage_path(),
        "/sdcard/.android_secure"
    );
    assert!(harness.session.is_data_media());

    harness.fakes.tables.insert(common::PRIMARY_TABLE, stock_table());
    harness.session.rebuild_volume_table().unwrap();

    assert_eq!(harness.session.primary_storage_path(), "/storage/sdcard0");
    assert_eq!(
        harness.session.secure_app_storage_path(),
        "/storage/sdcard0/.android_secure"
    );
    assert!(!harness.session.is_data_media());
}
