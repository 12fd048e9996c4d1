mod common;

use std::path::Path;

use common::{Harness, read_link};
use recovery_testing::{managed, volume};
use recovery_volumes::MAX_MANAGED_VOLUMES;

#[test]
fn derives_primary_and_secure_paths() {
    let harness = Harness::new(vec![managed(
        "/storage/sdcard0",
        "vfat",
        "/devices/platform/msm_sdcc.2/mmc_host",
        "sdcard0",
    )]);

    assert_eq!(harness.session.primary_storage_path(), "/storage/sdcard0");
    assert_eq!(
        harness.session.secure_app_storage_path(),
        "/storage/sdcard0/.android_secure"
    );
    assert!(harness.session.is_primary_storage_daemon_managed());
}

#[test]
fn legacy_primary_without_record() {
    let harness = Harness::new(vec![volume("/sdcard", "vfat", "/dev/block/mmcblk1p1")]);

    assert_eq!(harness.session.primary_storage_path(), "/sdcard");
    assert!(!harness.session.is_primary_storage_daemon_managed());
}

#[test]
fn extra_storage_in_table_order() {
    let harness = Harness::new(vec![
        managed("/storage/sdcard0", "vfat", "/devices/msm_sdcc.2", "sdcard0"),
        managed("/storage/usbdisk", "vfat", "/devices/usb.1", "usbdisk"),
        volume("/external_sd", "vfat", "/dev/block/mmcblk1p1"),
        managed("/storage/usbdisk2", "vfat", "/devices/usb.2", "usbdisk2"),
        volume("/emmc", "vfat", "/dev/block/mmcblk0p30"),
    ]);
    harness.fakes.daemon.set_available("/storage/sdcard0");
    harness.fakes.daemon.set_available("/storage/usbdisk");

    assert_eq!(
        harness.session.extra_storage_paths(),
        ["/storage/usbdisk", "/external_sd"]
    );
}

#[test]
fn no_extra_storage() {
    let harness = Harness::new(vec![volume("/sdcard", "vfat", "/dev/block/mmcblk1p1")]);
    assert!(harness.session.extra_storage_paths().is_empty());
}

#[test]
fn extra_storage_is_capped() {
    let records = (0..MAX_MANAGED_VOLUMES + 2)
        .map(|index| {
            managed(
                &format!("/storage/usb{}", index),
                "vfat",
                &format!("/devices/usb.{}", index),
                &format!("usb{}", index),
            )
        })
        .collect();
    let harness = Harness::new(records);
    for index in 0..MAX_MANAGED_VOLUMES + 2 {
        harness
            .fakes
            .daemon
            .set_available(format!("/storage/usb{}", index));
    }

    let paths = harness.session.extra_storage_paths();

    assert_eq!(paths.len(), MAX_MANAGED_VOLUMES);
    assert_eq!(paths[0], "/storage/usb0");
    assert_eq!(paths[MAX_MANAGED_VOLUMES - 1], "/storage/usb9");
}

#[test]
fn legacy_alias_points_at_primary_storage() {
    let harness = Harness::new(vec![managed(
        "/storage/sdcard0",
        "vfat",
        "/devices/platform/msm_sdcc.2/mmc_host",
        "sdcard0",
    )]);
    std::fs::create_dir_all(harness.host("/sdcard")).unwrap();

    harness.session.setup_legacy_storage_alias().unwrap();
    harness.session.setup_legacy_storage_alias().unwrap();

    assert_eq!(
        read_link(&harness.host("/sdcard")),
        Path::new("/storage/sdcard0")
    );
}

#[test]
fn legacy_alias_is_skipped_for_data_media() {
    let harness = Harness::new(vec![volume("/data", "ext4", "/dev/block/userdata")]);

    harness.session.setup_legacy_storage_alias().unwrap();

    assert!(harness.host("/sdcard").symlink_metadata().is_err());
}
