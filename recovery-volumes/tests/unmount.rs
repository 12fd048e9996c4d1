mod common;

use common::Harness;
use recovery_testing::{Source, managed, volume};
use recovery_types::DaemonStatus;
use recovery_volumes::{ForbiddenOperation, VolumeError};

#[test]
fn ramdisk_cannot_be_unmounted() {
    let harness = Harness::new(vec![volume("/cache", "ext4", "/dev/block/cache")]);

    let result = harness.session.unmount("/tmp");

    assert!(matches!(
        result,
        Err(VolumeError::Forbidden {
            operation: ForbiddenOperation::Unmount,
            ..
        })
    ));
}

#[test]
fn unmounted_volume_is_a_no_op() {
    let harness = Harness::new(vec![volume("/cache", "ext4", "/dev/block/cache")]);

    harness.session.unmount("/cache").unwrap();

    assert!(harness.fakes.ledger.entries().is_empty());
}

#[test]
fn mounted_volume_is_detached() {
    let harness = Harness::new(vec![volume("/cache", "ext4", "/dev/block/cache")]);
    harness.session.mount("/cache", None).unwrap();

    harness.session.unmount("/cache").unwrap();

    assert!(!harness.fakes.mounted.is_mounted("/cache"));
    assert!(harness.fakes.ledger.saw(Source::Syscall, "umount /cache"));
}

#[test]
fn unresolved_paths_use_the_umount_binary() {
    let harness = Harness::new(vec![volume("/cache", "ext4", "/dev/block/cache")]);

    harness.session.unmount("/mnt/usb").unwrap();
    harness.fakes.commands.fail("umount /mnt/usb");
    let failed = harness.session.unmount("/mnt/usb");

    assert!(matches!(failed, Err(VolumeError::UnmountFailed { .. })));
    assert_eq!(harness.commands(), ["umount /mnt/usb", "umount /mnt/usb"]);
}

#[test]
fn daemon_volumes_are_force_detached() {
    let harness = Harness::new(vec![managed(
        "/storage/sdcard0",
        "vfat",
        "/devices/platform/msm_sdcc.2/mmc_host",
        "sdcard0",
    )]);
    harness.session.mount("/storage/sdcard0", None).unwrap();

    harness.session.unmount("/storage/sdcard0").unwrap();

    assert_eq!(
        harness.fakes.ledger.details(Source::Daemon),
        [
            "mount /storage/sdcard0 wait=true",
            "unmount /storage/sdcard0 force=true detach=true"
        ]
    );
    assert!(!harness.fakes.mounted.is_mounted("/storage/sdcard0"));
}

#[test]
fn daemon_refusal_is_unmount_failed() {
    let harness = Harness::new(vec![managed(
        "/storage/sdcard0",
        "vfat",
        "/devices/platform/msm_sdcc.2/mmc_host",
        "sdcard0",
    )]);
    harness.session.mount("/storage/sdcard0", None).unwrap();
    harness.fakes.daemon.respond("unmount", DaemonStatus(405));

    let result = harness.session.unmount("/storage/sdcard0");

    assert!(matches!(result, Err(VolumeError::UnmountFailed { .. })));
    assert!(harness.fakes.mounted.is_mounted("/storage/sdcard0"));
}

#[test]
fn snapshot_failure_is_unmount_failed() {
    let harness = Harness::new(vec![volume("/cache", "ext4", "/dev/block/cache")]);
    harness.fakes.mounts.fail_scan(true);

    let result = harness.session.unmount("/cache");

    assert!(matches!(result, Err(VolumeError::UnmountFailed { .. })));
}
