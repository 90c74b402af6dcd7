//! Integration tests for the volume lifecycle and reference counting.
//!
//! Covers the mount/unmount state machine end to end against a recording
//! mounter:
//! - Reference counting: one external call per 0→1 / 1→0 transition
//! - Failure handling: nothing recorded on failed mount, count kept on failed unmount
//! - Queries: path, get, list, capabilities

use sshvol::{Scope, SshvolError};
use sshvol_test_utils::{MountCall, TestContext};

// ============================================================================
// REFERENCE COUNTING
// ============================================================================

#[test]
fn repeated_mounts_invoke_tool_once() {
    let ctx = TestContext::new();

    for expected in 1..=5 {
        ctx.driver.mount("alice@db1#data").unwrap();
        assert_eq!(ctx.driver.connections("alice@db1#data"), expected);
    }

    assert_eq!(
        ctx.mounter.mounts(),
        [MountCall {
            source: "alice@db1:data".to_string(),
            target: ctx.root.join("alice@db1#data"),
        }]
    );
}

#[test]
fn matched_unmounts_release_everything() {
    let ctx = TestContext::new();
    let path_before = ctx.driver.path("db1");

    for _ in 0..3 {
        ctx.driver.mount("db1").unwrap();
    }
    for remaining in (0..3).rev() {
        ctx.driver.unmount("db1").unwrap();
        assert_eq!(ctx.driver.connections("db1"), remaining);
    }

    assert_eq!(ctx.mounter.unmount_count(), 1);
    assert_eq!(ctx.mounter.unmounts(), [ctx.root.join("db1")]);
    assert!(ctx.driver.list().is_empty());
    assert_eq!(ctx.driver.path("db1"), path_before);
}

#[test]
fn remount_after_release_mounts_again() {
    let ctx = TestContext::new();

    ctx.driver.mount("db1").unwrap();
    ctx.driver.unmount("db1").unwrap();
    ctx.driver.mount("db1").unwrap();

    assert_eq!(ctx.mounter.mount_count(), 2);
    assert_eq!(ctx.driver.connections("db1"), 1);
}

#[test]
fn unmount_after_last_release_is_not_mounted() {
    // Zero-reference entries are deleted, not kept as tombstones
    let ctx = TestContext::new();

    ctx.driver.mount("db1").unwrap();
    ctx.driver.unmount("db1").unwrap();

    let err = ctx.driver.unmount("db1").unwrap_err();
    assert!(matches!(err, SshvolError::NotMounted(_)));
    assert_eq!(ctx.mounter.unmount_count(), 1);
}

#[test]
fn unmount_of_unknown_name_leaves_registry_alone() {
    let ctx = TestContext::new();
    ctx.driver.mount("db1").unwrap();

    let err = ctx.driver.unmount("db2").unwrap_err();
    assert!(matches!(err, SshvolError::NotMounted(ref p) if p == &ctx.root.join("db2")));

    assert_eq!(ctx.driver.list().len(), 1);
    assert_eq!(ctx.driver.connections("db1"), 1);
    assert_eq!(ctx.mounter.unmount_count(), 0);
}

// ============================================================================
// FAILURE HANDLING
// ============================================================================

#[test]
fn invalid_name_has_no_side_effects() {
    let ctx = TestContext::new();

    let err = ctx.driver.mount("bad#name#x").unwrap_err();

    assert!(matches!(err, SshvolError::InvalidName { .. }));
    assert!(!ctx.driver.path("bad#name#x").exists());
    assert!(!ctx.root.exists());
    assert_eq!(ctx.mounter.mount_count(), 0);
    assert!(ctx.driver.list().is_empty());
}

#[test]
fn names_escaping_root_are_rejected() {
    let ctx = TestContext::new();

    for name in ["..", "h#../../x"] {
        let err = ctx.driver.mount(name).unwrap_err();
        assert!(
            matches!(err, SshvolError::InvalidName { .. }),
            "{:?} should be rejected",
            name
        );
    }

    assert!(!ctx.root.exists());
    assert_eq!(ctx.mounter.mount_count(), 0);
    assert!(ctx.driver.list().is_empty());
}

#[test]
fn failed_mount_records_nothing_but_keeps_directory() {
    let ctx = TestContext::new();
    ctx.mounter
        .fail_mounts("ssh: connect to host db1 port 22: Connection refused");

    let err = ctx.driver.mount("db1").unwrap_err();

    assert!(err.to_string().contains("Connection refused"));
    assert_eq!(ctx.driver.connections("db1"), 0);
    assert!(ctx.driver.get("db1").is_err());
    assert!(ctx.driver.path("db1").is_dir());

    ctx.mounter.heal();
    ctx.driver.mount("db1").unwrap();
    assert_eq!(ctx.driver.connections("db1"), 1);
}

#[test]
fn file_at_mountpoint_is_not_a_directory() {
    let ctx = TestContext::new();
    std::fs::create_dir_all(&ctx.root).unwrap();
    std::fs::write(ctx.driver.path("db1"), "occupied").unwrap();

    let err = ctx.driver.mount("db1").unwrap_err();

    assert!(matches!(err, SshvolError::NotADirectory(_)));
    assert_eq!(ctx.mounter.mount_count(), 0);
}

#[test]
fn failed_unmount_keeps_reference_for_retry() {
    let ctx = TestContext::new();
    ctx.driver.mount("db1").unwrap();
    ctx.mounter.fail_unmounts("umount: /mnt/db1: target is busy.");

    let err = ctx.driver.unmount("db1").unwrap_err();
    assert!(matches!(err, SshvolError::UnmountFailed { .. }));
    assert_eq!(ctx.driver.connections("db1"), 1);
    assert_eq!(ctx.driver.get("db1").unwrap().name, "db1");

    ctx.mounter.heal();
    ctx.driver.unmount("db1").unwrap();
    assert!(ctx.driver.list().is_empty());
}

#[test]
fn failed_unmount_only_matters_for_last_reference() {
    let ctx = TestContext::new();
    ctx.driver.mount("db1").unwrap();
    ctx.driver.mount("db1").unwrap();
    ctx.mounter.fail_unmounts("busy");

    // 2 → 1 never reaches the tool
    ctx.driver.unmount("db1").unwrap();
    assert_eq!(ctx.driver.connections("db1"), 1);
}

// ============================================================================
// QUERIES
// ============================================================================

#[test]
fn list_is_empty_before_any_mount() {
    let ctx = TestContext::new();
    assert!(ctx.driver.list().is_empty());
}

#[test]
fn get_and_list_report_mountpoints() {
    let ctx = TestContext::new();
    ctx.driver.mount("bob@db2").unwrap();
    ctx.driver.mount("alice@db1#data").unwrap();

    let info = ctx.driver.get("bob@db2").unwrap();
    assert_eq!(info.mountpoint, ctx.root.join("bob@db2"));

    let listed: Vec<_> = ctx
        .driver
        .list()
        .into_iter()
        .map(|v| (v.name, v.mountpoint))
        .collect();
    assert_eq!(
        listed,
        [
            ("alice@db1#data".to_string(), ctx.root.join("alice@db1#data")),
            ("bob@db2".to_string(), ctx.root.join("bob@db2")),
        ]
    );
}

#[test]
fn path_does_not_depend_on_state() {
    let ctx = TestContext::new();
    let expected = ctx.root.join("alice@db1#data");

    assert_eq!(ctx.driver.path("alice@db1#data"), expected);
    ctx.driver.mount("alice@db1#data").unwrap();
    assert_eq!(ctx.driver.path("alice@db1#data"), expected);
    ctx.driver.unmount("alice@db1#data").unwrap();
    assert_eq!(ctx.driver.path("alice@db1#data"), expected);
}

#[test]
fn capabilities_are_configured() {
    let ctx = TestContext::new();
    assert_eq!(ctx.driver.capabilities().scope, Scope::Global);

    let ctx = TestContext::with_options(|mut options| {
        options.scope = Scope::Local;
        options
    });
    assert_eq!(ctx.driver.capabilities().scope, Scope::Local);
}

#[test]
fn create_and_remove_of_unknown_volume_succeed() {
    let ctx = TestContext::new();
    ctx.driver.create("db1").unwrap();
    ctx.driver.remove("db1").unwrap();
    assert_eq!(ctx.mounter.mount_count(), 0);
}

#[test]
fn remove_of_mounted_volume_is_refused() {
    let ctx = TestContext::new();
    ctx.driver.mount("db1").unwrap();

    let err = ctx.driver.remove("db1").unwrap_err();
    assert!(matches!(err, SshvolError::VolumeInUse { .. }));
    assert_eq!(ctx.driver.connections("db1"), 1);
    assert_eq!(ctx.mounter.unmount_count(), 0);
}
