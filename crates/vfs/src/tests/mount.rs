extern crate std;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use test_support::wait_until;
use uapi::fcntl::OpenFlags;

use super::ramfs::{Knobs, RamFsDriver};
use super::{add_device, mount_refs, new_vfs, new_vfs_with, setup};
use crate::{FsError, MountFlags, MountKind, Vfs, VfsConfig};

const CREATE: OpenFlags = OpenFlags::O_CREAT.union(OpenFlags::O_RDWR);

#[test]
fn test_register_driver_duplicate_and_full() {
    setup();
    let vfs = Vfs::new();
    let knobs = Arc::new(Knobs::default());
    for name in ["a", "b", "c", "d"] {
        vfs.register_driver(Arc::new(RamFsDriver::new(name, knobs.clone())))
            .unwrap();
    }
    assert_eq!(
        vfs.register_driver(Arc::new(RamFsDriver::new("a", knobs.clone()))),
        Err(FsError::AlreadyExists)
    );
    assert_eq!(
        vfs.register_driver(Arc::new(RamFsDriver::new("e", knobs))),
        Err(FsError::NoSpace)
    );
}

#[test]
fn test_init_mounts_devfs() {
    let (vfs, _) = new_vfs();
    let mounts = vfs.mounts();
    let dev = mounts.iter().find(|m| m.path == "/dev").unwrap();
    assert_eq!(dev.fs_name, "dev");
    assert_eq!(dev.kind, MountKind::DeviceTree);
    assert!(dev.initialized);
    assert_eq!(vfs.init(), Err(FsError::AlreadyExists));
}

#[test]
fn test_mount_longest_prefix() {
    let (vfs, _) = new_vfs();
    vfs.mkdir("/data", 0o755).unwrap();
    vfs.mkdir("/data2", 0o755).unwrap();
    vfs.mount(None, "/data", "ramfs", MountFlags::empty(), None)
        .unwrap();

    // 写进 /data 挂载点的文件在根文件系统里看不到
    let fd = vfs.open("/data/a.txt", CREATE).unwrap();
    vfs.close(fd).unwrap();
    assert!(vfs.stat("/data/a.txt").is_ok());

    // /data2 仍属于根文件系统
    let fd = vfs.open("/data2/b.txt", CREATE).unwrap();
    assert_eq!(mount_refs(&vfs, "/"), 1);
    assert_eq!(mount_refs(&vfs, "/data"), 0);
    vfs.close(fd).unwrap();

    vfs.unmount("/data").unwrap();
    assert_eq!(vfs.stat("/data/a.txt"), Err(FsError::NotFound));
    assert!(vfs.stat("/data2/b.txt").is_ok());
}

#[test]
fn test_mount_requires_existing_directory() {
    let (vfs, _) = new_vfs();
    assert_eq!(
        vfs.mount(None, "/missing", "ramfs", MountFlags::empty(), None),
        Err(FsError::NotDirectory)
    );
    let fd = vfs.open("/plain", CREATE).unwrap();
    vfs.close(fd).unwrap();
    assert_eq!(
        vfs.mount(None, "/plain", "ramfs", MountFlags::empty(), None),
        Err(FsError::NotDirectory)
    );
}

#[test]
fn test_mount_errors() {
    let (vfs, _) = new_vfs();
    vfs.mkdir("/mnt", 0o755).unwrap();
    assert_eq!(
        vfs.mount(None, "/mnt", "nofs", MountFlags::empty(), None),
        Err(FsError::NotSupported)
    );
    assert_eq!(
        vfs.mount(Some("no-such-dev"), "/mnt", "ramfs", MountFlags::empty(), None),
        Err(FsError::NoDevice)
    );
    assert_eq!(
        vfs.mount(None, "/", "ramfs", MountFlags::empty(), None),
        Err(FsError::Busy)
    );
}

#[test]
fn test_mount_same_device_twice_is_busy() {
    let (vfs, _) = new_vfs();
    add_device("mnt-sd0");
    vfs.mkdir("/a", 0o755).unwrap();
    vfs.mkdir("/b", 0o755).unwrap();
    vfs.mount(Some("mnt-sd0"), "/a", "ramfs", MountFlags::empty(), None)
        .unwrap();
    assert_eq!(
        vfs.mount(Some("mnt-sd0"), "/b", "ramfs", MountFlags::empty(), None),
        Err(FsError::Busy)
    );
}

#[test]
fn test_mount_table_full() {
    let (vfs, _) = new_vfs();
    vfs.mkdir("/a", 0o755).unwrap();
    vfs.mkdir("/b", 0o755).unwrap();
    vfs.mkdir("/c", 0o755).unwrap();
    vfs.mount(None, "/a", "ramfs", MountFlags::empty(), None)
        .unwrap();
    vfs.mount(None, "/b", "ramfs", MountFlags::empty(), None)
        .unwrap();
    assert_eq!(
        vfs.mount(None, "/c", "ramfs", MountFlags::empty(), None),
        Err(FsError::NoSpace)
    );
}

#[test]
fn test_unmount_busy_while_open() {
    let (vfs, knobs) = new_vfs();
    vfs.mkdir("/data", 0o755).unwrap();
    vfs.mount(None, "/data", "ramfs", MountFlags::empty(), None)
        .unwrap();
    let fd = vfs.open("/data/x", CREATE).unwrap();
    assert_eq!(vfs.unmount("/data"), Err(FsError::Busy));
    assert_eq!(knobs.unmount_count.load(Ordering::Acquire), 0);
    vfs.close(fd).unwrap();
    vfs.unmount("/data").unwrap();
    assert_eq!(knobs.unmount_count.load(Ordering::Acquire), 1);
}

#[test]
fn test_unmount_requires_exact_path() {
    let (vfs, _) = new_vfs();
    vfs.mkdir("/data", 0o755).unwrap();
    vfs.mount(None, "/data", "ramfs", MountFlags::empty(), None)
        .unwrap();
    assert_eq!(vfs.unmount("/data/sub"), Err(FsError::NotFound));
    assert_eq!(vfs.unmount("/nothing"), Err(FsError::NotFound));
    vfs.unmount("/data/").unwrap();
}

#[test]
fn test_failed_unmount_restores_mount() {
    let (vfs, knobs) = new_vfs();
    vfs.mkdir("/data", 0o755).unwrap();
    vfs.mount(None, "/data", "ramfs", MountFlags::empty(), None)
        .unwrap();
    let fd = vfs.open("/data/keep", CREATE).unwrap();
    vfs.close(fd).unwrap();

    knobs.fail_unmount.store(true, Ordering::Release);
    assert_eq!(vfs.unmount("/data"), Err(FsError::IoError));

    // 挂载点仍然可用，数据仍在
    assert!(vfs.stat("/data/keep").is_ok());
    assert_eq!(mount_refs(&vfs, "/data"), 0);

    knobs.fail_unmount.store(false, Ordering::Release);
    vfs.unmount("/data").unwrap();
}

#[test]
fn test_devfs_cannot_be_unmounted() {
    let (vfs, _) = new_vfs();
    assert_eq!(vfs.unmount("/dev"), Err(FsError::NotSupported));
    assert!(vfs.mounts().iter().any(|m| m.path == "/dev"));
}

#[test]
fn test_mkfs_rejects_mounted_device() {
    let (vfs, knobs) = new_vfs();
    add_device("mkfs-sd1");
    vfs.mkdir("/sd", 0o755).unwrap();
    vfs.mount(Some("mkfs-sd1"), "/sd", "ramfs", MountFlags::empty(), None)
        .unwrap();
    assert_eq!(vfs.mkfs("ramfs", "mkfs-sd1"), Err(FsError::Busy));
    vfs.unmount("/sd").unwrap();
    vfs.mkfs("ramfs", "mkfs-sd1").unwrap();
    assert_eq!(knobs.mkfs_count.load(Ordering::Acquire), 1);
}

#[test]
fn test_mkfs_errors() {
    let (vfs, _) = new_vfs();
    add_device("mkfs-sd2");
    assert_eq!(vfs.mkfs("ramfs", "mkfs-missing"), Err(FsError::NoDevice));
    assert_eq!(vfs.mkfs("nofs", "mkfs-sd2"), Err(FsError::NotSupported));
    // devfs 驱动没有 mkfs
    assert_eq!(vfs.mkfs("dev", "mkfs-sd2"), Err(FsError::NotSupported));
}

#[test]
fn test_mount_rejected_while_formatting() {
    let (vfs, knobs) = new_vfs();
    add_device("mkfs-sd3");
    vfs.mkdir("/sd", 0o755).unwrap();
    knobs.hold_mkfs.store(true, Ordering::Release);

    thread::scope(|s| {
        let formatter = s.spawn(|| vfs.mkfs("ramfs", "mkfs-sd3"));
        assert!(wait_until(Duration::from_secs(2), || {
            knobs.in_mkfs.load(Ordering::Acquire)
        }));

        assert_eq!(
            vfs.mount(Some("mkfs-sd3"), "/sd", "ramfs", MountFlags::empty(), None),
            Err(FsError::Busy)
        );
        assert_eq!(vfs.mkfs("ramfs", "mkfs-sd3"), Err(FsError::Busy));

        knobs.hold_mkfs.store(false, Ordering::Release);
        formatter.join().unwrap().unwrap();
    });

    vfs.mount(Some("mkfs-sd3"), "/sd", "ramfs", MountFlags::empty(), None)
        .unwrap();
}

#[test]
fn test_mkfs_table_full() {
    let config = VfsConfig {
        max_mkfs: 1,
        ..VfsConfig::default()
    };
    let (vfs, knobs) = new_vfs_with(config);
    add_device("mkfs-sd4");
    add_device("mkfs-sd5");
    knobs.hold_mkfs.store(true, Ordering::Release);

    thread::scope(|s| {
        let formatter = s.spawn(|| vfs.mkfs("ramfs", "mkfs-sd4"));
        assert!(wait_until(Duration::from_secs(2), || {
            knobs.in_mkfs.load(Ordering::Acquire)
        }));
        assert_eq!(vfs.mkfs("ramfs", "mkfs-sd5"), Err(FsError::Busy));
        knobs.hold_mkfs.store(false, Ordering::Release);
        formatter.join().unwrap().unwrap();
    });
}

/// 注册一个独立开关的 ramfs 驱动
fn extra_driver(vfs: &Vfs, name: &'static str) -> Arc<Knobs> {
    let knobs = Arc::new(Knobs::default());
    vfs.register_driver(Arc::new(RamFsDriver::new(name, knobs.clone())))
        .unwrap();
    knobs
}

#[test]
fn test_failed_backend_mount_releases_slot() {
    let (vfs, _) = new_vfs();
    let knobs = extra_driver(&vfs, "flakyfs");
    vfs.mkdir("/m", 0o755).unwrap();
    knobs.fail_mount.store(true, Ordering::Release);

    // 次数多于挂载表容量，失败的槽位必须每次都释放
    for _ in 0..5 {
        assert_eq!(
            vfs.mount(None, "/m", "flakyfs", MountFlags::empty(), None),
            Err(FsError::IoError)
        );
    }
    assert_eq!(knobs.mount_count.load(Ordering::Acquire), 5);
    assert!(vfs.mounts().iter().all(|m| m.path != "/m"));

    knobs.fail_mount.store(false, Ordering::Release);
    vfs.mount(None, "/m", "flakyfs", MountFlags::empty(), None)
        .unwrap();
    assert!(vfs.mounts().iter().any(|m| m.path == "/m" && m.initialized));
}

#[test]
fn test_mount_in_progress_is_not_visible() {
    let (vfs, _) = new_vfs();
    let knobs = extra_driver(&vfs, "slowfs");
    vfs.mkdir("/m", 0o755).unwrap();
    let fd = vfs.open("/m/under", CREATE).unwrap();
    vfs.close(fd).unwrap();
    knobs.hold_mount.store(true, Ordering::Release);

    thread::scope(|s| {
        let mounter = s.spawn(|| vfs.mount(None, "/m", "slowfs", MountFlags::empty(), None));
        assert!(wait_until(Duration::from_secs(2), || {
            knobs.in_mount.load(Ordering::Acquire)
        }));

        // 槽位已占用但未初始化
        let info = vfs.mounts().into_iter().find(|m| m.path == "/m").unwrap();
        assert!(!info.initialized);
        // 路径仍解析到根文件系统
        assert!(vfs.stat("/m/under").is_ok());
        assert_eq!(vfs.unmount("/m"), Err(FsError::NotFound));
        assert_eq!(
            vfs.mount(None, "/m", "ramfs", MountFlags::empty(), None),
            Err(FsError::Busy)
        );

        knobs.hold_mount.store(false, Ordering::Release);
        mounter.join().unwrap().unwrap();
    });

    assert_eq!(vfs.stat("/m/under"), Err(FsError::NotFound));
    vfs.unmount("/m").unwrap();
    assert!(vfs.stat("/m/under").is_ok());
}
