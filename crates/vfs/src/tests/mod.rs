// Unit tests for vfs.
//
// 宿主机上用 test-support 的 Mock 代替 RTOS 的调度、errno 和设备表，
// 文件系统与字符设备后端由本目录下的 ramfs/chardev 模拟。

extern crate std;

use std::sync::{Arc, Once};

use test_support::mock::os::MOCK_OS_OPS;
use test_support::mock::sched::MOCK_SCHED_OPS;

use crate::{DeviceHandle, MountFlags, OsOps, Vfs, VfsConfig, register_os_ops};

mod mount;

use ramfs::{Knobs, RamFsDriver};

struct TestOs;

impl sync::SchedOps for TestOs {
    fn yield_now(&self) {
        MOCK_SCHED_OPS.yield_now()
    }

    fn now_ms(&self) -> u64 {
        MOCK_SCHED_OPS.now_ms()
    }
}

impl OsOps for TestOs {
    fn errno(&self) -> i32 {
        MOCK_OS_OPS.errno()
    }

    fn set_errno(&self, errno: i32) {
        MOCK_OS_OPS.set_errno(errno)
    }

    fn find_device(&self, name: &str) -> Option<DeviceHandle> {
        MOCK_OS_OPS.find_device(name).map(DeviceHandle)
    }
}

static TEST_OS: TestOs = TestOs;
static INIT: Once = Once::new();

fn setup() {
    INIT.call_once(|| unsafe {
        sync::register_sched_ops(&TEST_OS);
        register_os_ops(&TEST_OS);
    });
}

/// 注册一个设备名，返回其句柄
fn add_device(name: &str) -> DeviceHandle {
    DeviceHandle(MOCK_OS_OPS.add_device(name))
}

/// devfs 挂在 `/dev`，ramfs 挂在 `/`
fn new_vfs() -> (Vfs, Arc<Knobs>) {
    new_vfs_with(VfsConfig::default())
}

fn new_vfs_with(config: VfsConfig) -> (Vfs, Arc<Knobs>) {
    setup();
    let vfs = Vfs::with_config(config);
    let knobs = Arc::new(Knobs::default());
    vfs.register_driver(Arc::new(RamFsDriver::new("ramfs", knobs.clone())))
        .unwrap();
    vfs.init().unwrap();
    vfs.mount(None, "/", "ramfs", MountFlags::empty(), None)
        .unwrap();
    (vfs, knobs)
}

/// 挂载点当前的引用计数
fn mount_refs(vfs: &Vfs, path: &str) -> usize {
    vfs.mounts()
        .into_iter()
        .find(|m| m.path == path)
        .map(|m| m.ref_count)
        .unwrap()
}
