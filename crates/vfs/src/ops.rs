//! VFS 运行时操作 trait 定义和注册
//!
//! VFS 只依赖宿主 OS 的两类服务：任务级 errno 存取，以及按名字查找块设备。
//! 通过 trait 抽象与具体 OS 解耦，OS 在启动时调用 [`register_os_ops`] 注册实现。

use core::sync::atomic::{AtomicUsize, Ordering};

/// 宿主 OS 设备句柄
///
/// 只在 VFS 内做相等比较，用于判断设备是否已挂载或正在格式化。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle(pub usize);

/// VFS 运行时操作
pub trait OsOps: Send + Sync {
    /// 读取当前任务的 errno
    fn errno(&self) -> i32;

    /// 设置当前任务的 errno（正数）
    fn set_errno(&self, errno: i32);

    /// 按名字查找设备
    fn find_device(&self, name: &str) -> Option<DeviceHandle>;
}

// ========== OsOps 注册 ==========

static OS_OPS_DATA: AtomicUsize = AtomicUsize::new(0);
static OS_OPS_VTABLE: AtomicUsize = AtomicUsize::new(0);

/// 注册 OS 操作实现
///
/// # Safety
/// 必须在单线程环境下调用，且只能调用一次
pub unsafe fn register_os_ops(ops: &'static dyn OsOps) {
    let ptr = ops as *const dyn OsOps;
    // SAFETY: 将 fat pointer 拆分为 data 和 vtable 两部分存储
    let (data, vtable) = unsafe { core::mem::transmute::<*const dyn OsOps, (usize, usize)>(ptr) };
    OS_OPS_DATA.store(data, Ordering::Release);
    OS_OPS_VTABLE.store(vtable, Ordering::Release);
}

/// 获取已注册的 OS 操作实现
///
/// # Panics
/// 如果尚未调用 [`register_os_ops`] 注册实现，则 panic
#[inline]
pub fn os_ops() -> &'static dyn OsOps {
    let data = OS_OPS_DATA.load(Ordering::Acquire);
    let vtable = OS_OPS_VTABLE.load(Ordering::Acquire);
    if data == 0 {
        panic!("vfs: OsOps not registered");
    }
    // SAFETY: 重组 fat pointer
    unsafe { &*core::mem::transmute::<(usize, usize), *const dyn OsOps>((data, vtable)) }
}
