//! 同步原语
//!
//! 向 VFS 层提供阻塞式互斥锁和计数信号量。
//!
//! # 调度依赖
//!
//! 此 crate 通过 `SchedOps` trait 抽象 RTOS 调度器相关操作（让出 CPU、单调时钟）。
//! 使用前必须调用 `register_sched_ops` 注册实现。

#![no_std]

mod raw_mutex;
mod semaphore;

#[cfg(test)]
mod tests;

pub use raw_mutex::*;
pub use semaphore::*;

use core::sync::atomic::{AtomicUsize, Ordering};

/// 调度器相关操作的 trait
///
/// 由 RTOS 适配层实现并注册，提供任务让出和时钟
pub trait SchedOps: Send + Sync {
    /// 让出 CPU，使当前任务进入就绪队列尾部
    fn yield_now(&self);

    /// 获取单调递增的系统时间（毫秒）
    fn now_ms(&self) -> u64;
}

/// 全局调度操作实例（存储 fat pointer 的两个部分）
static SCHED_OPS_DATA: AtomicUsize = AtomicUsize::new(0);
static SCHED_OPS_VTABLE: AtomicUsize = AtomicUsize::new(0);

/// 注册调度操作实现
///
/// # Safety
/// 必须在单线程环境下调用，且只能调用一次
pub unsafe fn register_sched_ops(ops: &'static dyn SchedOps) {
    let ptr = ops as *const dyn SchedOps;
    // SAFETY: transmute 在这里是安全的，因为 fat pointer 的布局是 (data, vtable)
    let (data, vtable) =
        unsafe { core::mem::transmute::<*const dyn SchedOps, (usize, usize)>(ptr) };
    SCHED_OPS_DATA.store(data, Ordering::Release);
    SCHED_OPS_VTABLE.store(vtable, Ordering::Release);
}

/// 获取调度操作实例
#[inline]
pub(crate) fn sched_ops() -> &'static dyn SchedOps {
    let data = SCHED_OPS_DATA.load(Ordering::Acquire);
    let vtable = SCHED_OPS_VTABLE.load(Ordering::Acquire);
    if data == 0 {
        panic!("sync: SchedOps not registered, call register_sched_ops first");
    }
    // SAFETY: data 和 vtable 是通过 register_sched_ops 设置的有效指针
    unsafe { &*core::mem::transmute::<(usize, usize), *const dyn SchedOps>((data, vtable)) }
}
