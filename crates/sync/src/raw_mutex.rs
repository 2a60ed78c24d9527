//! 阻塞式互斥锁
//!
//! 基于原子标志实现，竞争时通过 [`SchedOps::yield_now`](crate::SchedOps::yield_now)
//! 让出 CPU 而不是忙等，因此持锁任务被抢占时其他任务仍能推进。
//!
//! 对外通过 `lock_api` 暴露为 [`Mutex`] / [`MutexGuard`]，解锁只能经由 guard 完成。

use core::sync::atomic::{AtomicBool, Ordering};

use crate::sched_ops;

/// 任务级原始互斥锁
///
/// 不可重入 (即同一任务不能嵌套调用 lock())。
#[derive(Debug)]
pub struct RawTaskMutex {
    locked: AtomicBool,
}

impl RawTaskMutex {
    /// 创建一个新的 RawTaskMutex 实例。
    pub const fn new() -> Self {
        RawTaskMutex {
            locked: AtomicBool::new(false),
        }
    }

    #[inline]
    fn try_acquire(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }
}

impl Default for RawTaskMutex {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: 通过 compare_exchange 保证同一时刻至多一个持有者，
// unlock 只会由 lock_api 的 guard 在持锁状态下调用。
unsafe impl lock_api::RawMutex for RawTaskMutex {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = RawTaskMutex::new();

    type GuardMarker = lock_api::GuardSend;

    fn lock(&self) {
        while !self.try_acquire() {
            // 先观察一次再让出，避免在锁刚释放时多做一次调度
            if !self.locked.load(Ordering::Relaxed) {
                continue;
            }
            sched_ops().yield_now();
        }
    }

    fn try_lock(&self) -> bool {
        self.try_acquire()
    }

    unsafe fn unlock(&self) {
        debug_assert!(self.locked.load(Ordering::Relaxed));
        self.locked.store(false, Ordering::Release);
    }

    fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}

/// 阻塞式互斥锁
///
/// # 示例
/// ```ignore
/// let lock = Mutex::new(0);
/// {
///     let mut guard = lock.lock(); // 获取锁
///     *guard += 1; // 访问和修改数据
/// } // 离开作用域，自动释放锁
/// ```
pub type Mutex<T> = lock_api::Mutex<RawTaskMutex, T>;

/// [`Mutex`] 的 RAII 保护器
pub type MutexGuard<'a, T> = lock_api::MutexGuard<'a, RawTaskMutex, T>;
