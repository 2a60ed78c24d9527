//! 计数信号量
//!
//! `post` 只使用原子操作，可以在中断上下文中调用；
//! `wait` 在计数为 0 时让出 CPU，直到被 post 或超时。

use core::sync::atomic::{AtomicUsize, Ordering};

use crate::sched_ops;

/// 等待超时设置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// 不等待，立即返回
    NoWait,
    /// 永久等待
    Forever,
    /// 最多等待指定毫秒数
    Millis(u64),
}

impl Timeout {
    /// 按 poll() 的约定转换：0 表示不等待，负数表示永久等待
    pub fn from_millis(ms: i64) -> Self {
        match ms {
            0 => Timeout::NoWait,
            ms if ms < 0 => Timeout::Forever,
            ms => Timeout::Millis(ms as u64),
        }
    }
}

/// 计数信号量
#[derive(Debug)]
pub struct Semaphore {
    count: AtomicUsize,
    max: usize,
}

impl Semaphore {
    /// 创建信号量，`max` 为计数上限
    pub const fn new(initial: usize, max: usize) -> Self {
        Self {
            count: AtomicUsize::new(if initial > max { max } else { initial }),
            max,
        }
    }

    /// 当前计数
    pub fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// 释放一个资源（V 操作）
    ///
    /// 计数已达上限时返回 false，计数保持不变。
    pub fn post(&self) -> bool {
        let mut current = self.count.load(Ordering::Relaxed);
        loop {
            if current >= self.max {
                return false;
            }
            match self.count.compare_exchange_weak(
                current,
                current + 1,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// 尝试获取一个资源，不阻塞
    pub fn try_wait(&self) -> bool {
        let mut current = self.count.load(Ordering::Acquire);
        while current > 0 {
            match self.count.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
        false
    }

    /// 获取一个资源（P 操作），超时返回 false
    pub fn wait(&self, timeout: Timeout) -> bool {
        if self.try_wait() {
            return true;
        }

        let deadline = match timeout {
            Timeout::NoWait => return false,
            Timeout::Forever => None,
            Timeout::Millis(ms) => Some(sched_ops().now_ms().saturating_add(ms)),
        };

        loop {
            if self.try_wait() {
                return true;
            }
            if let Some(deadline) = deadline {
                if sched_ops().now_ms() >= deadline {
                    // 超时前最后一次检查，避免错过刚好到达的 post
                    return self.try_wait();
                }
            }
            sched_ops().yield_now();
        }
    }
}
