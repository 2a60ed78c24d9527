//! 调度器相关操作的 Mock 实现
//!
//! 注意：这里不直接依赖 `sync` crate（避免循环依赖）。
//! `sync` crate 在 `cfg(test)` 下为这些类型实现其 trait（例如 `SchedOps`）。

use std::sync::OnceLock;
use std::time::Instant;

/// Mock 调度操作
///
/// 让出 CPU 映射为宿主线程的 `yield_now`，时钟取自进程内单调时钟。
pub struct MockSchedOps {
    epoch: OnceLock<Instant>,
}

impl MockSchedOps {
    pub const fn new() -> Self {
        Self {
            epoch: OnceLock::new(),
        }
    }

    pub fn yield_now(&self) {
        std::thread::yield_now();
    }

    pub fn now_ms(&self) -> u64 {
        let epoch = self.epoch.get_or_init(Instant::now);
        epoch.elapsed().as_millis() as u64
    }
}

impl Default for MockSchedOps {
    fn default() -> Self {
        Self::new()
    }
}

/// 全局 Mock 实例
pub static MOCK_SCHED_OPS: MockSchedOps = MockSchedOps::new();
