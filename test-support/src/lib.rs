//! 测试支持 crate
//!
//! 提供 RTOS 协作方（调度、时钟、errno、设备表）的宿主机 Mock 实现和测试工具

pub mod mock;

use std::time::Duration;

/// 轮询等待条件成立，最多等待 `timeout`
///
/// 用于等待后台线程到达某个状态（例如已经进入阻塞调用）。
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    cond()
}
