//! VFS 运行时依赖的 Mock 实现
//!
//! 注意：这里不直接依赖 `vfs` crate（避免循环依赖）。
//! `vfs` crate 在 `cfg(test)` 下为这些类型实现其 trait（例如 `OsOps`）。

use std::cell::Cell;
use std::sync::Mutex;

thread_local! {
    static ERRNO: Cell<i32> = const { Cell::new(0) };
}

/// Mock 的 OS 操作
///
/// errno 按宿主线程隔离（对应 RTOS 的按任务隔离）；
/// 设备表只增不减，句柄为注册顺序 + 1（0 保留为“无设备”）。
pub struct MockOsOps {
    devices: Mutex<Vec<String>>,
}

impl MockOsOps {
    pub const fn new() -> Self {
        Self {
            devices: Mutex::new(Vec::new()),
        }
    }

    pub fn errno(&self) -> i32 {
        ERRNO.with(|e| e.get())
    }

    pub fn set_errno(&self, errno: i32) {
        ERRNO.with(|e| e.set(errno));
    }

    /// 注册一个设备名，已存在时返回原有句柄
    pub fn add_device(&self, name: &str) -> usize {
        let mut devices = self.devices.lock().unwrap();
        if let Some(pos) = devices.iter().position(|d| d == name) {
            return pos + 1;
        }
        devices.push(name.to_string());
        devices.len()
    }

    pub fn find_device(&self, name: &str) -> Option<usize> {
        let devices = self.devices.lock().unwrap();
        devices.iter().position(|d| d == name).map(|pos| pos + 1)
    }
}

impl Default for MockOsOps {
    fn default() -> Self {
        Self::new()
    }
}

/// 全局 Mock 实例
pub static MOCK_OS_OPS: MockOsOps = MockOsOps::new();
