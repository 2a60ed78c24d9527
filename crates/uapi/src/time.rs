//! 时间相关结构

/// 对应 C 的 `struct timeval`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeVal {
    pub tv_sec: i64,
    pub tv_usec: i64,
}

impl TimeVal {
    pub const fn new(tv_sec: i64, tv_usec: i64) -> Self {
        Self { tv_sec, tv_usec }
    }

    /// 转换为毫秒，不足 1ms 的部分向上取整
    pub fn to_millis(&self) -> i64 {
        self.tv_sec
            .saturating_mul(1000)
            .saturating_add(self.tv_usec.saturating_add(999) / 1000)
    }
}
