//! poll() 相关定义

bitflags::bitflags! {
    /// poll 事件掩码
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PollEvents: u16 {
        const POLLIN   = 0x001;
        const POLLPRI  = 0x002;
        const POLLOUT  = 0x004;
        const POLLERR  = 0x008;
        const POLLHUP  = 0x010;
        const POLLNVAL = 0x020;
    }
}

/// poll() 的单个描述符请求
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollFd {
    pub fd: i32,
    pub events: PollEvents,
    pub revents: PollEvents,
}

impl PollFd {
    pub const fn new(fd: i32, events: PollEvents) -> Self {
        Self {
            fd,
            events,
            revents: PollEvents::empty(),
        }
    }
}
