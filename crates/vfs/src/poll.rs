//! 就绪等待：poll 与 select
//!
//! 一次 `poll` 调用分三步：
//!
//! 1. 登记：设备描述符通过后端的 poll 钩子登记一个 [`PollRequest`]；
//!    普通文件总是就绪，直接通知；无效描述符和目录通知 `POLLNVAL`
//! 2. 等待：在计数信号量上等待任一通知或超时
//! 3. 注销：无论是否已触发，对每个登记过的描述符调用一次注销
//!
//! [`PollRequest::notify`] 只使用原子操作，可以在中断上下文中调用。
//! `select` 只是把三个位图转换成 poll 数组再转换回来。

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use sync::{Semaphore, Timeout};
use uapi::poll::{PollEvents, PollFd};
use uapi::select::{FD_SETSIZE, FdSet};
use uapi::time::TimeVal;

use crate::fd_table::{Expect, FdGuard, FileKind};
use crate::{FsError, Vfs};

struct PollSlot {
    revents: AtomicU16,
    notified: AtomicBool,
}

struct PollShared {
    sem: Semaphore,
    slots: Vec<PollSlot>,
}

impl PollShared {
    fn new(n: usize) -> Self {
        let mut slots = Vec::with_capacity(n);
        slots.resize_with(n, || PollSlot {
            revents: AtomicU16::new(0),
            notified: AtomicBool::new(false),
        });
        Self {
            sem: Semaphore::new(0, n.max(1)),
            slots,
        }
    }

    fn revents(&self, index: usize) -> PollEvents {
        PollEvents::from_bits_truncate(self.slots[index].revents.load(Ordering::Acquire))
    }
}

/// 一个描述符在一次 poll 调用中的等待登记
///
/// 后端在登记时保存它的克隆，就绪时调用 [`PollRequest::notify`]。
#[derive(Clone)]
pub struct PollRequest {
    shared: Arc<PollShared>,
    index: usize,
    events: PollEvents,
}

impl PollRequest {
    /// 调用方关心的事件
    pub fn events(&self) -> PollEvents {
        self.events
    }

    /// 报告就绪事件
    ///
    /// 只保留最后一次报告的事件；每个登记只唤醒等待方一次。
    pub fn notify(&self, revents: PollEvents) {
        let slot = &self.shared.slots[self.index];
        slot.revents.store(revents.bits(), Ordering::Release);
        if !slot.notified.swap(true, Ordering::AcqRel) {
            self.shared.sem.post();
        }
    }

    /// 是否与 `other` 是同一个登记
    pub fn same_as(&self, other: &PollRequest) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared) && self.index == other.index
    }
}

/// 对登记过的描述符逐个注销，返回第一个错误
fn teardown(registered: Vec<(FdGuard<'_>, PollRequest)>) -> Result<(), FsError> {
    let mut result = Ok(());
    for (guard, req) in registered {
        let ret = guard.file().and_then(|file| file.poll(&req, false));
        if let Err(e) = ret {
            log::warn!("vfs: poll deregister failed: {:?}", e);
            if result.is_ok() {
                result = Err(e);
            }
        }
    }
    result
}

impl Vfs {
    /// 等待一组描述符就绪
    ///
    /// `timeout_ms` 为 0 表示不等待，负数表示一直等待。
    /// 返回 `revents` 非空的条目数，超时返回 0。
    pub fn poll(&self, fds: &mut [PollFd], timeout_ms: i32) -> Result<usize, FsError> {
        let shared = Arc::new(PollShared::new(fds.len()));
        let mut registered = Vec::new();
        let mut watched = 0usize;

        for (index, entry) in fds.iter_mut().enumerate() {
            entry.revents = PollEvents::empty();
            if entry.fd < 0 || entry.events.is_empty() {
                continue;
            }
            watched += 1;
            let req = PollRequest {
                shared: shared.clone(),
                index,
                events: entry.events,
            };
            let guard = match self.get_fd(entry.fd, Expect::Any) {
                Ok(guard) => guard,
                Err(_) => {
                    req.notify(PollEvents::POLLNVAL);
                    continue;
                }
            };
            match guard.kind() {
                FileKind::Directory => req.notify(PollEvents::POLLNVAL),
                FileKind::Regular => {
                    req.notify(entry.events & (PollEvents::POLLIN | PollEvents::POLLOUT))
                }
                FileKind::Device => {
                    let setup = guard.file().and_then(|file| file.poll(&req, true));
                    if let Err(e) = setup {
                        log::warn!("vfs: poll register fd {} failed: {:?}", entry.fd, e);
                        // 已登记的部分仍需注销，注销错误只记录
                        let _ = teardown(registered);
                        return Err(e);
                    }
                    registered.push((guard, req));
                }
            }
        }

        if watched == 0 {
            return Err(FsError::InvalidArgument);
        }

        let signaled = shared.sem.wait(Timeout::from_millis(timeout_ms as i64));
        let result = teardown(registered);
        if !signaled {
            // 超时后、注销前到达的通知不计入
            return result.map(|()| 0);
        }

        let mut ready = 0usize;
        for (index, entry) in fds.iter_mut().enumerate() {
            if entry.fd < 0 || entry.events.is_empty() {
                continue;
            }
            let always = PollEvents::POLLERR | PollEvents::POLLHUP | PollEvents::POLLNVAL;
            entry.revents = shared.revents(index) & (entry.events | always);
            if !entry.revents.is_empty() {
                ready += 1;
            }
        }
        result.map(|()| ready)
    }

    /// 基于 [`Vfs::poll`] 的 select
    ///
    /// 返回三个位图中置位的总数，`timeout` 为 `None` 表示一直等待。
    pub fn select(
        &self,
        nfds: usize,
        mut readfds: Option<&mut FdSet>,
        mut writefds: Option<&mut FdSet>,
        mut exceptfds: Option<&mut FdSet>,
        timeout: Option<&TimeVal>,
    ) -> Result<usize, FsError> {
        if nfds > FD_SETSIZE {
            return Err(FsError::InvalidArgument);
        }

        let mut fds = Vec::new();
        let mut wanted = Vec::new();
        for fd in 0..nfds as i32 {
            let in_read = readfds.as_deref().is_some_and(|s| s.is_set(fd));
            let in_write = writefds.as_deref().is_some_and(|s| s.is_set(fd));
            let in_except = exceptfds.as_deref().is_some_and(|s| s.is_set(fd));
            if !(in_read || in_write || in_except) {
                continue;
            }
            let mut events = PollEvents::empty();
            if in_read {
                events |= PollEvents::POLLIN;
            }
            if in_write {
                events |= PollEvents::POLLOUT;
            }
            fds.push(PollFd::new(fd, events));
            wanted.push((in_read, in_write, in_except));
        }

        let timeout_ms = match timeout {
            Some(tv) if tv.tv_sec < 0 || !(0..1_000_000).contains(&tv.tv_usec) => {
                return Err(FsError::InvalidArgument);
            }
            Some(tv) => tv.to_millis().clamp(0, i32::MAX as i64) as i32,
            None => -1,
        };
        self.poll(&mut fds, timeout_ms)?;

        for set in [
            readfds.as_deref_mut(),
            writefds.as_deref_mut(),
            exceptfds.as_deref_mut(),
        ]
        .into_iter()
        .flatten()
        {
            set.zero();
        }
        for (entry, &(in_read, in_write, in_except)) in fds.iter().zip(&wanted) {
            let revents = entry.revents;
            if in_read && revents.intersects(PollEvents::POLLIN | PollEvents::POLLHUP) {
                if let Some(set) = readfds.as_deref_mut() {
                    set.set(entry.fd);
                }
            }
            if in_write && revents.contains(PollEvents::POLLOUT) {
                if let Some(set) = writefds.as_deref_mut() {
                    set.set(entry.fd);
                }
            }
            if in_except && revents.contains(PollEvents::POLLERR) {
                if let Some(set) = exceptfds.as_deref_mut() {
                    set.set(entry.fd);
                }
            }
        }

        let count = [&readfds, &writefds, &exceptfds]
            .into_iter()
            .flatten()
            .map(|s| s.count())
            .sum();
        Ok(count)
    }
}
