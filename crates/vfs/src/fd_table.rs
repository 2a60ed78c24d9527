//! 描述符表
//!
//! 文件与目录共用一张固定容量的表。对外的描述符编号为 `槽位下标 + fd_offset`，
//! 0/1/2 留给标准输入输出。
//!
//! 每个槽位带引用计数：
//!
//! - 打开成功后计数为 1（描述符本身的引用）
//! - 每次读写等操作期间通过 [`FdGuard`] 额外持有一个引用
//! - `close` 把槽位标记为关闭中，之后的查找一律失败；最后一个引用释放时
//!   槽位被回收，同时释放对挂载点的引用
//!
//! 分配和打开分两步：先预留槽位（[`FdReservation`]），后端打开成功后再安装描述符，
//! 失败时预留自动撤销。

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use sync::Mutex;
use uapi::fcntl::OpenFlags;

use crate::mount::MountPin;
use crate::path::join_mount_path;
use crate::{DirEntry, Directory, File, FsError, Vfs};

/// 描述符类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// 普通文件
    Regular,
    /// 目录流
    Directory,
    /// 设备文件（位于设备树挂载点下）
    Device,
}

/// 目录流及其当前目录项缓存
pub(crate) struct DirStream {
    dir: Arc<dyn Directory>,
    current: Mutex<Option<DirEntry>>,
}

impl DirStream {
    pub(crate) fn new(dir: Arc<dyn Directory>) -> Self {
        Self {
            dir,
            current: Mutex::new(None),
        }
    }

    pub(crate) fn dir(&self) -> &Arc<dyn Directory> {
        &self.dir
    }

    pub(crate) fn cache(&self, entry: Option<&DirEntry>) {
        *self.current.lock() = entry.cloned();
    }

    /// 最近一次 readdir 得到的目录项
    pub(crate) fn current(&self) -> Option<DirEntry> {
        self.current.lock().clone()
    }
}

/// 打开对象
#[derive(Clone)]
pub(crate) enum OpenObject {
    File(Arc<dyn File>),
    Dir(Arc<DirStream>),
}

pub(crate) struct Descriptor {
    mount: usize,
    path: String,
    kind: FileKind,
    flags: OpenFlags,
    object: OpenObject,
}

struct FdSlot {
    ref_count: usize,
    closing: bool,
    /// `None` 表示已预留但尚未安装
    desc: Option<Descriptor>,
}

/// 查找描述符时期望的类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Expect {
    /// 普通文件或设备文件
    File,
    /// 目录流
    Dir,
    /// 任意已安装的描述符
    Any,
}

impl Expect {
    fn accepts(self, kind: FileKind) -> bool {
        match self {
            Expect::File => kind != FileKind::Directory,
            Expect::Dir => kind == FileKind::Directory,
            Expect::Any => true,
        }
    }
}

/// 打开描述符快照，用于诊断
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FdInfo {
    /// 描述符编号
    pub fd: i32,
    /// 完整的绝对路径
    pub path: String,
    /// 描述符类型
    pub kind: FileKind,
    /// 打开标志
    pub flags: OpenFlags,
    /// 当前引用计数
    pub ref_count: usize,
    /// 是否正在关闭
    pub closing: bool,
}

pub(crate) struct FdTable {
    slots: Vec<Option<FdSlot>>,
    offset: usize,
}

impl FdTable {
    pub(crate) fn new(max_fds: usize, offset: usize) -> Self {
        let mut slots = Vec::with_capacity(max_fds);
        slots.resize_with(max_fds, || None);
        Self { slots, offset }
    }

    fn handle(&self, index: usize) -> i32 {
        (index + self.offset) as i32
    }

    fn index(&self, fd: i32) -> Option<usize> {
        let fd = usize::try_from(fd).ok()?;
        let index = fd.checked_sub(self.offset)?;
        (index < self.slots.len()).then_some(index)
    }

    fn reserve(&mut self) -> Result<usize, FsError> {
        let index = self
            .slots
            .iter()
            .position(|s| s.is_none())
            .ok_or(FsError::TooManyOpenFiles)?;
        self.slots[index] = Some(FdSlot {
            ref_count: 1,
            closing: false,
            desc: None,
        });
        Ok(index)
    }

    /// 查找并加引用；`close` 为真时同时把槽位标记为关闭中
    fn retain(
        &mut self,
        fd: i32,
        expect: Expect,
        close: bool,
    ) -> Result<(usize, FileKind, OpenObject), FsError> {
        let index = self.index(fd).ok_or(FsError::BadFileDescriptor)?;
        let slot = self.slots[index]
            .as_mut()
            .ok_or(FsError::BadFileDescriptor)?;
        if slot.closing {
            return Err(FsError::BadFileDescriptor);
        }
        let desc = slot.desc.as_ref().ok_or(FsError::BadFileDescriptor)?;
        if !expect.accepts(desc.kind) {
            return Err(FsError::BadFileDescriptor);
        }
        let found = (index, desc.kind, desc.object.clone());
        slot.ref_count += 1;
        slot.closing = close;
        Ok(found)
    }

    /// 释放 `n` 个引用，计数归零时回收槽位并返回其中的描述符
    fn release(&mut self, index: usize, n: usize) -> Option<Descriptor> {
        let slot = self.slots[index].as_mut()?;
        assert!(slot.ref_count >= n, "vfs: fd ref count underflow");
        slot.ref_count -= n;
        if slot.ref_count != 0 {
            return None;
        }
        self.slots[index].take().and_then(|s| s.desc)
    }

    fn descriptor_mut(&mut self, index: usize) -> Option<&mut Descriptor> {
        self.slots[index].as_mut()?.desc.as_mut()
    }
}

/// 预留的描述符槽位，未安装就 drop 时自动撤销
pub(crate) struct FdReservation<'a> {
    vfs: &'a Vfs,
    index: usize,
    armed: bool,
}

impl FdReservation<'_> {
    /// 安装描述符，接管挂载点引用，返回描述符编号
    pub(crate) fn install(
        mut self,
        pin: MountPin<'_>,
        path: &str,
        kind: FileKind,
        flags: OpenFlags,
        object: OpenObject,
    ) -> i32 {
        let desc = Descriptor {
            mount: pin.into_index(),
            path: String::from(path),
            kind,
            flags,
            object,
        };
        let mut state = self.vfs.state.lock();
        let fds = &mut state.fds;
        if let Some(slot) = fds.slots[self.index].as_mut() {
            slot.desc = Some(desc);
        }
        self.armed = false;
        fds.handle(self.index)
    }
}

impl Drop for FdReservation<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.vfs.state.lock().fds.slots[self.index] = None;
        }
    }
}

/// 操作期间对描述符的引用，drop 时释放
pub(crate) struct FdGuard<'a> {
    vfs: &'a Vfs,
    index: usize,
    releases: usize,
    kind: FileKind,
    object: OpenObject,
}

impl FdGuard<'_> {
    pub(crate) fn kind(&self) -> FileKind {
        self.kind
    }

    pub(crate) fn file(&self) -> Result<&Arc<dyn File>, FsError> {
        match &self.object {
            OpenObject::File(file) => Ok(file),
            OpenObject::Dir(_) => Err(FsError::BadFileDescriptor),
        }
    }

    pub(crate) fn dir(&self) -> Result<&Arc<DirStream>, FsError> {
        match &self.object {
            OpenObject::Dir(dir) => Ok(dir),
            OpenObject::File(_) => Err(FsError::BadFileDescriptor),
        }
    }

    /// 当前打开标志
    pub(crate) fn flags(&self) -> OpenFlags {
        let mut state = self.vfs.state.lock();
        state
            .fds
            .descriptor_mut(self.index)
            .map(|d| d.flags)
            .unwrap_or_default()
    }

    /// 在锁内修改打开标志，返回新标志
    pub(crate) fn update_flags(&self, f: impl FnOnce(OpenFlags) -> OpenFlags) -> OpenFlags {
        let mut state = self.vfs.state.lock();
        match state.fds.descriptor_mut(self.index) {
            Some(desc) => {
                desc.flags = f(desc.flags);
                desc.flags
            }
            None => OpenFlags::empty(),
        }
    }

    /// 描述符对应的完整绝对路径
    pub(crate) fn full_path(&self) -> Result<String, FsError> {
        let mut state = self.vfs.state.lock();
        let (mount, path) = match state.fds.descriptor_mut(self.index) {
            Some(desc) => (desc.mount, desc.path.clone()),
            None => return Err(FsError::BadFileDescriptor),
        };
        let mount_path = state
            .mounts
            .path_of(mount)
            .ok_or(FsError::BadFileDescriptor)?;
        Ok(join_mount_path(mount_path, &path))
    }
}

impl Drop for FdGuard<'_> {
    fn drop(&mut self) {
        let released = {
            let mut state = self.vfs.state.lock();
            let released = state.fds.release(self.index, self.releases);
            if let Some(desc) = &released {
                state.mounts.unpin(desc.mount);
            }
            released
        };
        // 打开对象在锁外析构
        drop(released);
    }
}

impl Vfs {
    /// 预留一个描述符槽位
    pub(crate) fn reserve_fd(&self) -> Result<FdReservation<'_>, FsError> {
        let index = self.state.lock().fds.reserve()?;
        Ok(FdReservation {
            vfs: self,
            index,
            armed: true,
        })
    }

    /// 查找描述符并在操作期间持有引用
    pub(crate) fn get_fd(&self, fd: i32, expect: Expect) -> Result<FdGuard<'_>, FsError> {
        let (index, kind, object) = self.state.lock().fds.retain(fd, expect, false)?;
        Ok(FdGuard {
            vfs: self,
            index,
            releases: 1,
            kind,
            object,
        })
    }

    /// 查找描述符并标记为关闭中
    ///
    /// 返回的 guard 在 drop 时同时释放描述符本身的引用。
    pub(crate) fn take_fd_for_close(
        &self,
        fd: i32,
        expect: Expect,
    ) -> Result<FdGuard<'_>, FsError> {
        let (index, kind, object) = self.state.lock().fds.retain(fd, expect, true)?;
        Ok(FdGuard {
            vfs: self,
            index,
            releases: 2,
            kind,
            object,
        })
    }

    /// 当前描述符表快照（不含仅预留的槽位）
    pub fn open_descriptors(&self) -> Vec<FdInfo> {
        let state = self.state.lock();
        let fds = &state.fds;
        let mut out = Vec::new();
        for (index, slot) in fds.slots.iter().enumerate() {
            let Some(slot) = slot else { continue };
            let Some(desc) = &slot.desc else { continue };
            let path = match state.mounts.path_of(desc.mount) {
                Some(mount) => join_mount_path(mount, &desc.path),
                None => desc.path.clone(),
            };
            out.push(FdInfo {
                fd: fds.handle(index),
                path,
                kind: desc.kind,
                flags: desc.flags,
                ref_count: slot.ref_count,
                closing: slot.closing,
            });
        }
        out
    }
}
