//! VFS 实例与文件/目录/路径操作分发
//!
//! [`Vfs`] 拥有挂载表、驱动注册表、描述符表和当前工作目录。
//! 所有元数据由一把任务互斥锁保护，锁只在查表和改表时持有，
//! 调用后端（可能阻塞）时从不持锁。

use alloc::string::String;
use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, Ordering};
use sync::Mutex;
use uapi::fcntl::{F_GETFL, F_SETFL, OpenFlags, SeekWhence};
use uapi::fs::{Stat, StatFs};

use crate::config::{DEVFS_NAME, DEVFS_PATH, VfsConfig};
use crate::devfs::DevFs;
use crate::fd_table::{DirStream, Expect, FdTable, FileKind, OpenObject};
use crate::mount::{MountFlags, MountKind, MountTable};
use crate::path::absolute_path;
use crate::{DirEntry, FsError};

/// 目录流句柄
///
/// 与文件描述符共用同一张表和编号空间，只能传给目录操作。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dir(i32);

impl Dir {
    /// 从原始编号构造
    pub const fn from_raw(handle: i32) -> Self {
        Self(handle)
    }

    /// 原始编号
    pub const fn as_raw(&self) -> i32 {
        self.0
    }
}

pub(crate) struct VfsState {
    pub(crate) mounts: MountTable,
    pub(crate) fds: FdTable,
}

/// 虚拟文件系统实例
pub struct Vfs {
    config: VfsConfig,
    pub(crate) state: Mutex<VfsState>,
    cwd: Mutex<String>,
    devfs: Arc<DevFs>,
    initialized: AtomicBool,
}

impl Default for Vfs {
    fn default() -> Self {
        Self::new()
    }
}

impl Vfs {
    /// 使用默认配置创建
    pub fn new() -> Self {
        Self::with_config(VfsConfig::default())
    }

    /// 使用指定配置创建
    pub fn with_config(config: VfsConfig) -> Self {
        Self {
            config,
            state: Mutex::new(VfsState {
                mounts: MountTable::new(config.max_mounts, config.max_drivers, config.max_mkfs),
                fds: FdTable::new(config.max_fds, config.fd_offset),
            }),
            cwd: Mutex::new(String::from("/")),
            devfs: Arc::new(DevFs::new()),
            initialized: AtomicBool::new(false),
        }
    }

    /// 运行时配置
    pub fn config(&self) -> &VfsConfig {
        &self.config
    }

    /// 设备文件系统，用于注册字符设备
    pub fn devfs(&self) -> &Arc<DevFs> {
        &self.devfs
    }

    /// 注册设备文件系统并挂载到 [`DEVFS_PATH`]
    ///
    /// 重复调用返回 [`FsError::AlreadyExists`]。
    pub fn init(&self) -> Result<(), FsError> {
        if self.initialized.swap(true, Ordering::AcqRel) {
            log::warn!("vfs: already initialized");
            return Err(FsError::AlreadyExists);
        }
        let result = self.register_driver(self.devfs.clone()).and_then(|()| {
            self.mount(
                None,
                DEVFS_PATH,
                DEVFS_NAME,
                MountFlags::DEVICE_TREE,
                None,
            )
        });
        if let Err(e) = result {
            log::error!("vfs: init failed: {:?}", e);
            self.initialized.store(false, Ordering::Release);
            return Err(e);
        }
        log::info!("vfs: initialized, devfs on {}", DEVFS_PATH);
        Ok(())
    }

    /// 以当前工作目录为基准构造规范化的绝对路径
    pub fn absolute_path(&self, path: &str) -> Result<String, FsError> {
        let cwd = self.cwd.lock();
        absolute_path(&cwd, path)
    }

    // ========== 文件操作 ==========

    /// 打开文件，返回描述符编号
    pub fn open(&self, path: &str, flags: OpenFlags) -> Result<i32, FsError> {
        let reservation = self.reserve_fd()?;
        let abs = self.absolute_path(path)?;
        let pin = self.resolve_and_pin(&abs)?;
        let rel = pin.relative(&abs);
        let kind = match pin.kind() {
            MountKind::DeviceTree => FileKind::Device,
            MountKind::Normal => FileKind::Regular,
        };
        let file = pin.fs().open(rel, flags)?;
        let fd = reservation.install(pin, rel, kind, flags, OpenObject::File(file));
        log::debug!("vfs: open {} -> fd {}", abs, fd);
        Ok(fd)
    }

    /// 关闭文件
    ///
    /// 后端关闭失败时仍会释放描述符，错误原样返回。
    pub fn close(&self, fd: i32) -> Result<(), FsError> {
        let guard = self.take_fd_for_close(fd, Expect::File)?;
        guard.file()?.close()
    }

    /// 读取
    pub fn read(&self, fd: i32, buf: &mut [u8]) -> Result<usize, FsError> {
        let guard = self.get_fd(fd, Expect::File)?;
        guard.file()?.read(buf)
    }

    /// 写入
    pub fn write(&self, fd: i32, buf: &[u8]) -> Result<usize, FsError> {
        let guard = self.get_fd(fd, Expect::File)?;
        guard.file()?.write(buf)
    }

    /// 设置读写位置
    pub fn lseek(&self, fd: i32, offset: i64, whence: SeekWhence) -> Result<u64, FsError> {
        let guard = self.get_fd(fd, Expect::File)?;
        guard.file()?.lseek(offset, whence)
    }

    /// 刷回缓存数据
    pub fn fsync(&self, fd: i32) -> Result<(), FsError> {
        let guard = self.get_fd(fd, Expect::File)?;
        guard.file()?.sync()
    }

    /// 设备控制
    pub fn ioctl(&self, fd: i32, request: u32, arg: usize) -> Result<isize, FsError> {
        let guard = self.get_fd(fd, Expect::File)?;
        guard.file()?.ioctl(request, arg)
    }

    /// 文件控制
    ///
    /// 只支持 `F_GETFL`（返回打开标志）和 `F_SETFL`（只改变 `O_NONBLOCK`）。
    pub fn fcntl(&self, fd: i32, cmd: i32, arg: usize) -> Result<isize, FsError> {
        let guard = self.get_fd(fd, Expect::File)?;
        match cmd {
            F_GETFL => Ok(guard.flags().bits() as isize),
            F_SETFL => {
                let nonblock = OpenFlags::from_bits_truncate(arg as u32)
                    .contains(OpenFlags::O_NONBLOCK);
                let flags = guard.update_flags(|mut flags| {
                    flags.set(OpenFlags::O_NONBLOCK, nonblock);
                    flags
                });
                guard.file()?.set_status_flags(flags);
                Ok(0)
            }
            _ => Err(FsError::NotSupported),
        }
    }

    /// 按描述符获取文件状态
    ///
    /// 通过描述符记录的路径重新解析，而不是询问打开对象。
    pub fn fstat(&self, fd: i32) -> Result<Stat, FsError> {
        let path = {
            let guard = self.get_fd(fd, Expect::File)?;
            guard.full_path()?
        };
        self.stat(&path)
    }

    // ========== 目录操作 ==========

    /// 打开目录流
    pub fn opendir(&self, path: &str) -> Result<Dir, FsError> {
        let reservation = self.reserve_fd()?;
        let abs = self.absolute_path(path)?;
        let pin = self.resolve_and_pin(&abs)?;
        let rel = pin.relative(&abs);
        let dir = pin.fs().opendir(rel, OpenFlags::empty())?;
        let stream = Arc::new(DirStream::new(dir));
        let handle = reservation.install(
            pin,
            rel,
            FileKind::Directory,
            OpenFlags::O_DIRECTORY,
            OpenObject::Dir(stream),
        );
        Ok(Dir(handle))
    }

    /// 关闭目录流
    pub fn closedir(&self, dir: Dir) -> Result<(), FsError> {
        let guard = self.take_fd_for_close(dir.0, Expect::Dir)?;
        guard.dir()?.dir().close()
    }

    /// 读取下一个目录项，遍历结束返回 `Ok(None)`
    pub fn readdir(&self, dir: Dir) -> Result<Option<DirEntry>, FsError> {
        let guard = self.get_fd(dir.0, Expect::Dir)?;
        let stream = guard.dir()?;
        let entry = stream.dir().readdir()?;
        if entry.is_some() {
            stream.cache(entry.as_ref());
        }
        Ok(entry)
    }

    /// 最近一次 readdir 得到的目录项
    pub fn current_dirent(&self, dir: Dir) -> Result<Option<DirEntry>, FsError> {
        let guard = self.get_fd(dir.0, Expect::Dir)?;
        Ok(guard.dir()?.current())
    }

    /// 设置目录遍历位置
    pub fn seekdir(&self, dir: Dir, offset: u64) -> Result<(), FsError> {
        let guard = self.get_fd(dir.0, Expect::Dir)?;
        guard.dir()?.dir().seekdir(offset)
    }

    /// 获取目录遍历位置
    pub fn telldir(&self, dir: Dir) -> Result<u64, FsError> {
        let guard = self.get_fd(dir.0, Expect::Dir)?;
        guard.dir()?.dir().telldir()
    }

    /// 回到目录开头
    pub fn rewinddir(&self, dir: Dir) -> Result<(), FsError> {
        self.seekdir(dir, 0)
    }

    // ========== 路径操作 ==========

    /// 获取文件状态
    pub fn stat(&self, path: &str) -> Result<Stat, FsError> {
        let abs = self.absolute_path(path)?;
        let pin = self.resolve_and_pin(&abs)?;
        pin.fs().stat(pin.relative(&abs))
    }

    /// 获取路径所在文件系统的统计信息，路径必须存在
    pub fn statfs(&self, path: &str) -> Result<StatFs, FsError> {
        self.stat(path)?;
        let abs = self.absolute_path(path)?;
        let pin = self.resolve_and_pin(&abs)?;
        pin.fs().statfs()
    }

    /// 检查路径是否存在，`mode` 目前不参与判断
    pub fn access(&self, path: &str, _mode: i32) -> Result<(), FsError> {
        self.stat(path).map(|_| ())
    }

    /// 删除文件
    pub fn unlink(&self, path: &str) -> Result<(), FsError> {
        let abs = self.absolute_path(path)?;
        let pin = self.resolve_and_pin(&abs)?;
        pin.fs().unlink(pin.relative(&abs))
    }

    /// 创建目录：以 `O_CREAT` 打开目录再立即关闭
    pub fn mkdir(&self, path: &str, _mode: u32) -> Result<(), FsError> {
        let abs = self.absolute_path(path)?;
        let pin = self.resolve_and_pin(&abs)?;
        let dir = pin.fs().opendir(pin.relative(&abs), OpenFlags::O_CREAT)?;
        dir.close()
    }

    /// 删除空目录，与 [`Vfs::unlink`] 相同
    pub fn rmdir(&self, path: &str) -> Result<(), FsError> {
        self.unlink(path)
    }

    /// 重命名，两端必须位于同一挂载点
    pub fn rename(&self, old: &str, new: &str) -> Result<(), FsError> {
        let old_abs = self.absolute_path(old)?;
        let new_abs = self.absolute_path(new)?;
        let old_pin = self.resolve_and_pin(&old_abs)?;
        let new_pin = self.resolve_and_pin(&new_abs)?;
        if old_pin.index() != new_pin.index() {
            log::warn!("vfs: rename across mounts: {} -> {}", old_abs, new_abs);
            return Err(FsError::NotFound);
        }
        old_pin
            .fs()
            .rename(old_pin.relative(&old_abs), new_pin.relative(&new_abs))
    }

    /// 切换当前工作目录，目标必须是可打开的目录
    pub fn chdir(&self, path: &str) -> Result<(), FsError> {
        let abs = self.absolute_path(path)?;
        self.probe_directory(&abs)?;
        *self.cwd.lock() = abs;
        Ok(())
    }

    /// 当前工作目录
    pub fn getcwd(&self) -> String {
        self.cwd.lock().clone()
    }
}
