//! POSIX 风格接口
//!
//! 包装全局 [`VFS`] 实例：失败时把 [`FsError`] 转换为正的 errno 写入当前任务，
//! 并返回 `-1`（返回句柄或目录项的函数返回 `None`）。

use alloc::string::String;
use alloc::sync::Arc;
use lazy_static::lazy_static;
use uapi::fcntl::{OpenFlags, SeekWhence};
use uapi::fs::{Stat, StatFs};
use uapi::poll::PollFd;
use uapi::select::FdSet;
use uapi::time::TimeVal;

use crate::devfs::CharDevice;
use crate::file_system::FsDriver;
use crate::mount::MountFlags;
use crate::ops::os_ops;
use crate::{Dir, DirEntry, FsError, Vfs};

lazy_static! {
    /// 全局 VFS 实例
    pub static ref VFS: Vfs = Vfs::new();
}

fn set_errno(err: FsError) {
    let errno = err.to_errno().saturating_neg();
    os_ops().set_errno(i32::try_from(errno).unwrap_or(i32::MAX));
}

fn ret_unit(result: Result<(), FsError>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            set_errno(e);
            -1
        }
    }
}

fn ret_size(result: Result<usize, FsError>) -> isize {
    match result {
        Ok(n) => n as isize,
        Err(e) => {
            set_errno(e);
            -1
        }
    }
}

fn ret_opt<T>(result: Result<T, FsError>) -> Option<T> {
    result.map_err(set_errno).ok()
}

/// 当前任务的 errno
pub fn errno() -> i32 {
    os_ops().errno()
}

// ========== 管理接口 ==========

/// 注册设备文件系统并挂载到 `/dev`
pub fn init() -> i32 {
    ret_unit(VFS.init())
}

/// 注册文件系统驱动
pub fn register_driver(driver: Arc<dyn FsDriver>) -> i32 {
    ret_unit(VFS.register_driver(driver))
}

/// 注册字符设备到 `/dev`
pub fn register_device(name: &str, dev: Arc<dyn CharDevice>) -> i32 {
    ret_unit(VFS.devfs().register_device(name, dev))
}

/// 挂载
pub fn mount(
    device: Option<&str>,
    path: &str,
    fs_name: &str,
    flags: MountFlags,
    data: Option<&str>,
) -> i32 {
    ret_unit(VFS.mount(device, path, fs_name, flags, data))
}

/// 卸载
pub fn unmount(path: &str) -> i32 {
    ret_unit(VFS.unmount(path))
}

/// 格式化设备
pub fn mkfs(fs_name: &str, device: &str) -> i32 {
    ret_unit(VFS.mkfs(fs_name, device))
}

// ========== 文件接口 ==========

/// 打开文件
pub fn open(path: &str, flags: OpenFlags) -> i32 {
    match VFS.open(path, flags) {
        Ok(fd) => fd,
        Err(e) => {
            set_errno(e);
            -1
        }
    }
}

/// 关闭文件
pub fn close(fd: i32) -> i32 {
    ret_unit(VFS.close(fd))
}

/// 读取
pub fn read(fd: i32, buf: &mut [u8]) -> isize {
    ret_size(VFS.read(fd, buf))
}

/// 写入
pub fn write(fd: i32, buf: &[u8]) -> isize {
    ret_size(VFS.write(fd, buf))
}

/// 设置读写位置，返回新位置
pub fn lseek(fd: i32, offset: i64, whence: i32) -> i64 {
    let result = SeekWhence::try_from(whence)
        .map_err(|_| FsError::InvalidArgument)
        .and_then(|whence| VFS.lseek(fd, offset, whence));
    match result {
        Ok(pos) => pos as i64,
        Err(e) => {
            set_errno(e);
            -1
        }
    }
}

/// 刷回缓存数据
pub fn fsync(fd: i32) -> i32 {
    ret_unit(VFS.fsync(fd))
}

/// 文件控制
pub fn fcntl(fd: i32, cmd: i32, arg: usize) -> isize {
    match VFS.fcntl(fd, cmd, arg) {
        Ok(ret) => ret,
        Err(e) => {
            set_errno(e);
            -1
        }
    }
}

/// 设备控制
pub fn ioctl(fd: i32, request: u32, arg: usize) -> isize {
    match VFS.ioctl(fd, request, arg) {
        Ok(ret) => ret,
        Err(e) => {
            set_errno(e);
            -1
        }
    }
}

/// 按描述符获取文件状态
pub fn fstat(fd: i32, buf: &mut Stat) -> i32 {
    ret_unit(VFS.fstat(fd).map(|st| *buf = st))
}

// ========== 目录接口 ==========

/// 创建目录
pub fn mkdir(path: &str, mode: u32) -> i32 {
    ret_unit(VFS.mkdir(path, mode))
}

/// 删除目录
pub fn rmdir(path: &str) -> i32 {
    ret_unit(VFS.rmdir(path))
}

/// 打开目录流
pub fn opendir(path: &str) -> Option<Dir> {
    ret_opt(VFS.opendir(path))
}

/// 关闭目录流
pub fn closedir(dir: Dir) -> i32 {
    ret_unit(VFS.closedir(dir))
}

/// 读取下一个目录项
///
/// 遍历结束返回 `None` 且不修改 errno。
pub fn readdir(dir: Dir) -> Option<DirEntry> {
    ret_opt(VFS.readdir(dir)).flatten()
}

/// 获取目录遍历位置
pub fn telldir(dir: Dir) -> i64 {
    match VFS.telldir(dir) {
        Ok(pos) => pos as i64,
        Err(e) => {
            set_errno(e);
            -1
        }
    }
}

/// 设置目录遍历位置
pub fn seekdir(dir: Dir, offset: u64) {
    if let Err(e) = VFS.seekdir(dir, offset) {
        set_errno(e);
    }
}

/// 回到目录开头
pub fn rewinddir(dir: Dir) {
    if let Err(e) = VFS.rewinddir(dir) {
        set_errno(e);
    }
}

// ========== 路径接口 ==========

/// 删除文件
pub fn unlink(path: &str) -> i32 {
    ret_unit(VFS.unlink(path))
}

/// 重命名
pub fn rename(old: &str, new: &str) -> i32 {
    ret_unit(VFS.rename(old, new))
}

/// 获取文件状态
pub fn stat(path: &str, buf: &mut Stat) -> i32 {
    ret_unit(VFS.stat(path).map(|st| *buf = st))
}

/// 获取文件系统统计信息
pub fn statfs(path: &str, buf: &mut StatFs) -> i32 {
    ret_unit(VFS.statfs(path).map(|st| *buf = st))
}

/// 检查路径是否存在
pub fn access(path: &str, mode: i32) -> i32 {
    ret_unit(VFS.access(path, mode))
}

/// 切换当前工作目录
pub fn chdir(path: &str) -> i32 {
    ret_unit(VFS.chdir(path))
}

/// 当前工作目录
pub fn getcwd() -> String {
    VFS.getcwd()
}

// ========== 就绪等待 ==========

/// 等待一组描述符就绪
pub fn poll(fds: &mut [PollFd], timeout_ms: i32) -> i32 {
    ret_size(VFS.poll(fds, timeout_ms)) as i32
}

/// 等待描述符位图就绪
pub fn select(
    nfds: usize,
    readfds: Option<&mut FdSet>,
    writefds: Option<&mut FdSet>,
    exceptfds: Option<&mut FdSet>,
    timeout: Option<&TimeVal>,
) -> i32 {
    ret_size(VFS.select(nfds, readfds, writefds, exceptfds, timeout)) as i32
}
