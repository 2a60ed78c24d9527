//! 打开对象接口
//!
//! 文件系统后端为每次成功的 `open`/`opendir` 返回一个打开对象：
//!
//! - [`File`]：普通文件或设备文件，维护自己的读写位置
//! - [`Directory`]：目录流，维护自己的遍历位置
//!
//! 打开对象以 `Arc` 形式存放在描述符表中。同一对象上的并发调用由后端自行同步，
//! VFS 只保证描述符在调用期间不会被回收。除 `close` 外，所有方法默认返回
//! [`FsError::NotSupported`]。

use alloc::string::String;
use uapi::fcntl::{OpenFlags, SeekWhence};
use uapi::fs::DirentType;

use crate::FsError;
use crate::poll::PollRequest;

/// 文件操作的统一接口
pub trait File: Send + Sync {
    /// 关闭文件
    ///
    /// 无论返回什么，描述符都会被释放。
    fn close(&self) -> Result<(), FsError> {
        Ok(())
    }

    /// 从当前位置读取数据，返回读取的字节数
    fn read(&self, _buf: &mut [u8]) -> Result<usize, FsError> {
        Err(FsError::NotSupported)
    }

    /// 向当前位置写入数据，返回写入的字节数
    fn write(&self, _buf: &[u8]) -> Result<usize, FsError> {
        Err(FsError::NotSupported)
    }

    /// 设置读写位置，返回新位置
    fn lseek(&self, _offset: i64, _whence: SeekWhence) -> Result<u64, FsError> {
        Err(FsError::NotSupported)
    }

    /// 把缓存数据刷回存储
    fn sync(&self) -> Result<(), FsError> {
        Err(FsError::NotSupported)
    }

    /// 设备控制
    fn ioctl(&self, _request: u32, _arg: usize) -> Result<isize, FsError> {
        Err(FsError::NotSupported)
    }

    /// 登记（`setup == true`）或注销（`setup == false`）就绪通知
    ///
    /// 登记时若已就绪，应立即调用 [`PollRequest::notify`]。
    /// 注销一个未登记的请求必须是无害的。
    fn poll(&self, _req: &PollRequest, _setup: bool) -> Result<(), FsError> {
        Err(FsError::NotSupported)
    }

    /// 文件状态标志变化通知（F_SETFL）
    fn set_status_flags(&self, _flags: OpenFlags) {}
}

/// 目录项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// 名字
    pub name: String,
    /// 类型
    pub d_type: DirentType,
}

impl DirEntry {
    /// 创建目录项
    pub fn new(name: &str, d_type: DirentType) -> Self {
        Self {
            name: String::from(name),
            d_type,
        }
    }
}

/// 目录流接口
pub trait Directory: Send + Sync {
    /// 关闭目录流
    fn close(&self) -> Result<(), FsError> {
        Ok(())
    }

    /// 读取下一个目录项，遍历结束返回 `Ok(None)`
    fn readdir(&self) -> Result<Option<DirEntry>, FsError> {
        Err(FsError::NotSupported)
    }

    /// 设置遍历位置
    fn seekdir(&self, _offset: u64) -> Result<(), FsError> {
        Err(FsError::NotSupported)
    }

    /// 获取遍历位置
    fn telldir(&self) -> Result<u64, FsError> {
        Err(FsError::NotSupported)
    }
}
