//! 文件系统驱动与实例接口
//!
//! - [`FsDriver`]：按名字注册的驱动，负责挂载和格式化
//! - [`FileSystem`]：一次成功挂载得到的实例，路径均为相对挂载点、以 `/` 开头的后端路径

use alloc::sync::Arc;
use uapi::fcntl::OpenFlags;
use uapi::fs::{Stat, StatFs};

use crate::mount::MountFlags;
use crate::ops::DeviceHandle;
use crate::{Directory, File, FsError};

/// 文件系统驱动
pub trait FsDriver: Send + Sync {
    /// 驱动名，挂载和格式化时按名字查找
    fn name(&self) -> &str;

    /// 挂载，返回文件系统实例
    fn mount(
        &self,
        device: Option<DeviceHandle>,
        flags: MountFlags,
        data: Option<&str>,
    ) -> Result<Arc<dyn FileSystem>, FsError>;

    /// 在设备上创建文件系统
    fn mkfs(&self, _device: DeviceHandle) -> Result<(), FsError> {
        Err(FsError::NotSupported)
    }
}

/// 已挂载的文件系统实例
///
/// 除 `open` 外的方法都是可选的，未实现时返回 [`FsError::NotSupported`]。
pub trait FileSystem: Send + Sync {
    /// 卸载。失败时挂载点保持可用
    fn unmount(&self) -> Result<(), FsError> {
        Err(FsError::NotSupported)
    }

    /// 打开文件
    fn open(&self, path: &str, flags: OpenFlags) -> Result<Arc<dyn File>, FsError>;

    /// 打开目录。`flags` 含 `O_CREAT` 时应先创建目录
    fn opendir(&self, _path: &str, _flags: OpenFlags) -> Result<Arc<dyn Directory>, FsError> {
        Err(FsError::NotSupported)
    }

    /// 重命名（两端位于同一文件系统）
    fn rename(&self, _old: &str, _new: &str) -> Result<(), FsError> {
        Err(FsError::NotSupported)
    }

    /// 删除文件或空目录
    fn unlink(&self, _path: &str) -> Result<(), FsError> {
        Err(FsError::NotSupported)
    }

    /// 获取文件状态
    fn stat(&self, _path: &str) -> Result<Stat, FsError> {
        Err(FsError::NotSupported)
    }

    /// 获取文件系统统计信息
    fn statfs(&self) -> Result<StatFs, FsError> {
        Err(FsError::NotSupported)
    }
}
