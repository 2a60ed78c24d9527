//! VFS 错误类型
//!
//! 定义了与 POSIX 兼容的文件系统错误码，可通过 [`FsError::to_errno()`] 转换为 errno。
//! VFS 内部一律以 `Result<T, FsError>` 传递错误，只有 [`crate::posix`] 层会把它写入 errno。

use uapi::errno;

/// VFS 错误类型
///
/// 各错误码对应标准 POSIX errno 值。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    // 文件/目录相关
    /// 文件或挂载点不存在 (-ENOENT)
    NotFound,
    /// 已存在 (-EEXIST)，包括重复注册的文件系统驱动
    AlreadyExists,
    /// 不是目录 (-ENOTDIR)
    NotDirectory,
    /// 是目录 (-EISDIR)
    IsDirectory,
    /// 目录非空 (-ENOTEMPTY)
    DirectoryNotEmpty,

    // 权限相关
    /// 权限被拒绝 (-EACCES)
    PermissionDenied,

    // 文件描述符相关
    /// 无效的文件描述符，或描述符类型与调用不符 (-EBADF)
    BadFileDescriptor,
    /// 描述符表已满 (-EMFILE)
    TooManyOpenFiles,

    // 参数相关
    /// 无效参数 (-EINVAL)
    InvalidArgument,
    /// 路径过长 (-ENAMETOOLONG)
    NameTooLong,

    // 文件系统相关
    /// 只读文件系统 (-EROFS)
    ReadOnlyFs,
    /// 表空间不足：挂载表或驱动注册表已满 (-ENOSPC)
    NoSpace,
    /// I/O 错误 (-EIO)
    IoError,
    /// 设备不存在 (-ENODEV)
    NoDevice,
    /// 资源忙：设备已挂载/正在格式化，或挂载点仍被引用 (-EBUSY)
    Busy,

    // 其他
    /// 非阻塞操作将阻塞 (-EAGAIN)
    WouldBlock,
    /// 后端未实现该操作 (-ENOTSUP)
    NotSupported,
    /// 等待超时 (-ETIMEDOUT)
    TimedOut,
    /// 后端返回的原始错误码（负数），原样透传
    Backend(isize),
}

impl FsError {
    /// 转换为错误码（负数）
    pub fn to_errno(&self) -> isize {
        let errno = match self {
            FsError::NotFound => errno::ENOENT,
            FsError::IoError => errno::EIO,
            FsError::BadFileDescriptor => errno::EBADF,
            FsError::WouldBlock => errno::EAGAIN,
            FsError::PermissionDenied => errno::EACCES,
            FsError::Busy => errno::EBUSY,
            FsError::AlreadyExists => errno::EEXIST,
            FsError::NoDevice => errno::ENODEV,
            FsError::NotDirectory => errno::ENOTDIR,
            FsError::IsDirectory => errno::EISDIR,
            FsError::InvalidArgument => errno::EINVAL,
            FsError::TooManyOpenFiles => errno::EMFILE,
            FsError::NoSpace => errno::ENOSPC,
            FsError::ReadOnlyFs => errno::EROFS,
            FsError::NameTooLong => errno::ENAMETOOLONG,
            FsError::DirectoryNotEmpty => errno::ENOTEMPTY,
            FsError::NotSupported => errno::ENOTSUP,
            FsError::TimedOut => errno::ETIMEDOUT,
            FsError::Backend(code) => {
                return if *code < 0 { *code } else { -*code };
            }
        };
        -(errno as isize)
    }
}
