//! VFS 容量与路径配置
//!
//! 默认值与板级配置保持一致，可通过 [`VfsConfig`] 在构造 [`crate::Vfs`] 时覆盖。

/// 挂载表容量
pub const VFS_MOUNTPOINT_MAX: usize = 4;

/// 文件系统驱动注册表容量
pub const VFS_FILESYSTEM_TYPES_MAX: usize = 4;

/// 描述符表容量（文件与目录共用）
pub const VFS_FD_MAX: usize = 16;

/// 同时进行 mkfs 的设备数上限
pub const VFS_MKFS_MAX: usize = VFS_MOUNTPOINT_MAX;

/// 描述符编号偏移，0/1/2 保留给标准输入输出
pub const VFS_FD_OFFSET: usize = 3;

/// 设备文件系统的挂载路径
pub const DEVFS_PATH: &str = "/dev";

/// 设备文件系统的驱动名
pub const DEVFS_NAME: &str = "dev";

/// 规范化后绝对路径的最大长度
pub const MAX_PATH_LEN: usize = 256;

/// VFS 运行时配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VfsConfig {
    /// 挂载表容量
    pub max_mounts: usize,
    /// 驱动注册表容量
    pub max_drivers: usize,
    /// 描述符表容量
    pub max_fds: usize,
    /// 同时 mkfs 的设备数上限
    pub max_mkfs: usize,
    /// 描述符编号偏移
    pub fd_offset: usize,
}

impl Default for VfsConfig {
    fn default() -> Self {
        Self {
            max_mounts: VFS_MOUNTPOINT_MAX,
            max_drivers: VFS_FILESYSTEM_TYPES_MAX,
            max_fds: VFS_FD_MAX,
            max_mkfs: VFS_MKFS_MAX,
            fd_offset: VFS_FD_OFFSET,
        }
    }
}
