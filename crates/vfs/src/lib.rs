//! 虚拟文件系统分发层
//!
//! 此 crate 把多个具体文件系统后端挂载到任意路径，并通过一组 POSIX 风格的接口访问：
//!
//! - [`FsDriver`] / [`FileSystem`] - 文件系统驱动与挂载实例接口
//! - [`File`] / [`Directory`] - 打开对象接口
//! - [`Vfs`] - 挂载表、驱动注册表、描述符表的所有者，实现所有操作
//! - [`devfs`] - 内置的字符设备文件系统
//! - [`posix`] - 基于全局实例、以 errno 报错的接口
//!
//! 宿主 OS 需要在启动时调用 [`sync::register_sched_ops`] 和 [`register_os_ops`]。

#![no_std]
#![allow(clippy::module_inception)]

extern crate alloc;

pub mod config;
pub mod devfs;
pub mod error;
pub mod ops;
pub mod posix;

mod fd_table;
mod file;
mod file_system;
mod mount;
mod path;
mod poll;
mod vfs;

#[cfg(test)]
mod tests;

// Re-export ops
pub use ops::{DeviceHandle, OsOps, os_ops, register_os_ops};

// Re-export error
pub use error::FsError;

// Re-export config
pub use config::VfsConfig;

// Re-export file
pub use file::{DirEntry, Directory, File};

// Re-export file_system
pub use file_system::{FileSystem, FsDriver};

// Re-export mount
pub use mount::{MountFlags, MountInfo, MountKind};

// Re-export fd_table
pub use fd_table::{FdInfo, FileKind};

// Re-export path
pub use path::{
    PathComponent, absolute_path, join_mount_path, mount_covers, normalize_path, parse_path,
    relative_to_mount,
};

// Re-export poll
pub use poll::PollRequest;

// Re-export vfs
pub use vfs::{Dir, Vfs};

// Re-export devfs
pub use devfs::{CharDevice, DevFs};

// Re-export uapi types for convenience
pub use uapi::fcntl::{OpenFlags, SeekWhence};
pub use uapi::fs::{DirentType, FileMode, Stat, StatFs};
pub use uapi::poll::{PollEvents, PollFd};
pub use uapi::select::FdSet;
pub use uapi::time::TimeVal;
