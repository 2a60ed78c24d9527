//! 设备文件系统
//!
//! 把按名字注册的字符设备暴露为 `/dev/<name>`。每次打开维护独立的读写位置，
//! 读写时把位置传给设备并按返回的字节数前移。
//!
//! 只能挂载一次，不支持卸载、重命名、删除、格式化和 statfs。

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};
use sync::Mutex;
use uapi::fcntl::{OpenFlags, SeekWhence};
use uapi::fs::{DirentType, FileMode, Stat};

use crate::config::DEVFS_NAME;
use crate::file_system::{FileSystem, FsDriver};
use crate::mount::MountFlags;
use crate::ops::DeviceHandle;
use crate::poll::PollRequest;
use crate::{DirEntry, Directory, File, FsError};

/// 字符设备接口
pub trait CharDevice: Send + Sync {
    /// 打开设备
    fn open(&self, _flags: OpenFlags) -> Result<(), FsError> {
        Ok(())
    }

    /// 关闭设备
    fn close(&self) -> Result<(), FsError> {
        Ok(())
    }

    /// 从 `pos` 处读取
    fn read(&self, _pos: u64, _buf: &mut [u8]) -> Result<usize, FsError> {
        Err(FsError::NotSupported)
    }

    /// 向 `pos` 处写入
    fn write(&self, _pos: u64, _buf: &[u8]) -> Result<usize, FsError> {
        Err(FsError::NotSupported)
    }

    /// 设备控制
    fn ioctl(&self, _request: u32, _arg: usize) -> Result<isize, FsError> {
        Err(FsError::NotSupported)
    }

    /// 登记或注销就绪通知，语义同 [`File::poll`]
    fn poll(&self, _req: &PollRequest, _setup: bool) -> Result<(), FsError> {
        Err(FsError::NotSupported)
    }
}

struct DeviceEntry {
    name: String,
    dev: Arc<dyn CharDevice>,
}

/// 设备注册表，同时是名为 `"dev"` 的文件系统驱动
pub struct DevFs {
    devices: Arc<Mutex<Vec<DeviceEntry>>>,
    mounted: AtomicBool,
}

impl Default for DevFs {
    fn default() -> Self {
        Self::new()
    }
}

impl DevFs {
    /// 创建空的设备注册表
    pub fn new() -> Self {
        Self {
            devices: Arc::new(Mutex::new(Vec::new())),
            mounted: AtomicBool::new(false),
        }
    }

    /// 注册字符设备，重名返回 [`FsError::AlreadyExists`]
    pub fn register_device(&self, name: &str, dev: Arc<dyn CharDevice>) -> Result<(), FsError> {
        if name.is_empty() || name.contains('/') {
            return Err(FsError::InvalidArgument);
        }
        let mut devices = self.devices.lock();
        if devices.iter().any(|d| d.name == name) {
            log::warn!("devfs: device {} already registered", name);
            return Err(FsError::AlreadyExists);
        }
        devices.push(DeviceEntry {
            name: String::from(name),
            dev,
        });
        log::debug!("devfs: register device {}", name);
        Ok(())
    }
}

impl FsDriver for DevFs {
    fn name(&self) -> &str {
        DEVFS_NAME
    }

    fn mount(
        &self,
        _device: Option<DeviceHandle>,
        _flags: MountFlags,
        _data: Option<&str>,
    ) -> Result<Arc<dyn FileSystem>, FsError> {
        if self.mounted.swap(true, Ordering::AcqRel) {
            return Err(FsError::Busy);
        }
        Ok(Arc::new(DevFsMount {
            devices: self.devices.clone(),
        }))
    }
}

struct DevFsMount {
    devices: Arc<Mutex<Vec<DeviceEntry>>>,
}

impl DevFsMount {
    fn find(&self, path: &str) -> Option<Arc<dyn CharDevice>> {
        let name = path.strip_prefix('/')?;
        self.devices
            .lock()
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.dev.clone())
    }
}

impl FileSystem for DevFsMount {
    fn open(&self, path: &str, flags: OpenFlags) -> Result<Arc<dyn File>, FsError> {
        let dev = self.find(path).ok_or(FsError::NotFound)?;
        dev.open(flags)?;
        Ok(Arc::new(DevFile {
            dev,
            pos: Mutex::new(0),
        }))
    }

    fn opendir(&self, path: &str, _flags: OpenFlags) -> Result<Arc<dyn Directory>, FsError> {
        if path != "/" {
            return Err(FsError::NotDirectory);
        }
        Ok(Arc::new(DevDir {
            devices: self.devices.clone(),
            index: Mutex::new(0),
        }))
    }

    fn stat(&self, path: &str) -> Result<Stat, FsError> {
        let st_mode = if path == "/" {
            FileMode::S_IFDIR | FileMode::S_IRWXUGO
        } else {
            self.find(path).ok_or(FsError::NotFound)?;
            FileMode::S_IFCHR | FileMode::S_IRUGO | FileMode::S_IWUGO
        };
        Ok(Stat {
            st_mode,
            st_nlink: 1,
            ..Stat::default()
        })
    }
}

struct DevFile {
    dev: Arc<dyn CharDevice>,
    pos: Mutex<u64>,
}

impl File for DevFile {
    fn close(&self) -> Result<(), FsError> {
        self.dev.close()
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize, FsError> {
        let mut pos = self.pos.lock();
        let n = self.dev.read(*pos, buf)?;
        *pos += n as u64;
        Ok(n)
    }

    fn write(&self, buf: &[u8]) -> Result<usize, FsError> {
        let mut pos = self.pos.lock();
        let n = self.dev.write(*pos, buf)?;
        *pos += n as u64;
        Ok(n)
    }

    fn lseek(&self, offset: i64, whence: SeekWhence) -> Result<u64, FsError> {
        let mut pos = self.pos.lock();
        let base = match whence {
            SeekWhence::Set => 0,
            SeekWhence::Cur => *pos as i64,
            SeekWhence::End => return Err(FsError::InvalidArgument),
        };
        let new = base.checked_add(offset).ok_or(FsError::InvalidArgument)?;
        *pos = u64::try_from(new).map_err(|_| FsError::InvalidArgument)?;
        Ok(*pos)
    }

    fn ioctl(&self, request: u32, arg: usize) -> Result<isize, FsError> {
        self.dev.ioctl(request, arg)
    }

    fn poll(&self, req: &PollRequest, setup: bool) -> Result<(), FsError> {
        self.dev.poll(req, setup)
    }
}

struct DevDir {
    devices: Arc<Mutex<Vec<DeviceEntry>>>,
    index: Mutex<usize>,
}

impl Directory for DevDir {
    fn readdir(&self) -> Result<Option<DirEntry>, FsError> {
        let mut index = self.index.lock();
        let devices = self.devices.lock();
        let entry = devices
            .get(*index)
            .map(|d| DirEntry::new(&d.name, DirentType::Chr));
        if entry.is_some() {
            *index += 1;
        }
        Ok(entry)
    }

    fn seekdir(&self, offset: u64) -> Result<(), FsError> {
        *self.index.lock() = usize::try_from(offset).map_err(|_| FsError::InvalidArgument)?;
        Ok(())
    }

    fn telldir(&self) -> Result<u64, FsError> {
        Ok(*self.index.lock() as u64)
    }
}
