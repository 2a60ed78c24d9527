//! 挂载表与文件系统驱动注册表
//!
//! 挂载表是固定容量的槽位数组，每个槽位记录挂载路径、设备、驱动名和文件系统实例。
//! 一次挂载分两步完成：先在锁内预留槽位（`fs == None`，解析时不可见），
//! 再在锁外调用驱动的 `mount`，成功后才填入实例。
//!
//! 路径解析采用最长前缀匹配，且只在组件边界上匹配（`/data` 不覆盖 `/data2`）。
//! 解析成功会给挂载点加引用（[`MountPin`]），引用不为零时不能卸载。

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use bitflags::bitflags;
use uapi::fcntl::OpenFlags;

use crate::file_system::{FileSystem, FsDriver};
use crate::ops::{DeviceHandle, os_ops};
use crate::path::{mount_covers, relative_to_mount};
use crate::{FsError, Vfs};

bitflags! {
    /// 挂载标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MountFlags: u32 {
        /// 只读挂载，由驱动解释
        const RDONLY = 1 << 0;
        /// 设备树挂载：跳过挂载点目录探测，打开的文件记为设备文件
        const DEVICE_TREE = 1 << 16;
    }
}

/// 挂载点类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountKind {
    /// 普通文件系统
    Normal,
    /// 设备文件系统
    DeviceTree,
}

/// 挂载点快照，用于诊断
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountInfo {
    /// 挂载路径
    pub path: String,
    /// 驱动名
    pub fs_name: String,
    /// 底层设备
    pub device: Option<DeviceHandle>,
    /// 挂载点类型
    pub kind: MountKind,
    /// 当前引用计数
    pub ref_count: usize,
    /// 驱动挂载是否已完成
    pub initialized: bool,
}

pub(crate) struct MountSlot {
    path: String,
    fs_name: String,
    device: Option<DeviceHandle>,
    kind: MountKind,
    fs: Option<Arc<dyn FileSystem>>,
    ref_count: usize,
}

impl MountSlot {
    fn info(&self) -> MountInfo {
        MountInfo {
            path: self.path.clone(),
            fs_name: self.fs_name.clone(),
            device: self.device,
            kind: self.kind,
            ref_count: self.ref_count,
            initialized: self.fs.is_some(),
        }
    }
}

/// 挂载表本体，只在 [`Vfs`] 的元数据锁内访问
pub(crate) struct MountTable {
    slots: Vec<Option<MountSlot>>,
    drivers: Vec<Option<Arc<dyn FsDriver>>>,
    formatting: Vec<Option<DeviceHandle>>,
}

impl MountTable {
    pub(crate) fn new(max_mounts: usize, max_drivers: usize, max_mkfs: usize) -> Self {
        let mut slots = Vec::with_capacity(max_mounts);
        slots.resize_with(max_mounts, || None);
        let mut drivers = Vec::with_capacity(max_drivers);
        drivers.resize_with(max_drivers, || None);
        let mut formatting = Vec::with_capacity(max_mkfs);
        formatting.resize_with(max_mkfs, || None);
        Self {
            slots,
            drivers,
            formatting,
        }
    }

    fn driver(&self, name: &str) -> Option<Arc<dyn FsDriver>> {
        self.drivers
            .iter()
            .flatten()
            .find(|d| d.name() == name)
            .cloned()
    }

    /// 精确匹配路径，包括尚未完成挂载的槽位
    fn find_by_path(&self, path: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.as_ref().is_some_and(|s| s.path == path))
    }

    fn device_mounted(&self, dev: DeviceHandle) -> bool {
        self.slots
            .iter()
            .flatten()
            .any(|s| s.device == Some(dev))
    }

    fn device_formatting(&self, dev: DeviceHandle) -> bool {
        self.formatting.iter().any(|d| *d == Some(dev))
    }

    /// 最长前缀匹配，只考虑已完成挂载的槽位
    fn resolve(&self, path: &str) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;
        for (index, slot) in self.slots.iter().enumerate() {
            let Some(slot) = slot else { continue };
            if slot.fs.is_none() || !mount_covers(&slot.path, path) {
                continue;
            }
            if best.is_none_or(|(_, len)| slot.path.len() > len) {
                best = Some((index, slot.path.len()));
            }
        }
        best.map(|(index, _)| index)
    }

    pub(crate) fn path_of(&self, index: usize) -> Option<&str> {
        self.slots
            .get(index)
            .and_then(|s| s.as_ref())
            .map(|s| s.path.as_str())
    }

    pub(crate) fn unpin(&mut self, index: usize) {
        let slot = self
            .slots
            .get_mut(index)
            .and_then(|s| s.as_mut());
        match slot {
            Some(slot) => {
                assert!(slot.ref_count > 0, "vfs: mount ref count underflow");
                slot.ref_count -= 1;
            }
            None => panic!("vfs: unpin of empty mount slot {}", index),
        }
    }

    /// 把槽位放回表中，优先使用原来的位置
    fn restore(&mut self, index: usize, slot: MountSlot) -> Result<(), MountSlot> {
        if self.find_by_path(&slot.path).is_some() {
            return Err(slot);
        }
        if self.slots[index].is_none() {
            self.slots[index] = Some(slot);
            return Ok(());
        }
        match self.slots.iter_mut().find(|s| s.is_none()) {
            Some(free) => {
                *free = Some(slot);
                Ok(())
            }
            None => Err(slot),
        }
    }
}

/// 挂载点引用
///
/// 持有期间挂载点不能被卸载，drop 时自动释放引用。
/// 打开文件成功后通过 [`MountPin::into_index`] 把引用转交给描述符。
pub(crate) struct MountPin<'a> {
    vfs: &'a Vfs,
    index: usize,
    prefix_len: usize,
    kind: MountKind,
    fs: Arc<dyn FileSystem>,
    armed: bool,
}

impl MountPin<'_> {
    pub(crate) fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    pub(crate) fn kind(&self) -> MountKind {
        self.kind
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    /// `abs` 必须是解析出本引用时使用的路径
    pub(crate) fn relative<'p>(&self, abs: &'p str) -> &'p str {
        relative_to_mount(&abs[..self.prefix_len], abs)
    }

    /// 放弃自动释放，由调用方负责之后调用 [`MountTable::unpin`]
    pub(crate) fn into_index(mut self) -> usize {
        self.armed = false;
        self.index
    }
}

impl Drop for MountPin<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.vfs.state.lock().mounts.unpin(self.index);
        }
    }
}

impl Vfs {
    /// 注册文件系统驱动
    ///
    /// 同名驱动已存在返回 [`FsError::AlreadyExists`]，注册表已满返回 [`FsError::NoSpace`]。
    pub fn register_driver(&self, driver: Arc<dyn FsDriver>) -> Result<(), FsError> {
        let mut state = self.state.lock();
        let mounts = &mut state.mounts;
        if mounts.driver(driver.name()).is_some() {
            log::warn!("vfs: filesystem {} already registered", driver.name());
            return Err(FsError::AlreadyExists);
        }
        let free = mounts
            .drivers
            .iter_mut()
            .find(|d| d.is_none())
            .ok_or(FsError::NoSpace)?;
        log::info!("vfs: register filesystem {}", driver.name());
        *free = Some(driver);
        Ok(())
    }

    /// 挂载文件系统
    ///
    /// - `device`：设备名，`None` 表示无底层设备
    /// - `path`：挂载路径，除 `/` 和设备树挂载外必须是已存在的目录
    /// - `fs_name`：已注册的驱动名
    pub fn mount(
        &self,
        device: Option<&str>,
        path: &str,
        fs_name: &str,
        flags: MountFlags,
        data: Option<&str>,
    ) -> Result<(), FsError> {
        let device = match device {
            Some(name) => Some(os_ops().find_device(name).ok_or_else(|| {
                log::warn!("vfs: mount: device {} not found", name);
                FsError::NoDevice
            })?),
            None => None,
        };

        let abs = self.absolute_path(path)?;
        let kind = if flags.contains(MountFlags::DEVICE_TREE) {
            MountKind::DeviceTree
        } else {
            MountKind::Normal
        };

        if abs != "/" && kind == MountKind::Normal && self.probe_directory(&abs).is_err() {
            log::warn!("vfs: mount: {} is not a directory", abs);
            return Err(FsError::NotDirectory);
        }

        let driver = self
            .state
            .lock()
            .mounts
            .driver(fs_name)
            .ok_or(FsError::NotSupported)?;

        let index = {
            let mut state = self.state.lock();
            let mounts = &mut state.mounts;
            if let Some(dev) = device {
                if mounts.device_formatting(dev) || mounts.device_mounted(dev) {
                    log::warn!("vfs: mount: device {:?} busy", dev);
                    return Err(FsError::Busy);
                }
            }
            if mounts.find_by_path(&abs).is_some() {
                log::warn!("vfs: mount: {} already mounted", abs);
                return Err(FsError::Busy);
            }
            let index = mounts
                .slots
                .iter()
                .position(|s| s.is_none())
                .ok_or(FsError::NoSpace)?;
            mounts.slots[index] = Some(MountSlot {
                path: abs.clone(),
                fs_name: String::from(fs_name),
                device,
                kind,
                fs: None,
                ref_count: 0,
            });
            index
        };

        match driver.mount(device, flags, data) {
            Ok(fs) => {
                let mut state = self.state.lock();
                if let Some(slot) = state.mounts.slots[index].as_mut() {
                    slot.fs = Some(fs);
                }
                log::info!("vfs: mounted {} on {}", fs_name, abs);
                Ok(())
            }
            Err(e) => {
                self.state.lock().mounts.slots[index] = None;
                log::warn!("vfs: mount {} on {} failed: {:?}", fs_name, abs, e);
                Err(e)
            }
        }
    }

    /// 卸载挂载点，`path` 必须与挂载路径完全一致
    ///
    /// 仍有打开的描述符或进行中的操作时返回 [`FsError::Busy`]。
    /// 驱动卸载失败时挂载点被恢复，保持可用。
    pub fn unmount(&self, path: &str) -> Result<(), FsError> {
        let abs = self.absolute_path(path)?;

        let (index, slot) = {
            let mut state = self.state.lock();
            let mounts = &mut state.mounts;
            let index = mounts
                .find_by_path(&abs)
                .filter(|&i| mounts.slots[i].as_ref().is_some_and(|s| s.fs.is_some()))
                .ok_or(FsError::NotFound)?;
            let busy = mounts.slots[index]
                .as_ref()
                .is_some_and(|s| s.ref_count != 0);
            if busy {
                log::warn!("vfs: unmount: {} busy", abs);
                return Err(FsError::Busy);
            }
            match mounts.slots[index].take() {
                Some(slot) => (index, slot),
                None => return Err(FsError::NotFound),
            }
        };

        let result = match slot.fs.as_ref() {
            Some(fs) => fs.unmount(),
            None => Err(FsError::NotFound),
        };

        match result {
            Ok(()) => {
                log::info!("vfs: unmounted {}", abs);
                Ok(())
            }
            Err(e) => {
                log::warn!("vfs: unmount {} failed: {:?}, restoring", abs, e);
                if let Err(lost) = self.state.lock().mounts.restore(index, slot) {
                    log::error!("vfs: cannot restore mount {}", lost.path);
                }
                Err(e)
            }
        }
    }

    /// 在设备上创建文件系统
    ///
    /// 设备已挂载、正在格式化或格式化表已满时返回 [`FsError::Busy`]。
    pub fn mkfs(&self, fs_name: &str, device: &str) -> Result<(), FsError> {
        let dev = os_ops().find_device(device).ok_or(FsError::NoDevice)?;

        let (driver, slot) = {
            let mut state = self.state.lock();
            let mounts = &mut state.mounts;
            if mounts.device_mounted(dev) || mounts.device_formatting(dev) {
                log::warn!("vfs: mkfs: device {} busy", device);
                return Err(FsError::Busy);
            }
            let slot = mounts
                .formatting
                .iter()
                .position(|d| d.is_none())
                .ok_or(FsError::Busy)?;
            let driver = mounts.driver(fs_name).ok_or(FsError::NotSupported)?;
            mounts.formatting[slot] = Some(dev);
            (driver, slot)
        };

        let result = driver.mkfs(dev);
        self.state.lock().mounts.formatting[slot] = None;
        match &result {
            Ok(()) => log::info!("vfs: mkfs {} on {} done", fs_name, device),
            Err(e) => log::warn!("vfs: mkfs {} on {} failed: {:?}", fs_name, device, e),
        }
        result
    }

    /// 当前挂载表快照
    pub fn mounts(&self) -> Vec<MountInfo> {
        let state = self.state.lock();
        state
            .mounts
            .slots
            .iter()
            .flatten()
            .map(MountSlot::info)
            .collect()
    }

    /// 解析绝对路径所属的挂载点并加引用
    pub(crate) fn resolve_and_pin(&self, abs: &str) -> Result<MountPin<'_>, FsError> {
        let mut state = self.state.lock();
        let index = state.mounts.resolve(abs).ok_or(FsError::NotFound)?;
        let slot = state.mounts.slots[index]
            .as_mut()
            .ok_or(FsError::NotFound)?;
        let fs = slot.fs.clone().ok_or(FsError::NotFound)?;
        slot.ref_count += 1;
        Ok(MountPin {
            vfs: self,
            index,
            prefix_len: slot.path.len(),
            kind: slot.kind,
            fs,
            armed: true,
        })
    }

    /// 确认 `abs` 是一个可打开的目录，不占用描述符
    pub(crate) fn probe_directory(&self, abs: &str) -> Result<(), FsError> {
        let pin = self.resolve_and_pin(abs)?;
        let dir = pin.fs().opendir(pin.relative(abs), OpenFlags::empty())?;
        if let Err(e) = dir.close() {
            log::debug!("vfs: probe close {} failed: {:?}", abs, e);
        }
        Ok(())
    }
}
