//! 文件元数据相关结构

bitflags::bitflags! {
    /// 文件类型与权限位（与 POSIX st_mode 兼容）
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FileMode: u32 {
        const S_IFMT   = 0o170000;
        const S_IFREG  = 0o100000;
        const S_IFDIR  = 0o040000;
        const S_IFCHR  = 0o020000;
        const S_IFBLK  = 0o060000;

        const S_IRUSR  = 0o400;
        const S_IWUSR  = 0o200;
        const S_IXUSR  = 0o100;
        const S_IRGRP  = 0o040;
        const S_IWGRP  = 0o020;
        const S_IXGRP  = 0o010;
        const S_IROTH  = 0o004;
        const S_IWOTH  = 0o002;
        const S_IXOTH  = 0o001;

        const S_IRWXUGO = 0o777;
        const S_IRUGO   = 0o444;
        const S_IWUGO   = 0o222;
        const S_IXUGO   = 0o111;
    }
}

impl FileMode {
    /// 是否为目录
    pub fn is_dir(&self) -> bool {
        self.bits() & Self::S_IFMT.bits() == Self::S_IFDIR.bits()
    }

    /// 是否为普通文件
    pub fn is_reg(&self) -> bool {
        self.bits() & Self::S_IFMT.bits() == Self::S_IFREG.bits()
    }

    /// 是否为字符设备
    pub fn is_chr(&self) -> bool {
        self.bits() & Self::S_IFMT.bits() == Self::S_IFCHR.bits()
    }
}

/// stat() 结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stat {
    pub st_dev: u64,
    pub st_ino: u64,
    pub st_mode: FileMode,
    pub st_nlink: u32,
    pub st_size: u64,
    pub st_blksize: u32,
    pub st_blocks: u64,
    pub st_mtime: i64,
}

/// statfs() 结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatFs {
    /// 块大小（字节）
    pub f_bsize: u64,
    /// 总块数
    pub f_blocks: u64,
    /// 空闲块数
    pub f_bfree: u64,
    /// 非特权用户可用块数
    pub f_bavail: u64,
    /// 总 inode 数
    pub f_files: u64,
    /// 空闲 inode 数
    pub f_ffree: u64,
    /// 最大文件名长度
    pub f_namelen: u64,
}

/// 目录项类型（d_type）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum DirentType {
    #[default]
    Unknown = 0,
    Chr = 2,
    Dir = 4,
    Blk = 6,
    Reg = 8,
}
