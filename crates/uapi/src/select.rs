//! select() 使用的描述符集合

/// 单个 FdSet 能表示的最大描述符数
pub const FD_SETSIZE: usize = 64;

const BITS_PER_WORD: usize = u32::BITS as usize;
const WORDS: usize = FD_SETSIZE.div_ceil(BITS_PER_WORD);

/// 描述符位图，对应 C 的 `fd_set`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FdSet {
    bits: [u32; WORDS],
}

impl FdSet {
    pub const fn new() -> Self {
        Self { bits: [0; WORDS] }
    }

    /// FD_ZERO
    pub fn zero(&mut self) {
        self.bits = [0; WORDS];
    }

    /// FD_SET，超出范围的描述符被忽略
    pub fn set(&mut self, fd: i32) {
        if let Some((word, bit)) = Self::locate(fd) {
            self.bits[word] |= 1 << bit;
        }
    }

    /// FD_CLR
    pub fn clear(&mut self, fd: i32) {
        if let Some((word, bit)) = Self::locate(fd) {
            self.bits[word] &= !(1 << bit);
        }
    }

    /// FD_ISSET
    pub fn is_set(&self, fd: i32) -> bool {
        match Self::locate(fd) {
            Some((word, bit)) => self.bits[word] & (1 << bit) != 0,
            None => false,
        }
    }

    /// 集合中置位的描述符个数
    pub fn count(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    fn locate(fd: i32) -> Option<(usize, usize)> {
        if fd < 0 || fd as usize >= FD_SETSIZE {
            return None;
        }
        let fd = fd as usize;
        Some((fd / BITS_PER_WORD, fd % BITS_PER_WORD))
    }
}
