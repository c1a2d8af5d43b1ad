//! User Virtual Address Types
//!
//! Type-safe wrapper for addresses handed to the kernel by user processes.
//! A `UserAddr` is only a number until the syscall validator has checked it
//! against the process's address space; it is never dereferenced directly.

use core::fmt;

/// Page size (4 KiB)
pub const PAGE_SIZE: usize = 4096;
/// Page size mask
pub const PAGE_MASK: usize = PAGE_SIZE - 1;
/// Bits to shift for page number
pub const PAGE_SHIFT: usize = 12;

/// Size of one syscall argument word on the user stack.
pub const WORD_SIZE: usize = core::mem::size_of::<u32>();

/// User-space memory regions
///
/// Everything at or above `USER_END` belongs to the kernel. The range below
/// `USER_START` is never mapped for user programs, which also keeps the null
/// page out of reach.
pub mod regions {
    /// Lowest address a user program image is loaded at.
    pub const USER_START: usize = 0x0804_8000;
    /// First kernel address (the user stack grows down from here).
    pub const USER_END: usize = 0xC000_0000;
}

/// A virtual address supplied by a user process.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct UserAddr(usize);

impl UserAddr {
    /// Wrap a raw address.
    #[inline]
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    /// Get the raw address value.
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// Check for the null address.
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Get the page number.
    #[inline]
    pub const fn page_number(self) -> usize {
        self.0 >> PAGE_SHIFT
    }

    /// Get the page offset (lowest 12 bits).
    #[inline]
    pub const fn page_offset(self) -> usize {
        self.0 & PAGE_MASK
    }

    /// Add an offset, returning `None` on overflow.
    #[inline]
    pub const fn checked_add(self, offset: usize) -> Option<Self> {
        match self.0.checked_add(offset) {
            Some(addr) => Some(Self(addr)),
            None => None,
        }
    }
}

impl fmt::Debug for UserAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserAddr({:#010x})", self.0)
    }
}

impl fmt::Display for UserAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl From<u32> for UserAddr {
    fn from(word: u32) -> Self {
        Self(word as usize)
    }
}

/// Iterate over the page-aligned addresses of every page touched by
/// `[start, start + len)`. The caller guarantees the range does not overflow.
pub fn pages_spanning(start: UserAddr, len: usize) -> impl Iterator<Item = UserAddr> {
    let first = start.page_number();
    let last = if len == 0 {
        first
    } else {
        (start.as_usize() + len - 1) >> PAGE_SHIFT
    };
    let count = if len == 0 { 0 } else { last - first + 1 };
    (first..first + count).map(|page| UserAddr(page << PAGE_SHIFT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn test_page_split() {
        let addr = UserAddr::new(0x0804_9234);
        assert_eq!(addr.page_number(), 0x0804_9);
        assert_eq!(addr.page_offset(), 0x234);
    }

    #[test]
    fn test_pages_spanning_crosses_boundary() {
        let pages: Vec<_> = pages_spanning(UserAddr::new(0x0804_8ffe), 4).collect();
        assert_eq!(pages, [UserAddr::new(0x0804_8000), UserAddr::new(0x0804_9000)]);
    }

    #[test]
    fn test_pages_spanning_empty() {
        assert_eq!(pages_spanning(UserAddr::new(0x0804_8000), 0).count(), 0);
    }

    #[test]
    fn test_checked_add_overflow() {
        assert!(UserAddr::new(usize::MAX - 1).checked_add(4).is_none());
    }
}
