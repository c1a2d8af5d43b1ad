//! User Address Space Interface
//!
//! The kernel's virtual-memory subsystem owns the page tables; this module
//! only describes what the syscall layer needs from it: per-page
//! permissions and copying bytes across the user/kernel boundary.

use bitflags::bitflags;

use super::address::UserAddr;

bitflags! {
    /// Permissions of a single user page as seen by the syscall layer.
    ///
    /// An empty set means the page is not mapped.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PageFlags: u8 {
        /// Page is mapped.
        const PRESENT = 1 << 0;
        /// Page may be written.
        const WRITABLE = 1 << 1;
        /// Page is accessible from user mode.
        const USER = 1 << 2;

        /// Read-only user page (code, rodata).
        const USER_RO = Self::PRESENT.bits() | Self::USER.bits();
        /// Read/write user page (data, heap, stack).
        const USER_RW = Self::USER_RO.bits() | Self::WRITABLE.bits();
    }
}

/// A process's user address space.
///
/// `copy_in` and `copy_out` are only called on ranges that the syscall
/// validator has already checked page by page, so they cannot fail.
pub trait AddressSpace: Send {
    /// Permissions of the page containing `page`.
    fn page_flags(&self, page: UserAddr) -> PageFlags;

    /// Copy `dst.len()` bytes starting at `addr` into kernel memory.
    fn copy_in(&self, addr: UserAddr, dst: &mut [u8]);

    /// Copy `src` into user memory starting at `addr`.
    fn copy_out(&mut self, addr: UserAddr, src: &[u8]);
}
