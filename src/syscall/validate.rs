//! System Call Input Validation
//!
//! Every pointer a process passes to the kernel is checked here before the
//! kernel touches the memory behind it.
//!
//! # Security Principles
//! - Validate ALL inputs before use
//! - Fail-secure: deny by default
//! - Prevent common vulnerabilities:
//!   - Kernel memory disclosure (range must stay below the user limit)
//!   - Address wraparound (overflow-checked range arithmetic)
//!   - Unmapped or read-only pages (checked page by page)
//!   - TOCTOU races (data is copied into kernel memory once)
//!
//! A failed check is a protection fault: the gateway terminates the
//! process with status -1.

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use super::error::SyscallError;
use super::numbers::Access;
use crate::mm::address::pages_spanning;
use crate::mm::{AddressSpace, PageFlags, UserAddr, PAGE_SIZE, WORD_SIZE};

/// A validated user-space range.
///
/// This type guarantees that:
/// - The range is within the user address window
/// - The length doesn't overflow
/// - Every page in it is mapped with the permissions `access` needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserBuffer {
    addr: UserAddr,
    len: usize,
    access: Access,
}

impl UserBuffer {
    /// Start address.
    #[inline]
    pub fn addr(&self) -> UserAddr {
        self.addr
    }

    /// Length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check for a zero-length buffer.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy the buffer into kernel memory.
    pub fn copy_in(&self, space: &dyn AddressSpace) -> Vec<u8> {
        let mut data = vec![0u8; self.len];
        if !data.is_empty() {
            space.copy_in(self.addr, &mut data);
        }
        data
    }

    /// Copy `data` into the buffer, truncated to the buffer length.
    ///
    /// Only writable buffers accept data; returns the number of bytes copied.
    pub fn copy_out(&self, space: &mut dyn AddressSpace, data: &[u8]) -> usize {
        self.copy_out_at(space, 0, data)
    }

    /// Copy `data` into the buffer starting `offset` bytes in.
    pub fn copy_out_at(&self, space: &mut dyn AddressSpace, offset: usize, data: &[u8]) -> usize {
        if self.access != Access::Writable || offset >= self.len {
            return 0;
        }
        let count = data.len().min(self.len - offset);
        if count > 0 {
            // In range: offset < len and the whole range was validated.
            space.copy_out(UserAddr::new(self.addr.as_usize() + offset), &data[..count]);
        }
        count
    }
}

/// A NUL-terminated string copied in from user space (terminator removed).
#[derive(Clone, PartialEq, Eq)]
pub struct UserString(Vec<u8>);

impl UserString {
    /// Raw bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The string as UTF-8, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.0).ok()
    }
}

impl fmt::Debug for UserString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(&self.0))
    }
}

/// Pointer validator for one user address window.
#[derive(Debug, Clone, Copy)]
pub struct Validator {
    user_start: usize,
    user_end: usize,
    max_string_len: usize,
}

impl Validator {
    /// Create a validator for `[user_start, user_end)` accepting strings of
    /// at most `max_string_len` bytes.
    pub const fn new(user_start: usize, user_end: usize, max_string_len: usize) -> Self {
        Self {
            user_start,
            user_end,
            max_string_len,
        }
    }

    /// Validate a user-space range
    ///
    /// # Arguments
    /// * `space` - Address space of the calling process
    /// * `ptr` - User-space buffer address
    /// * `len` - Buffer length in bytes
    /// * `access` - What the kernel will do with the buffer
    ///
    /// # Security Checks
    /// 1. Pointer is not null and within user space
    /// 2. Pointer + length doesn't overflow
    /// 3. End address is within user space
    /// 4. Every page is present, user-accessible, and writable if needed
    pub fn check_range(
        &self,
        space: &dyn AddressSpace,
        ptr: UserAddr,
        len: usize,
        access: Access,
    ) -> Result<UserBuffer, SyscallError> {
        // Zero-length ranges are valid
        if len == 0 {
            return Ok(UserBuffer { addr: ptr, len, access });
        }

        if ptr.is_null() {
            return Err(SyscallError::BadAddress);
        }

        if ptr.as_usize() < self.user_start || ptr.as_usize() >= self.user_end {
            return Err(SyscallError::BadAddress);
        }

        let end = ptr.checked_add(len).ok_or(SyscallError::BadAddress)?;
        if end.as_usize() > self.user_end {
            return Err(SyscallError::BadAddress);
        }

        for page in pages_spanning(ptr, len) {
            if !page_allows(space.page_flags(page), access) {
                return Err(SyscallError::BadAddress);
            }
        }

        Ok(UserBuffer { addr: ptr, len, access })
    }

    /// Validate and read one argument word.
    pub fn read_word(&self, space: &dyn AddressSpace, ptr: UserAddr) -> Result<u32, SyscallError> {
        let buffer = self.check_range(space, ptr, WORD_SIZE, Access::Readable)?;
        let mut bytes = [0u8; WORD_SIZE];
        space.copy_in(buffer.addr, &mut bytes);
        Ok(u32::from_le_bytes(bytes))
    }

    /// Validate and copy in a NUL-terminated string.
    ///
    /// The string is checked one page at a time as it is scanned; a string
    /// that runs into an unmapped page, past the user window, or past the
    /// length limit without a terminator is rejected.
    pub fn read_str(&self, space: &dyn AddressSpace, ptr: UserAddr) -> Result<UserString, SyscallError> {
        if ptr.is_null() {
            return Err(SyscallError::BadAddress);
        }

        let mut bytes = Vec::new();
        let mut cursor = ptr;
        loop {
            let to_page_end = PAGE_SIZE - cursor.page_offset();
            let budget = self.max_string_len.saturating_add(1) - bytes.len();
            let chunk_len = to_page_end.min(budget);
            let chunk = self.check_range(space, cursor, chunk_len, Access::Readable)?;
            let data = chunk.copy_in(space);

            if let Some(nul) = data.iter().position(|&b| b == 0) {
                bytes.extend_from_slice(&data[..nul]);
                return Ok(UserString(bytes));
            }
            bytes.extend_from_slice(&data);
            if bytes.len() > self.max_string_len {
                return Err(SyscallError::BadAddress);
            }
            cursor = cursor.checked_add(chunk_len).ok_or(SyscallError::BadAddress)?;
        }
    }
}

fn page_allows(flags: PageFlags, access: Access) -> bool {
    let required = match access {
        Access::Readable => PageFlags::USER_RO,
        Access::Writable => PageFlags::USER_RW,
    };
    flags.contains(required)
}
