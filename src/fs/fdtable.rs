//! File Descriptor Table
//!
//! Per-process mapping from small integer handles to open files.
//!
//! # Design
//! - Descriptors 0 and 1 are reserved for console input and output
//! - New descriptors come from a monotonic counter, so a closed
//!   descriptor is never handed out again during the process's life
//! - Lookup is a `BTreeMap` keyed by descriptor
//! - Dropping the table closes every file it still holds

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use core::fmt;

use log::trace;

use super::{File, FileSystem};
use crate::drivers::Console;

/// A file descriptor.
///
/// This is a newtype to keep descriptors apart from other syscall integers.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Fd(i32);

impl Fd {
    /// Console input.
    pub const STDIN: Self = Self(0);

    /// Console output.
    pub const STDOUT: Self = Self(1);

    /// First descriptor handed out by `open`.
    pub const FIRST_FILE: Self = Self(2);

    /// Wrap a raw descriptor value.
    #[inline]
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Get the raw value.
    #[inline]
    pub const fn as_i32(self) -> i32 {
        self.0
    }
}

impl fmt::Debug for Fd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fd({})", self.0)
    }
}

impl fmt::Display for Fd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error type for descriptor table operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FdError {
    /// No open file has this descriptor.
    BadDescriptor,
    /// Reading from console output or writing to console input.
    WrongDirection,
    /// The path does not name an existing file.
    NotFound,
    /// The per-process open-file limit is reached.
    TableFull,
}

impl fmt::Display for FdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadDescriptor => write!(f, "bad file descriptor"),
            Self::WrongDirection => write!(f, "console descriptor used in wrong direction"),
            Self::NotFound => write!(f, "no such file"),
            Self::TableFull => write!(f, "too many open files"),
        }
    }
}

/// One open file owned by a process.
struct OpenFile {
    fd: Fd,
    file: Box<dyn File>,
}

impl fmt::Debug for OpenFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpenFile({})", self.fd)
    }
}

/// Descriptor table of one process.
#[derive(Debug)]
pub struct FdTable {
    files: BTreeMap<Fd, OpenFile>,
    next: i32,
    limit: usize,
}

impl FdTable {
    /// Create an empty table holding at most `limit` open files.
    pub fn new(limit: usize) -> Self {
        Self {
            files: BTreeMap::new(),
            next: Fd::FIRST_FILE.0,
            limit,
        }
    }

    /// Maximum number of open files.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of open files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if no files are open.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Check if `fd` names an open file.
    pub fn contains(&self, fd: Fd) -> bool {
        self.files.contains_key(&fd)
    }

    /// Check that `read` on `fd` can succeed before any buffer is prepared.
    pub fn check_readable(&self, fd: Fd) -> Result<(), FdError> {
        match fd {
            Fd::STDIN => Ok(()),
            Fd::STDOUT => Err(FdError::WrongDirection),
            _ if self.contains(fd) => Ok(()),
            _ => Err(FdError::BadDescriptor),
        }
    }

    fn file(&mut self, fd: Fd) -> Result<&mut dyn File, FdError> {
        let open = self.files.get_mut(&fd).ok_or(FdError::BadDescriptor)?;
        let file: &mut dyn File = open.file.as_mut();
        Ok(file)
    }

    /// Open `path` and assign it the next descriptor.
    pub fn open(&mut self, fs: &dyn FileSystem, path: &str) -> Result<Fd, FdError> {
        if self.files.len() >= self.limit {
            return Err(FdError::TableFull);
        }
        let next = self.next.checked_add(1).ok_or(FdError::TableFull)?;
        let file = fs.open(path).ok_or(FdError::NotFound)?;

        let fd = Fd(self.next);
        self.next = next;
        self.files.insert(fd, OpenFile { fd, file });
        trace!("fd {} -> {:?}", fd, path);
        Ok(fd)
    }

    /// Close `fd`. Returns false if nothing was open under it.
    pub fn close(&mut self, fd: Fd) -> bool {
        match self.files.remove(&fd) {
            Some(open) => {
                trace!("fd {} closed", open.fd);
                true
            }
            None => false,
        }
    }

    /// Close every open file, returning how many there were.
    pub fn close_all(&mut self) -> usize {
        let count = self.files.len();
        self.files.clear();
        count
    }

    /// Read into `buf` from `fd`.
    pub fn read(&mut self, fd: Fd, console: &dyn Console, buf: &mut [u8]) -> Result<usize, FdError> {
        match fd {
            Fd::STDIN => {
                for byte in buf.iter_mut() {
                    *byte = console.get_byte();
                }
                Ok(buf.len())
            }
            Fd::STDOUT => Err(FdError::WrongDirection),
            _ => Ok(self.file(fd)?.read(buf)),
        }
    }

    /// Write `buf` to `fd`.
    pub fn write(&mut self, fd: Fd, console: &dyn Console, buf: &[u8]) -> Result<usize, FdError> {
        match fd {
            Fd::STDOUT => {
                console.put_bytes(buf);
                Ok(buf.len())
            }
            Fd::STDIN => Err(FdError::WrongDirection),
            _ => Ok(self.file(fd)?.write(buf)),
        }
    }

    /// Length of the file behind `fd`.
    pub fn filesize(&mut self, fd: Fd) -> Result<u32, FdError> {
        Ok(self.file(fd)?.length())
    }

    /// Move the position of `fd`.
    pub fn seek(&mut self, fd: Fd, position: u32) -> Result<(), FdError> {
        self.file(fd)?.seek(position);
        Ok(())
    }

    /// Current position of `fd`.
    pub fn tell(&mut self, fd: Fd) -> Result<u32, FdError> {
        Ok(self.file(fd)?.tell())
    }
}
