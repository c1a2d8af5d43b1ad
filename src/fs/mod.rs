//! Filesystem interface and per-process descriptor table
//!
//! Directories, inodes and block allocation belong to the filesystem
//! collaborator. The syscall layer sees paths and opaque open files.

mod fdtable;

use alloc::boxed::Box;

pub use fdtable::{Fd, FdError, FdTable};

/// Filesystem collaborator.
pub trait FileSystem: Send + Sync {
    /// Create `path` with `initial_size` bytes. Returns false if it exists
    /// or cannot be created.
    fn create(&self, path: &str, initial_size: u32) -> bool;

    /// Remove `path`. Returns false if it does not exist.
    fn remove(&self, path: &str) -> bool;

    /// Open `path`, or `None` if it does not resolve to a file.
    fn open(&self, path: &str) -> Option<Box<dyn File>>;
}

/// An open file. Dropping it closes it.
pub trait File: Send {
    /// Read at the current position, returning the byte count.
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Write at the current position, returning the byte count.
    fn write(&mut self, buf: &[u8]) -> usize;

    /// File length in bytes.
    fn length(&self) -> u32;

    /// Move the position; past-the-end positions are allowed.
    fn seek(&mut self, position: u32);

    /// Current position.
    fn tell(&self) -> u32;
}
