//! System call errors
//!
//! Errors never cross into user space as anything but a sentinel return
//! value or the termination of the calling process.

use core::fmt;

use crate::fs::FdError;

/// Result type for syscall handlers.
pub type SyscallResult<T> = Result<T, SyscallError>;

/// Sentinel returned to user space for failed calls.
pub const ERROR_WORD: u32 = -1i32 as u32;

/// System call error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallError {
    /// A pointer or range argument is outside the process's mapped user memory.
    BadAddress,
    /// The syscall number is not in the dispatch table.
    UnknownSyscall(u32),
    /// The descriptor names no open file, or a console descriptor was used
    /// in the wrong direction.
    BadFileDescriptor,
    /// `open` could not open the path.
    OpenFailed,
    /// `wait` on a pid that is not an unreaped direct child.
    NotAChild,
    /// `exec` could not load the program.
    LoadFailed,
    /// An argument has the right shape but an unusable value.
    InvalidArgument,
}

impl SyscallError {
    /// Check if this error terminates the calling process.
    #[inline]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::BadAddress | Self::UnknownSyscall(_))
    }
}

impl fmt::Display for SyscallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadAddress => write!(f, "bad user address"),
            Self::UnknownSyscall(id) => write!(f, "unknown syscall {}", id),
            Self::BadFileDescriptor => write!(f, "bad file descriptor"),
            Self::OpenFailed => write!(f, "cannot open file"),
            Self::NotAChild => write!(f, "not a child or already reaped"),
            Self::LoadFailed => write!(f, "program failed to load"),
            Self::InvalidArgument => write!(f, "invalid argument"),
        }
    }
}

impl From<FdError> for SyscallError {
    fn from(err: FdError) -> Self {
        match err {
            FdError::BadDescriptor | FdError::WrongDirection => Self::BadFileDescriptor,
            FdError::NotFound | FdError::TableFull => Self::OpenFailed,
        }
    }
}
