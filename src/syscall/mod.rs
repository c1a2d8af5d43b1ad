//! System Call Interface
//!
//! The gateway between user programs and the kernel.
//!
//! # Security Model
//! - Whitelist approach: only syscalls in the dispatch table are allowed
//! - All parameters are validated before any handler runs
//! - Invalid pointers terminate the caller, never the kernel
//! - Handlers work on kernel copies of user data
//!
//! # Syscalls
//! - 0: halt()
//! - 1: exit(status)
//! - 2: exec(cmd_line) -> pid
//! - 3: wait(pid) -> status
//! - 4: create(path, initial_size) -> bool
//! - 5: remove(path) -> bool
//! - 6: open(path) -> fd
//! - 7: filesize(fd) -> size
//! - 8: read(fd, buf, len) -> count
//! - 9: write(fd, buf, len) -> count
//! - 10: seek(fd, position)
//! - 11: tell(fd) -> position
//! - 12: close(fd)

mod decode;
mod error;
mod handler;
pub mod numbers;
mod validate;

pub use decode::{decode, Request};
pub use error::{SyscallError, SyscallResult, ERROR_WORD};
pub use handler::{Gateway, Services, FAULT_STATUS};
pub use numbers::{Access, ArgKind, SyscallId, SyscallSpec, TABLE};
pub use validate::{UserBuffer, UserString, Validator};
