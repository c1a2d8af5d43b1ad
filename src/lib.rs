//! PantherOS user-program support
//!
//! The syscall gateway of a teaching kernel: everything between a user
//! program's trap and the kernel services it asks for.
//!
//! # Components
//! - Syscall decoding and dispatch (`syscall`)
//! - User pointer validation against the caller's address space
//! - Per-process file descriptor tables (`fs`)
//! - Parent/child lifecycle records with `exec`/`wait`/`exit` (`process`)
//!
//! # Security Features
//! - Every user pointer is checked page by page before use
//! - A bad pointer kills the caller, never the kernel
//! - Lifecycle records are freed exactly once, by whichever side is last
//!
//! # Integration
//! The kernel supplies the filesystem, console, loader, power and
//! scheduler through `Services`, creates the first process with
//! `Gateway::create_initial` and calls `Gateway::handle_trap` from its
//! syscall trap entry.

#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

pub mod config;
pub mod drivers;
pub mod fs;
pub mod mm;
pub mod process;
pub mod sched;
pub mod syscall;
pub mod trap;

#[cfg(test)]
mod testing;

pub use config::GatewayConfig;
pub use process::{Pid, Process};
pub use syscall::{Gateway, Services, SyscallError};
pub use trap::{Disposition, TrapFrame};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
