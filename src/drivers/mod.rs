//! Device interfaces used by the syscall layer
//!
//! The drivers themselves live with the platform code. This crate only
//! describes the operations it needs:
//! - Console byte I/O (fd 0 / fd 1, exit messages, kernel log)
//! - Power off (`halt`)

pub mod console;
pub mod power;

pub use console::{Console, ConsoleLogger, ConsoleWriter};
pub use power::PowerControl;
