//! Syscall trap interface
//!
//! The architecture's trap entry saves the user registers, builds a
//! `TrapFrame` and calls `Gateway::handle_trap`. The returned
//! `Disposition` tells it whether to return to user mode.
//!
//! # Calling Convention
//! - `esp` points at the syscall number on the user stack
//! - Argument words follow the number, lowest address first
//! - The result word is returned in `eax`

use crate::mm::UserAddr;

/// Registers the syscall layer reads and writes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrapFrame {
    /// User stack pointer at the time of the trap.
    pub esp: usize,
    /// Result register.
    pub eax: u32,
}

impl TrapFrame {
    /// Frame for a trap with the given user stack pointer.
    pub const fn new(esp: usize) -> Self {
        Self { esp, eax: 0 }
    }

    /// The stack pointer as a user address.
    #[inline]
    pub const fn stack(&self) -> UserAddr {
        UserAddr::new(self.esp)
    }
}

/// What the trap entry must do after the gateway returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Return to the process; `eax` holds the result if the call has one.
    Resume,
    /// The process exited with this status and must never run again.
    Exited(i32),
    /// The machine is powering off.
    Halted,
}
