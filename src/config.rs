//! Gateway configuration

use crate::mm::regions;
use crate::process::Pid;

/// Compile-time defaults.
pub mod limits {
    /// Open files one process may hold at once.
    pub const MAX_OPEN_FILES: usize = 128;
    /// Longest path or command line accepted, terminator excluded.
    pub const MAX_STRING_LEN: usize = 4096;
}

/// Runtime settings of the syscall gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Lowest valid user address.
    pub user_start: usize,
    /// First address past user space.
    pub user_end: usize,
    /// Open files one process may hold at once.
    pub max_open_files: usize,
    /// Longest string argument accepted.
    pub max_string_len: usize,
    /// Print `name: exit(status)` on the console when a process exits.
    pub exit_messages: bool,
    /// Pid handed to the first process.
    pub first_pid: Pid,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            user_start: regions::USER_START,
            user_end: regions::USER_END,
            max_open_files: limits::MAX_OPEN_FILES,
            max_string_len: limits::MAX_STRING_LEN,
            exit_messages: true,
            first_pid: Pid::INITIAL,
        }
    }
}
