//! User processes
//!
//! A `Process` is the kernel-side state the syscall layer keeps for one
//! running program: its address space, its open files, the records of its
//! children and the record it shares with its own parent.
//!
//! # Lifecycle
//! - The initial process is created by the kernel and has no parent record
//! - Every other process starts from a `Launch` handed to the loader by `exec`
//! - `exit` releases everything the process owns; dropping a process
//!   without calling `exit` releases the same resources and reports -1

mod exec;
pub mod lifecycle;

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::String;
use core::fmt;
use core::sync::atomic::{AtomicI32, Ordering};

use log::debug;

use crate::fs::FdTable;
use crate::mm::AddressSpace;
use crate::sched::Scheduler;
use crate::syscall::SyscallError;

pub use exec::{Launch, LoadReporter, Loader};
pub(crate) use exec::spawn_child;
pub use lifecycle::{ChildEnd, ParentEnd, RecordState, Release};

/// Longest process name kept, in bytes.
pub const NAME_MAX: usize = 15;

/// A process identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Pid(i32);

impl Pid {
    /// Pid given to the first process.
    pub const INITIAL: Self = Self(1);

    /// Wrap a raw pid.
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

impl fmt::Debug for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pid({})", self.0)
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out process ids in increasing order.
#[derive(Debug)]
pub struct PidAllocator {
    next: AtomicI32,
}

impl PidAllocator {
    /// Start allocating at `first`.
    pub const fn new(first: Pid) -> Self {
        Self {
            next: AtomicI32::new(first.0),
        }
    }

    /// Take the next pid.
    pub fn allocate(&self) -> Pid {
        Pid(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// Derive a process name from a command line: its first word, cut to
/// `NAME_MAX` bytes on a character boundary.
pub fn process_name(command_line: &str) -> String {
    let program = command_line.split_whitespace().next().unwrap_or("");
    let mut end = program.len().min(NAME_MAX);
    while !program.is_char_boundary(end) {
        end -= 1;
    }
    String::from(&program[..end])
}

/// What a process released when it exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitReport {
    /// Status the process exited with.
    pub status: i32,
    /// Outcome for the record shared with the parent, if there is one.
    pub own_record: Option<Release>,
    /// Child records this exit freed.
    pub children_freed: usize,
    /// Child records left for still-running children to free.
    pub children_orphaned: usize,
    /// Files closed.
    pub files_closed: usize,
}

/// Kernel-side state of one user process.
pub struct Process {
    pid: Pid,
    name: String,
    pub(crate) space: Box<dyn AddressSpace>,
    pub(crate) files: FdTable,
    children: BTreeMap<Pid, ParentEnd>,
    lifecycle: Option<ChildEnd>,
    exit_status: Option<i32>,
}

impl Process {
    /// Create a process without a parent.
    pub fn initial(pid: Pid, command_line: &str, space: Box<dyn AddressSpace>, fd_limit: usize) -> Self {
        Self::build(pid, command_line, space, fd_limit, None)
    }

    fn build(
        pid: Pid,
        command_line: &str,
        space: Box<dyn AddressSpace>,
        fd_limit: usize,
        lifecycle: Option<ChildEnd>,
    ) -> Self {
        Self {
            pid,
            name: process_name(command_line),
            space,
            files: FdTable::new(fd_limit),
            children: BTreeMap::new(),
            lifecycle,
            exit_status: None,
        }
    }

    /// Process id.
    #[inline]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Process name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Open files.
    #[inline]
    pub fn files(&self) -> &FdTable {
        &self.files
    }

    /// Status passed to `exit`, once the process has exited.
    #[inline]
    pub fn exit_status(&self) -> Option<i32> {
        self.exit_status
    }

    /// Check if the process has exited.
    #[inline]
    pub fn has_exited(&self) -> bool {
        self.exit_status.is_some()
    }

    /// Check if `pid` is an unreaped direct child.
    pub fn has_child(&self, pid: Pid) -> bool {
        self.children.contains_key(&pid)
    }

    /// Number of unreaped direct children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// State of the record shared with child `pid`.
    pub fn child_state(&self, pid: Pid) -> Option<RecordState> {
        self.children.get(&pid).map(ParentEnd::state)
    }

    pub(crate) fn adopt(&mut self, end: ParentEnd) {
        self.children.insert(end.child_pid(), end);
    }

    /// Wait for direct child `pid` to exit and reap it.
    ///
    /// Fails without blocking if `pid` is not an unreaped direct child.
    pub fn wait(&mut self, pid: Pid, scheduler: &dyn Scheduler) -> Result<i32, SyscallError> {
        let end = self.children.remove(&pid).ok_or(SyscallError::NotAChild)?;
        let (status, _) = end.reap(scheduler);
        debug!("{} reaped {} with status {}", self.pid, pid, status);
        Ok(status)
    }

    /// Release everything the process owns.
    ///
    /// Only the first call has any effect; later calls report the original
    /// status with nothing released.
    pub fn exit(&mut self, status: i32) -> ExitReport {
        let mut report = ExitReport {
            status: self.exit_status.unwrap_or(status),
            own_record: None,
            children_freed: 0,
            children_orphaned: 0,
            files_closed: 0,
        };
        if self.exit_status.is_some() {
            return report;
        }
        self.exit_status = Some(status);

        for (_, end) in core::mem::take(&mut self.children) {
            match end.abandon() {
                Release::Freed => report.children_freed += 1,
                Release::Retained => report.children_orphaned += 1,
            }
        }
        report.own_record = self.lifecycle.take().map(|end| end.exit(status));
        report.files_closed = self.files.close_all();
        report
    }

    #[cfg(test)]
    pub(crate) fn child_probe(&self, pid: Pid) -> Option<lifecycle::RecordProbe> {
        self.children.get(&pid).map(ParentEnd::probe)
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("pid", &self.pid)
            .field("name", &self.name)
            .field("files", &self.files.len())
            .field("children", &self.children.len())
            .field("exit_status", &self.exit_status)
            .finish()
    }
}
