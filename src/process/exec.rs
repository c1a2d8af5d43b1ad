//! Process creation
//!
//! `exec` does not load programs itself. It prepares a `Launch` (pid,
//! command line, the child's lifecycle end and a load reporter), hands it
//! to the loader collaborator and blocks until the child reports whether
//! its image loaded. Only then is the child linked into the parent.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use core::fmt;

use log::{debug, warn};
use spin::Once;

use super::lifecycle::{self, ChildEnd};
use super::{Pid, PidAllocator, Process};
use crate::mm::AddressSpace;
use crate::sched::{self, Scheduler};
use crate::syscall::SyscallError;

/// Loader collaborator: starts a new process image.
///
/// The loader must eventually either call `LoadReporter::report` or drop
/// the reporter; dropping it counts as a failed load.
pub trait Loader: Send + Sync {
    /// Start the program described by `launch` in a new thread of control.
    fn spawn(&self, launch: Launch);
}

/// Everything a loader needs to start one child.
pub struct Launch {
    pid: Pid,
    command_line: String,
    lifecycle: ChildEnd,
    load: LoadReporter,
    fd_limit: usize,
}

impl Launch {
    /// Pid reserved for the child.
    #[inline]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Full command line, program name first.
    #[inline]
    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    /// Build the child's process around its new address space.
    ///
    /// The loader fills `space` with the program image and then reports the
    /// outcome through the returned reporter.
    pub fn into_process(self, space: Box<dyn AddressSpace>) -> (Process, LoadReporter) {
        let process = Process::build(
            self.pid,
            &self.command_line,
            space,
            self.fd_limit,
            Some(self.lifecycle),
        );
        (process, self.load)
    }
}

impl fmt::Debug for Launch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Launch({}, {:?})", self.pid, self.command_line)
    }
}

/// Single-use channel from the child back to the parent blocked in `exec`.
#[derive(Debug)]
pub struct LoadReporter {
    outcome: Arc<Once<bool>>,
}

impl LoadReporter {
    /// Report whether the program image loaded.
    pub fn report(self, loaded: bool) {
        self.outcome.call_once(|| loaded);
    }
}

impl Drop for LoadReporter {
    fn drop(&mut self) {
        self.outcome.call_once(|| false);
    }
}

/// Start `command_line` as a child of `parent` and wait for its load outcome.
pub(crate) fn spawn_child(
    parent: &mut Process,
    command_line: &str,
    loader: &dyn Loader,
    scheduler: &dyn Scheduler,
    pids: &PidAllocator,
) -> Result<Pid, SyscallError> {
    let pid = pids.allocate();
    let (parent_end, child_end) = lifecycle::new_pair(pid);
    let outcome = Arc::new(Once::new());

    loader.spawn(Launch {
        pid,
        command_line: String::from(command_line),
        lifecycle: child_end,
        load: LoadReporter {
            outcome: outcome.clone(),
        },
        fd_limit: parent.files.limit(),
    });

    if sched::block_on(&outcome, scheduler) {
        debug!("{} started {} ({:?})", parent.pid(), pid, command_line);
        parent.adopt(parent_end);
        Ok(pid)
    } else {
        warn!("{} failed to load {:?}", pid, command_line);
        parent_end.abandon();
        Err(SyscallError::LoadFailed)
    }
}
