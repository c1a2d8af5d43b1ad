//! Parent/Child Lifecycle Records
//!
//! One record is shared by exactly one parent and one child. It carries the
//! child's exit status from the child to the parent and must be freed
//! exactly once, by whichever side lets go of it last.
//!
//! # Structure
//! ```text
//!   parent ──ParentEnd──┐                 ┌──ChildEnd── child
//!                       ▼                 ▼
//!              Arc<LifecycleRecord { liveness, wait_signal }>
//! ```
//!
//! # Ownership Rules
//! - Ends are not `Clone`; every release consumes its end
//! - The record lives in an `Arc`; `Arc::into_inner` tells the releasing
//!   side whether it held the last reference and therefore freed it
//! - Liveness flags change under the record lock; `wait_signal` is a
//!   `spin::Once`, so the exit status is published at most once
//! - A child end dropped without an explicit exit publishes status -1, so
//!   a waiting parent always wakes up

use alloc::sync::Arc;
use core::fmt;

use log::trace;
use spin::{Mutex, Once};

use super::Pid;
use crate::sched::{self, Scheduler};

/// Exit status recorded for a child that vanished without calling exit.
pub const KILLED_STATUS: i32 = -1;

#[derive(Debug)]
struct Liveness {
    parent_alive: bool,
    child_alive: bool,
}

/// The record shared between one parent and one child.
pub(crate) struct LifecycleRecord {
    child_pid: Pid,
    liveness: Mutex<Liveness>,
    wait_signal: Once<i32>,
}

/// Observable state of a record that still exists.
///
/// A freed record has no state: it can no longer be reached from either end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Parent and child are both running.
    Alive,
    /// The child exited; its status waits to be reaped.
    ChildExited,
    /// The parent is gone; the child will free the record when it exits.
    Orphaned,
}

/// What happened to the record when one side let go of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// This side held the last reference and freed the record.
    Freed,
    /// The other side still holds the record.
    Retained,
}

#[derive(Clone, Copy)]
enum Side {
    Parent,
    Child,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parent => write!(f, "parent"),
            Self::Child => write!(f, "child"),
        }
    }
}

/// Create the record for a new child and split it into its two ends.
pub fn new_pair(child_pid: Pid) -> (ParentEnd, ChildEnd) {
    let record = Arc::new(LifecycleRecord {
        child_pid,
        liveness: Mutex::new(Liveness {
            parent_alive: true,
            child_alive: true,
        }),
        wait_signal: Once::new(),
    });
    trace!("record for {} created", child_pid);
    (
        ParentEnd {
            record: record.clone(),
        },
        ChildEnd { record },
    )
}

/// Drop one side's reference and report whether it was the last.
fn relinquish(record: Arc<LifecycleRecord>, side: Side) -> Release {
    let pid = record.child_pid;
    match Arc::into_inner(record) {
        Some(record) => {
            drop(record);
            trace!("record for {} freed by {}", pid, side);
            Release::Freed
        }
        None => {
            trace!("record for {} released by {}", pid, side);
            Release::Retained
        }
    }
}

impl LifecycleRecord {
    fn state(&self) -> RecordState {
        let liveness = self.liveness.lock();
        match (liveness.parent_alive, liveness.child_alive) {
            (true, true) => RecordState::Alive,
            (false, true) => RecordState::Orphaned,
            (_, false) => RecordState::ChildExited,
        }
    }

    fn mark_parent_gone(&self) {
        self.liveness.lock().parent_alive = false;
    }

    fn publish_exit(&self, status: i32) {
        let mut liveness = self.liveness.lock();
        liveness.child_alive = false;
        self.wait_signal.call_once(|| status);
    }
}

/// The parent's handle on one child's record.
pub struct ParentEnd {
    record: Arc<LifecycleRecord>,
}

impl ParentEnd {
    /// Pid of the child this record describes.
    #[inline]
    pub fn child_pid(&self) -> Pid {
        self.record.child_pid
    }

    /// Current state of the record.
    pub fn state(&self) -> RecordState {
        self.record.state()
    }

    /// The child's exit status, if it has exited.
    pub fn exit_status(&self) -> Option<i32> {
        self.record.wait_signal.poll().copied()
    }

    /// Block until the child exits, then release the record.
    ///
    /// Returns the child's exit status and what happened to the record.
    pub fn reap(self, scheduler: &dyn Scheduler) -> (i32, Release) {
        let status = sched::block_on(&self.record.wait_signal, scheduler);
        (status, relinquish(self.into_record(), Side::Parent))
    }

    /// Give up the record without waiting (the parent is exiting).
    pub fn abandon(self) -> Release {
        relinquish(self.into_record(), Side::Parent)
    }

    #[cfg(test)]
    pub(crate) fn probe(&self) -> RecordProbe {
        RecordProbe(Arc::downgrade(&self.record))
    }

    /// Run this end's release step and keep one reference for `relinquish`.
    fn into_record(self) -> Arc<LifecycleRecord> {
        let record = Arc::clone(&self.record);
        drop(self);
        record
    }
}

impl Drop for ParentEnd {
    fn drop(&mut self) {
        self.record.mark_parent_gone();
    }
}

impl fmt::Debug for ParentEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParentEnd({}, {:?})", self.child_pid(), self.state())
    }
}

/// The child's handle on its own record.
pub struct ChildEnd {
    record: Arc<LifecycleRecord>,
}

impl ChildEnd {
    /// Pid of the child owning this end.
    #[inline]
    pub fn pid(&self) -> Pid {
        self.record.child_pid
    }

    /// Current state of the record.
    pub fn state(&self) -> RecordState {
        self.record.state()
    }

    /// Publish the exit status, wake the parent and release the record.
    pub fn exit(self, status: i32) -> Release {
        self.record.publish_exit(status);
        relinquish(self.into_record(), Side::Child)
    }

    #[cfg(test)]
    pub(crate) fn probe(&self) -> RecordProbe {
        RecordProbe(Arc::downgrade(&self.record))
    }

    /// Run this end's release step and keep one reference for `relinquish`.
    ///
    /// The status must already be published: dropping the end publishes -1,
    /// which `wait_signal` ignores once it has fired.
    fn into_record(self) -> Arc<LifecycleRecord> {
        let record = Arc::clone(&self.record);
        drop(self);
        record
    }
}

impl Drop for ChildEnd {
    fn drop(&mut self) {
        self.record.publish_exit(KILLED_STATUS);
    }
}

impl fmt::Debug for ChildEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChildEnd({}, {:?})", self.pid(), self.state())
    }
}

/// Weak view of a record, used by tests to observe deallocation.
#[cfg(test)]
pub(crate) struct RecordProbe(alloc::sync::Weak<LifecycleRecord>);

#[cfg(test)]
impl RecordProbe {
    pub(crate) fn is_freed(&self) -> bool {
        self.0.strong_count() == 0
    }
}
