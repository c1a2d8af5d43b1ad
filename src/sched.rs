//! Scheduler interface
//!
//! The syscall layer never switches threads itself. When a call has to
//! wait for another process it polls a single-use signal and hands the CPU
//! back to the scheduler between polls.

use spin::Once;

/// Scheduler collaborator.
pub trait Scheduler: Send + Sync {
    /// Give up the CPU so other runnable processes can make progress.
    fn yield_now(&self);
}

/// Block the calling process until `signal` has fired, then return its value.
pub fn block_on<T: Copy>(signal: &Once<T>, scheduler: &dyn Scheduler) -> T {
    loop {
        if let Some(value) = signal.poll() {
            return *value;
        }
        scheduler.yield_now();
    }
}
