//! System Call Handler
//!
//! Dispatches system calls and implements individual syscall handlers.
//!
//! # Security Considerations
//! - Syscall numbers are checked against the dispatch table
//! - Unknown syscalls and bad pointers terminate the caller with status -1
//! - Every argument is validated before any handler runs
//! - Handlers only see kernel copies of user data

use alloc::boxed::Box;
use core::fmt::Write;

use log::{debug, warn};

use super::decode::{self, Request};
use super::error::{SyscallError, SyscallResult, ERROR_WORD};
use super::validate::{UserBuffer, Validator};
use crate::config::GatewayConfig;
use crate::drivers::{Console, ConsoleWriter, PowerControl};
use crate::fs::{Fd, FileSystem};
use crate::mm::{AddressSpace, PAGE_SIZE};
use crate::process::{self, ExitReport, Loader, Pid, PidAllocator, Process};
use crate::sched::Scheduler;
use crate::trap::{Disposition, TrapFrame};

/// Status a process is terminated with after a protection fault.
pub const FAULT_STATUS: i32 = -1;

/// External collaborators the gateway calls into.
pub struct Services {
    pub fs: Box<dyn FileSystem>,
    pub console: Box<dyn Console>,
    pub loader: Box<dyn Loader>,
    pub power: Box<dyn PowerControl>,
    pub scheduler: Box<dyn Scheduler>,
}

/// How a dispatched call finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Completion {
    /// Write this word to `eax`.
    Value(u32),
    /// Nothing to return.
    Void,
    /// The caller exited.
    Exit(i32),
    /// The machine is powering off.
    Halt,
}

/// The syscall gateway.
pub struct Gateway {
    services: Services,
    config: GatewayConfig,
    validator: Validator,
    pids: PidAllocator,
}

impl Gateway {
    /// Create a gateway over `services`.
    pub fn new(services: Services, config: GatewayConfig) -> Self {
        Self {
            validator: Validator::new(config.user_start, config.user_end, config.max_string_len),
            pids: PidAllocator::new(config.first_pid),
            services,
            config,
        }
    }

    /// Active configuration.
    #[inline]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Create the first user process, which has no parent.
    pub fn create_initial(&self, command_line: &str, space: Box<dyn AddressSpace>) -> Process {
        let pid = self.pids.allocate();
        debug!("initial process {} ({:?})", pid, command_line);
        Process::initial(pid, command_line, space, self.config.max_open_files)
    }

    /// Handle one syscall trap from `process`.
    ///
    /// # Arguments
    /// * `process` - The calling process
    /// * `frame` - Saved registers; `eax` receives the result
    ///
    /// # Returns
    /// Whether the process continues running
    pub fn handle_trap(&self, process: &mut Process, frame: &mut TrapFrame) -> Disposition {
        if let Some(status) = process.exit_status() {
            return Disposition::Exited(status);
        }

        let result = decode::decode(&self.validator, process.space.as_ref(), frame.stack())
            .and_then(|request| self.dispatch(process, request));

        match result {
            Ok(Completion::Value(word)) => {
                frame.eax = word;
                Disposition::Resume
            }
            Ok(Completion::Void) => Disposition::Resume,
            Ok(Completion::Exit(status)) => {
                self.exit(process, status);
                Disposition::Exited(status)
            }
            Ok(Completion::Halt) => Disposition::Halted,
            Err(err) if err.is_fatal() => {
                warn!("{} ({}): {}, terminating", process.pid(), process.name(), err);
                self.exit(process, FAULT_STATUS);
                Disposition::Exited(FAULT_STATUS)
            }
            Err(err) => {
                debug!("{}: {}", process.pid(), err);
                frame.eax = ERROR_WORD;
                Disposition::Resume
            }
        }
    }

    fn dispatch(&self, process: &mut Process, request: Request) -> SyscallResult<Completion> {
        debug!("{} {:?}", process.pid(), request);
        let completion = match request {
            Request::Halt => {
                self.halt();
                Completion::Halt
            }
            Request::Exit { status } => Completion::Exit(status),
            Request::Exec { command_line } => {
                let pid = self.exec(process, command_line.as_str().ok_or(SyscallError::LoadFailed)?)?;
                Completion::Value(pid.as_i32() as u32)
            }
            Request::Wait { pid } => Completion::Value(self.wait(process, pid)? as u32),
            Request::Create { path, initial_size } => {
                let created = path.as_str().map_or(false, |path| self.create(path, initial_size));
                Completion::Value(created as u32)
            }
            Request::Remove { path } => {
                let removed = path.as_str().map_or(false, |path| self.remove(path));
                Completion::Value(removed as u32)
            }
            Request::Open { path } => {
                let fd = self.open(process, path.as_str().ok_or(SyscallError::OpenFailed)?)?;
                Completion::Value(fd.as_i32() as u32)
            }
            Request::Filesize { fd } => Completion::Value(self.filesize(process, fd)?),
            Request::Read { fd, buffer } => Completion::Value(self.read(process, fd, &buffer)? as u32),
            Request::Write { fd, buffer } => Completion::Value(self.write(process, fd, &buffer)? as u32),
            Request::Seek { fd, position } => {
                if let Err(err) = self.seek(process, fd, position) {
                    debug!("seek: {}", err);
                }
                Completion::Void
            }
            Request::Tell { fd } => Completion::Value(self.tell(process, fd)?),
            Request::Close { fd } => {
                self.close(process, fd);
                Completion::Void
            }
        };
        Ok(completion)
    }

    /// Power off the machine.
    pub fn halt(&self) {
        debug!("halt");
        self.services.power.power_off();
    }

    /// Terminate `process` with `status`.
    ///
    /// Prints the exit message, closes the process's files, releases its
    /// children's records and hands its status to its parent.
    pub fn exit(&self, process: &mut Process, status: i32) -> ExitReport {
        if process.has_exited() {
            return process.exit(status);
        }
        if self.config.exit_messages {
            let mut console = ConsoleWriter(self.services.console.as_ref());
            let _ = writeln!(console, "{}: exit({})", process.name(), status);
        }
        let report = process.exit(status);
        debug!("{} exited: {:?}", process.pid(), report);
        report
    }

    /// Start `command_line` as a child of `process`.
    pub fn exec(&self, process: &mut Process, command_line: &str) -> SyscallResult<Pid> {
        process::spawn_child(
            process,
            command_line,
            self.services.loader.as_ref(),
            self.services.scheduler.as_ref(),
            &self.pids,
        )
    }

    /// Wait for child `pid` of `process` to exit and return its status.
    pub fn wait(&self, process: &mut Process, pid: Pid) -> SyscallResult<i32> {
        process.wait(pid, self.services.scheduler.as_ref())
    }

    /// Create a file.
    pub fn create(&self, path: &str, initial_size: u32) -> bool {
        self.services.fs.create(path, initial_size)
    }

    /// Remove a file.
    pub fn remove(&self, path: &str) -> bool {
        self.services.fs.remove(path)
    }

    /// Open a file for `process`.
    pub fn open(&self, process: &mut Process, path: &str) -> SyscallResult<Fd> {
        Ok(process.files.open(self.services.fs.as_ref(), path)?)
    }

    /// Size of an open file.
    pub fn filesize(&self, process: &mut Process, fd: Fd) -> SyscallResult<u32> {
        Ok(process.files.filesize(fd)?)
    }

    /// Read from `fd` into a validated user buffer.
    ///
    /// Data moves one page at a time; a short read from a file ends the call.
    pub fn read(&self, process: &mut Process, fd: Fd, buffer: &UserBuffer) -> SyscallResult<usize> {
        process.files.check_readable(fd)?;
        let mut chunk = [0u8; PAGE_SIZE];
        let mut total = 0;
        while total < buffer.len() {
            let want = (buffer.len() - total).min(PAGE_SIZE);
            let count = process.files.read(fd, self.services.console.as_ref(), &mut chunk[..want])?;
            total += buffer.copy_out_at(process.space.as_mut(), total, &chunk[..count]);
            if count < want {
                break;
            }
        }
        Ok(total)
    }

    /// Write a validated user buffer to `fd`.
    pub fn write(&self, process: &mut Process, fd: Fd, buffer: &UserBuffer) -> SyscallResult<usize> {
        let data = buffer.copy_in(process.space.as_ref());
        Ok(process.files.write(fd, self.services.console.as_ref(), &data)?)
    }

    /// Move the position of an open file.
    pub fn seek(&self, process: &mut Process, fd: Fd, position: u32) -> SyscallResult<()> {
        Ok(process.files.seek(fd, position)?)
    }

    /// Position of an open file.
    pub fn tell(&self, process: &mut Process, fd: Fd) -> SyscallResult<u32> {
        Ok(process.files.tell(fd)?)
    }

    /// Close an open file; unknown descriptors are ignored.
    pub fn close(&self, process: &mut Process, fd: Fd) {
        if !process.files.close(fd) {
            debug!("{}: close of unknown fd {}", process.pid(), fd);
        }
    }
}
