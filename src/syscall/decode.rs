//! Trap decoding
//!
//! Turns the words on the caller's stack into a typed `Request`:
//! syscall number at `esp`, then `arity` argument words. Each argument is
//! validated according to its `ArgKind` before the request is built.

use alloc::vec::Vec;

use super::error::SyscallError;
use super::numbers::{self, ArgKind, SyscallId, MAX_ARGS};
use super::validate::{UserBuffer, UserString, Validator};
use crate::fs::Fd;
use crate::mm::{AddressSpace, UserAddr, WORD_SIZE};
use crate::process::Pid;

/// A fully validated system call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Halt,
    Exit { status: i32 },
    Exec { command_line: UserString },
    Wait { pid: Pid },
    Create { path: UserString, initial_size: u32 },
    Remove { path: UserString },
    Open { path: UserString },
    Filesize { fd: Fd },
    Read { fd: Fd, buffer: UserBuffer },
    Write { fd: Fd, buffer: UserBuffer },
    Seek { fd: Fd, position: u32 },
    Tell { fd: Fd },
    Close { fd: Fd },
}

impl Request {
    /// Syscall number of this request.
    pub fn id(&self) -> SyscallId {
        match self {
            Self::Halt => SyscallId::Halt,
            Self::Exit { .. } => SyscallId::Exit,
            Self::Exec { .. } => SyscallId::Exec,
            Self::Wait { .. } => SyscallId::Wait,
            Self::Create { .. } => SyscallId::Create,
            Self::Remove { .. } => SyscallId::Remove,
            Self::Open { .. } => SyscallId::Open,
            Self::Filesize { .. } => SyscallId::Filesize,
            Self::Read { .. } => SyscallId::Read,
            Self::Write { .. } => SyscallId::Write,
            Self::Seek { .. } => SyscallId::Seek,
            Self::Tell { .. } => SyscallId::Tell,
            Self::Close { .. } => SyscallId::Close,
        }
    }
}

/// One validated argument.
#[derive(Debug)]
enum Arg {
    Int(i32),
    Uint(u32),
    Str(UserString),
    Buffer(UserBuffer),
}

/// Hands out validated arguments in signature order.
struct Args(alloc::vec::IntoIter<Arg>);

impl Args {
    fn int(&mut self) -> Result<i32, SyscallError> {
        match self.0.next() {
            Some(Arg::Int(value)) => Ok(value),
            _ => Err(SyscallError::InvalidArgument),
        }
    }

    fn uint(&mut self) -> Result<u32, SyscallError> {
        match self.0.next() {
            Some(Arg::Uint(value)) => Ok(value),
            _ => Err(SyscallError::InvalidArgument),
        }
    }

    fn string(&mut self) -> Result<UserString, SyscallError> {
        match self.0.next() {
            Some(Arg::Str(value)) => Ok(value),
            _ => Err(SyscallError::InvalidArgument),
        }
    }

    fn buffer(&mut self) -> Result<UserBuffer, SyscallError> {
        match self.0.next() {
            Some(Arg::Buffer(value)) => Ok(value),
            _ => Err(SyscallError::InvalidArgument),
        }
    }

    fn fd(&mut self) -> Result<Fd, SyscallError> {
        self.int().map(Fd::new)
    }
}

/// Read, validate and type the system call whose frame starts at `esp`.
pub fn decode(validator: &Validator, space: &dyn AddressSpace, esp: UserAddr) -> Result<Request, SyscallError> {
    let number = validator.read_word(space, esp)?;
    let entry = numbers::lookup(number).ok_or(SyscallError::UnknownSyscall(number))?;

    let mut raw = [0u32; MAX_ARGS];
    for (index, word) in raw.iter_mut().enumerate().take(entry.arity()) {
        let slot = esp
            .checked_add((index + 1) * WORD_SIZE)
            .ok_or(SyscallError::BadAddress)?;
        *word = validator.read_word(space, slot)?;
    }

    let mut args = Vec::with_capacity(entry.arity());
    for (index, kind) in entry.args.iter().enumerate() {
        let word = raw[index];
        let arg = match *kind {
            ArgKind::Int => Arg::Int(word as i32),
            ArgKind::Uint => Arg::Uint(word),
            ArgKind::Str => Arg::Str(validator.read_str(space, UserAddr::from(word))?),
            ArgKind::Buffer { len_arg, access } => {
                let len = raw[len_arg] as usize;
                Arg::Buffer(validator.check_range(space, UserAddr::from(word), len, access)?)
            }
        };
        args.push(arg);
    }

    build(entry.id, Args(args.into_iter()))
}

fn build(id: SyscallId, mut args: Args) -> Result<Request, SyscallError> {
    let request = match id {
        SyscallId::Halt => Request::Halt,
        SyscallId::Exit => Request::Exit { status: args.int()? },
        SyscallId::Exec => Request::Exec {
            command_line: args.string()?,
        },
        SyscallId::Wait => Request::Wait {
            pid: Pid::new(args.int()?),
        },
        SyscallId::Create => Request::Create {
            path: args.string()?,
            initial_size: args.uint()?,
        },
        SyscallId::Remove => Request::Remove { path: args.string()? },
        SyscallId::Open => Request::Open { path: args.string()? },
        SyscallId::Filesize => Request::Filesize { fd: args.fd()? },
        SyscallId::Read => {
            let fd = args.fd()?;
            let buffer = args.buffer()?;
            args.uint()?;
            Request::Read { fd, buffer }
        }
        SyscallId::Write => {
            let fd = args.fd()?;
            let buffer = args.buffer()?;
            args.uint()?;
            Request::Write { fd, buffer }
        }
        SyscallId::Seek => Request::Seek {
            fd: args.fd()?,
            position: args.uint()?,
        },
        SyscallId::Tell => Request::Tell { fd: args.fd()? },
        SyscallId::Close => Request::Close { fd: args.fd()? },
    };
    Ok(request)
}
