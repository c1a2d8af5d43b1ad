//! System call numbers and signatures
//!
//! Every call the gateway accepts is listed in `TABLE` together with the
//! kinds of its word-sized arguments. The gateway validates arguments from
//! this table before any handler runs; anything not listed is rejected.

/// System call numbers.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallId {
    Halt = 0,
    Exit = 1,
    Exec = 2,
    Wait = 3,
    Create = 4,
    Remove = 5,
    Open = 6,
    Filesize = 7,
    Read = 8,
    Write = 9,
    Seek = 10,
    Tell = 11,
    Close = 12,
}

/// What the kernel does with a user buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// The kernel reads from the buffer (`write`).
    Readable,
    /// The kernel writes into the buffer (`read`).
    Writable,
}

/// Kind of one syscall argument word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// Signed integer (status, pid, fd).
    Int,
    /// Unsigned integer (size, position, length).
    Uint,
    /// Pointer to a NUL-terminated string.
    Str,
    /// Pointer to a buffer whose length is argument `len_arg`.
    Buffer { len_arg: usize, access: Access },
}

/// Signature of one system call.
#[derive(Debug)]
pub struct SyscallSpec {
    pub id: SyscallId,
    pub name: &'static str,
    pub args: &'static [ArgKind],
}

impl SyscallSpec {
    /// Number of argument words following the syscall number.
    #[inline]
    pub const fn arity(&self) -> usize {
        self.args.len()
    }
}

/// Largest arity in the table.
pub const MAX_ARGS: usize = 3;

use ArgKind::{Int, Str, Uint};

const READ_BUFFER: ArgKind = ArgKind::Buffer {
    len_arg: 2,
    access: Access::Writable,
};
const WRITE_BUFFER: ArgKind = ArgKind::Buffer {
    len_arg: 2,
    access: Access::Readable,
};

/// The dispatch table, indexed by syscall number.
pub static TABLE: [SyscallSpec; 13] = [
    SyscallSpec { id: SyscallId::Halt, name: "halt", args: &[] },
    SyscallSpec { id: SyscallId::Exit, name: "exit", args: &[Int] },
    SyscallSpec { id: SyscallId::Exec, name: "exec", args: &[Str] },
    SyscallSpec { id: SyscallId::Wait, name: "wait", args: &[Int] },
    SyscallSpec { id: SyscallId::Create, name: "create", args: &[Str, Uint] },
    SyscallSpec { id: SyscallId::Remove, name: "remove", args: &[Str] },
    SyscallSpec { id: SyscallId::Open, name: "open", args: &[Str] },
    SyscallSpec { id: SyscallId::Filesize, name: "filesize", args: &[Int] },
    SyscallSpec { id: SyscallId::Read, name: "read", args: &[Int, READ_BUFFER, Uint] },
    SyscallSpec { id: SyscallId::Write, name: "write", args: &[Int, WRITE_BUFFER, Uint] },
    SyscallSpec { id: SyscallId::Seek, name: "seek", args: &[Int, Uint] },
    SyscallSpec { id: SyscallId::Tell, name: "tell", args: &[Int] },
    SyscallSpec { id: SyscallId::Close, name: "close", args: &[Int] },
];

/// Look up a syscall number.
pub fn lookup(number: u32) -> Option<&'static SyscallSpec> {
    TABLE.get(number as usize)
}
