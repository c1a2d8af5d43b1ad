//! Memory management interface for the syscall layer
//!
//! Provides:
//! - User address types and the user/kernel split
//! - The address-space interface the validator checks pointers against
//!
//! Page tables themselves belong to the VM subsystem and are not
//! implemented here.

pub mod address;
mod space;

pub use address::{regions, UserAddr, PAGE_SIZE, WORD_SIZE};
pub use space::{AddressSpace, PageFlags};
