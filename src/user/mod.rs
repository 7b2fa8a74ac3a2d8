//! User Processes
//!
//! Builds the isolated address space of a user process and guards every
//! kernel access to it.
//!
//! # Flow
//! image bytes -> `exe::parse` -> [`Loader::build`] -> [`ProcessAddressSpace`]
//! -> (held by the thread layer) -> [`activate`] on every switch-in, and the
//! validated copies on every syscall that touches user memory.

pub mod argblock;
mod space;
mod validate;

pub use space::{load_user_program, Loader, ProcessAddressSpace, LDT_CODE_INDEX, LDT_DATA_INDEX};
pub use validate::{activate, copy_from_user, copy_to_user, validate_user_memory};

#[cfg(test)]
pub(crate) use space::testing;
