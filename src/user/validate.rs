//! User/Kernel Boundary
//!
//! Every access to process memory from the kernel goes through here.
//!
//! # Security Principles
//! - User addresses are offsets into the caller's own backing region
//! - A range is admitted only if it lies entirely inside that region
//! - Rejected copies touch nothing: no partial reads or writes
//! - Data is copied into kernel buffers before use (no TOCTOU on user memory)

use super::space::ProcessAddressSpace;
use crate::platform::{SegmentLoader, Threads};

/// Check that `[offset, offset + length)` lies inside `space`.
///
/// `offset` is checked first so `size - offset` cannot underflow.
#[inline]
pub fn validate_user_memory(space: &ProcessAddressSpace, offset: usize, length: usize) -> bool {
    fits(space.size(), offset, length)
}

#[inline]
const fn fits(size: usize, offset: usize, length: usize) -> bool {
    if offset >= size {
        return false;
    }
    length <= size - offset
}

impl ProcessAddressSpace {
    /// See [`validate_user_memory`].
    #[inline]
    pub fn validate(&self, offset: usize, length: usize) -> bool {
        validate_user_memory(self, offset, length)
    }

    /// Copy `dest.len()` bytes starting at `user_offset` into `dest`.
    ///
    /// Returns false, leaving `dest` untouched, if the range is invalid.
    pub fn copy_from_user(&self, dest: &mut [u8], user_offset: usize) -> bool {
        if !self.validate(user_offset, dest.len()) {
            return false;
        }
        self.with_memory(|mem| {
            dest.copy_from_slice(&mem[user_offset..user_offset + dest.len()]);
        });
        true
    }

    /// Copy `src` into user memory at `user_offset`.
    ///
    /// Returns false, leaving user memory untouched, if the range is
    /// invalid.
    pub fn copy_to_user(&self, user_offset: usize, src: &[u8]) -> bool {
        if !self.validate(user_offset, src.len()) {
            return false;
        }
        self.with_memory(|mem| {
            mem[user_offset..user_offset + src.len()].copy_from_slice(src);
        });
        true
    }
}

/// Copy from the current process's memory into a kernel buffer.
///
/// Fails for kernel threads, which have no user memory.
pub fn copy_from_user<T: Threads + ?Sized>(threads: &T, dest: &mut [u8], user_offset: usize) -> bool {
    match threads.current_address_space() {
        Some(space) => space.copy_from_user(dest, user_offset),
        None => false,
    }
}

/// Copy a kernel buffer into the current process's memory.
pub fn copy_to_user<T: Threads + ?Sized>(threads: &T, user_offset: usize, src: &[u8]) -> bool {
    match threads.current_address_space() {
        Some(space) => space.copy_to_user(user_offset, src),
        None => false,
    }
}

/// Make `space` the active addressing context by loading its LDT.
pub fn activate<L: SegmentLoader + ?Sized>(space: &ProcessAddressSpace, loader: &L) {
    loader.load_ldt(space.ldt_selector());
}
