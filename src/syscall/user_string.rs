//! Kernel copies of user strings
//!
//! Syscalls never read user memory in place. A string argument is copied
//! into a kernel-owned buffer whose lifetime is the handler's scope; the
//! buffer is released on every return path when it goes out of scope.

use alloc::vec::Vec;

use crate::error::{KernelError, KernelResult};
use crate::platform::Threads;
use crate::user::copy_from_user;

/// A string copied in from user space.
#[derive(Debug, PartialEq, Eq)]
pub struct UserString {
    bytes: Vec<u8>,
}

impl UserString {
    /// Copy `len` bytes at `user_offset` of the current process.
    ///
    /// # Errors
    /// - `InvalidArgument`: `len > max_len` or the range is not user memory
    /// - `OutOfMemory`: the kernel buffer could not be allocated
    pub fn copy_in<T: Threads + ?Sized>(
        threads: &T,
        user_offset: usize,
        len: usize,
        max_len: usize,
    ) -> KernelResult<Self> {
        if len > max_len {
            return Err(KernelError::InvalidArgument);
        }

        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(len)
            .map_err(|_| KernelError::OutOfMemory)?;
        bytes.resize(len, 0);

        if !copy_from_user(threads, &mut bytes, user_offset) {
            log::warn!("rejected user buffer at {:#x} (+{})", user_offset, len);
            return Err(KernelError::InvalidArgument);
        }
        Ok(Self { bytes })
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The string as UTF-8 text.
    pub fn as_str(&self) -> KernelResult<&str> {
        core::str::from_utf8(&self.bytes).map_err(|_| KernelError::InvalidArgument)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syscall::mock::MockKernel;

    #[test]
    fn test_copy_in() {
        let kernel = MockKernel::new(1);
        assert!(kernel.space().copy_to_user(300, b"name"));
        let s = UserString::copy_in(&kernel, 300, 4, 25).unwrap();
        assert_eq!(s.as_bytes(), b"name");
        assert_eq!(s.as_str(), Ok("name"));
        assert_eq!(s.len(), 4);
    }

    #[test]
    fn test_length_limit_checked_first() {
        let kernel = MockKernel::new(1);
        assert_eq!(
            UserString::copy_in(&kernel, usize::MAX, 26, 25),
            Err(KernelError::InvalidArgument)
        );
    }

    #[test]
    fn test_outside_user_memory() {
        let kernel = MockKernel::new(1);
        let size = kernel.space().size();
        assert_eq!(
            UserString::copy_in(&kernel, size - 2, 4, 25),
            Err(KernelError::InvalidArgument)
        );
        assert!(UserString::copy_in(&kernel, size - 4, 4, 25).is_ok());
    }

    #[test]
    fn test_invalid_utf8() {
        let kernel = MockKernel::new(1);
        assert!(kernel.space().copy_to_user(0, &[0xff, 0xfe]));
        let s = UserString::copy_in(&kernel, 0, 2, 25).unwrap();
        assert_eq!(s.as_str(), Err(KernelError::InvalidArgument));
    }
}
