//! Kernel Error Codes
//!
//! A single error type shared by the loader, the semaphore table and the
//! syscall handlers. Every variant maps to a fixed negative code that is
//! returned verbatim to user programs.

use core::fmt;

/// Errors reported by this crate.
///
/// The discriminant is the code placed in the user's return register.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// Generic failure with no better classification.
    Unspecified = -1,
    /// Unknown pid or nonexistent semaphore.
    NotFound = -2,
    /// Unknown system call number.
    Unsupported = -3,
    /// The caller was queued on a semaphore and must retry.
    WouldBlock = -6,
    /// Kernel or user memory allocation failed.
    OutOfMemory = -7,
    /// Bad length, bad user pointer, bad policy or quantum.
    InvalidArgument = -12,
    /// No free descriptor table entry.
    ResourceExhausted = -13,
    /// Semaphore table is full.
    NoSlotAvailable = -16,
    /// Malformed or oversized executable image.
    FormatError = -18,
}

impl KernelError {
    /// The integer code returned across the syscall boundary.
    #[inline]
    pub const fn code(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unspecified => write!(f, "unspecified error"),
            Self::NotFound => write!(f, "not found"),
            Self::Unsupported => write!(f, "unsupported system call"),
            Self::WouldBlock => write!(f, "operation would block"),
            Self::OutOfMemory => write!(f, "out of memory"),
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::ResourceExhausted => write!(f, "descriptor table exhausted"),
            Self::NoSlotAvailable => write!(f, "no semaphore slot available"),
            Self::FormatError => write!(f, "invalid executable format"),
        }
    }
}

pub type KernelResult<T> = Result<T, KernelError>;

/// Collapse a handler result into the syscall return value.
#[inline]
pub fn into_syscall_return(result: KernelResult<i32>) -> i32 {
    match result {
        Ok(value) => value,
        Err(e) => e.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_negative() {
        let all = [
            KernelError::Unspecified,
            KernelError::NotFound,
            KernelError::Unsupported,
            KernelError::WouldBlock,
            KernelError::OutOfMemory,
            KernelError::InvalidArgument,
            KernelError::ResourceExhausted,
            KernelError::NoSlotAvailable,
            KernelError::FormatError,
        ];
        for e in all {
            assert!(e.code() < 0, "{} has non-negative code", e);
        }
    }

    #[test]
    fn test_into_syscall_return() {
        assert_eq!(into_syscall_return(Ok(7)), 7);
        assert_eq!(into_syscall_return(Err(KernelError::NotFound)), -2);
    }
}
