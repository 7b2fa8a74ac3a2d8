//! Kernel Configuration
//!
//! Fixed limits shared by the loader, the syscall layer and the
//! semaphore table. Runtime-tunable bounds for user string copies live in
//! [`SyscallLimits`].

/// Page size used for rounding user memory (4 KiB).
pub const PAGE_SIZE: usize = 4096;

/// Stack reserved above the highest loaded segment.
pub const DEFAULT_USER_STACK_SIZE: usize = 8192;

/// Maximum number of program headers accepted in one image.
pub const EXE_MAX_SEGMENTS: usize = 10;

/// Longest string a single PrintString call may write.
pub const MAX_PRINT_LENGTH: usize = 1023;

/// Longest command line accepted by Spawn.
pub const MAX_COMMAND_LENGTH: usize = 1023;

/// Longest program path accepted by Spawn.
pub const VFS_MAX_PATH_LENGTH: usize = 1023;

/// Number of slots in the semaphore table.
pub const TOTAL_SEMAPHORES: usize = 20;

/// Longest semaphore name, in bytes.
pub const MAX_SEMAPHORE_NAME_LENGTH: usize = 25;

/// Scheduling quantum bounds, in ticks (inclusive).
pub const MIN_QUANTUM: u32 = 2;
pub const MAX_QUANTUM: u32 = 100;

/// Quantum in effect before any SetSchedulingPolicy call.
pub const DEFAULT_QUANTUM: u32 = 4;

/// Entries in the global descriptor table.
pub const NUM_GDT_ENTRIES: usize = 16;

/// Entries 0..FIRST_FREE_GDT_ENTRY belong to the kernel (null, kernel
/// code, kernel data, TSS, spare).
pub const FIRST_FREE_GDT_ENTRY: usize = 5;

/// Entries in each process's local descriptor table (code, data).
pub const NUM_USER_LDT_ENTRIES: usize = 2;

/// Bounds applied by the syscall layer when copying strings in from
/// user space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyscallLimits {
    pub max_print_length: usize,
    pub max_command_length: usize,
    pub max_path_length: usize,
    pub max_semaphore_name_length: usize,
}

impl SyscallLimits {
    pub const fn new() -> Self {
        Self {
            max_print_length: MAX_PRINT_LENGTH,
            max_command_length: MAX_COMMAND_LENGTH,
            max_path_length: VFS_MAX_PATH_LENGTH,
            max_semaphore_name_length: MAX_SEMAPHORE_NAME_LENGTH,
        }
    }
}

impl Default for SyscallLimits {
    fn default() -> Self {
        Self::new()
    }
}
