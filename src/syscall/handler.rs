//! System Call Handler
//!
//! Dispatches system calls and implements individual syscall handlers.
//!
//! # Security Considerations
//! - The table is fixed; unknown numbers return `Unsupported`
//! - Pointer arguments are offsets into the caller's own address space
//!   and are only dereferenced through the validated copy primitives
//! - Lengths are bounded before any kernel buffer is allocated
//! - Handlers that may run for unbounded time re-enable interrupts only
//!   around the long call

use spin::Mutex;

use super::user_string::UserString;
use crate::config::{SyscallLimits, DEFAULT_QUANTUM, MAX_QUANTUM, MIN_QUANTUM};
use crate::error::{into_syscall_return, KernelError, KernelResult};
use crate::platform::{InterruptWindow, Kernel, Pid};
use crate::sync::{Acquire, SemaphoreTable};
use crate::trap::InterruptState;
use crate::user::copy_to_user;

/// System call numbers
///
/// The order is part of the user ABI.
pub mod numbers {
    pub const SYS_NULL: usize = 0;
    pub const SYS_EXIT: usize = 1;
    pub const SYS_PRINTSTRING: usize = 2;
    pub const SYS_GETKEY: usize = 3;
    pub const SYS_SETATTR: usize = 4;
    pub const SYS_GETCURSOR: usize = 5;
    pub const SYS_PUTCURSOR: usize = 6;
    pub const SYS_SPAWN: usize = 7;
    pub const SYS_WAIT: usize = 8;
    pub const SYS_GETPID: usize = 9;
    pub const SYS_SETSCHEDULINGPOLICY: usize = 10;
    pub const SYS_GETTIMEOFDAY: usize = 11;
    pub const SYS_CREATESEMAPHORE: usize = 12;
    pub const SYS_P: usize = 13;
    pub const SYS_V: usize = 14;
    pub const SYS_DESTROYSEMAPHORE: usize = 15;

    /// Number of entries in the syscall table.
    pub const NUM_SYSCALLS: usize = 16;
}

/// Scheduling policies selectable from user space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum SchedulingPolicy {
    RoundRobin = 0,
    MultilevelFeedback = 1,
}

impl SchedulingPolicy {
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::RoundRobin),
            1 => Some(Self::MultilevelFeedback),
            _ => None,
        }
    }
}

/// Scheduler configuration written by SetSchedulingPolicy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulingState {
    pub current: SchedulingPolicy,
    pub previous: SchedulingPolicy,
    /// Ticks per quantum.
    pub quantum: u32,
}

impl SchedulingState {
    pub const fn new() -> Self {
        Self {
            current: SchedulingPolicy::RoundRobin,
            previous: SchedulingPolicy::RoundRobin,
            quantum: DEFAULT_QUANTUM,
        }
    }

    fn apply(&mut self, policy: SchedulingPolicy, quantum: u32) {
        if self.current != policy {
            self.previous = self.current;
            self.current = policy;
        }
        self.quantum = quantum;
    }
}

impl Default for SchedulingState {
    fn default() -> Self {
        Self::new()
    }
}

type Handler<K> = fn(&Dispatcher<K>, &InterruptState) -> KernelResult<i32>;

/// The syscall table together with the kernel state only syscalls touch.
pub struct Dispatcher<K: Kernel> {
    kernel: K,
    semaphores: SemaphoreTable,
    scheduling: Mutex<SchedulingState>,
    limits: SyscallLimits,
}

impl<K: Kernel> Dispatcher<K> {
    const TABLE: [Handler<K>; numbers::NUM_SYSCALLS] = [
        Self::sys_null,
        Self::sys_exit,
        Self::sys_print_string,
        Self::sys_get_key,
        Self::sys_set_attr,
        Self::sys_get_cursor,
        Self::sys_put_cursor,
        Self::sys_spawn,
        Self::sys_wait,
        Self::sys_get_pid,
        Self::sys_set_scheduling_policy,
        Self::sys_get_time_of_day,
        Self::sys_create_semaphore,
        Self::sys_p,
        Self::sys_v,
        Self::sys_destroy_semaphore,
    ];

    pub fn new(kernel: K) -> Self {
        Self::with_limits(kernel, SyscallLimits::default())
    }

    pub fn with_limits(kernel: K, limits: SyscallLimits) -> Self {
        Self {
            kernel,
            semaphores: SemaphoreTable::new(),
            scheduling: Mutex::new(SchedulingState::new()),
            limits,
        }
    }

    #[inline]
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    #[inline]
    pub fn semaphores(&self) -> &SemaphoreTable {
        &self.semaphores
    }

    pub fn scheduling(&self) -> SchedulingState {
        *self.scheduling.lock()
    }

    /// Run the handler for the call number in `state.eax`.
    ///
    /// # Returns
    /// The value for the user's return register: the handler's result, or
    /// a negative error code.
    pub fn dispatch(&self, state: &InterruptState) -> i32 {
        match Self::TABLE.get(state.eax as usize) {
            Some(handler) => into_syscall_return(handler(self, state)),
            None => {
                log::warn!("unknown syscall {}", state.eax);
                KernelError::Unsupported.code()
            }
        }
    }

    fn user_string(&self, user_offset: u32, len: u32, max_len: usize) -> KernelResult<UserString> {
        UserString::copy_in(&self.kernel, user_offset as usize, len as usize, max_len)
    }

    /// Null system call. Always returns 0.
    fn sys_null(&self, _state: &InterruptState) -> KernelResult<i32> {
        Ok(0)
    }

    /// Exit system call.
    ///
    /// * `ebx` - exit code
    ///
    /// Never returns to the caller.
    fn sys_exit(&self, state: &InterruptState) -> KernelResult<i32> {
        log::debug!("pid {} exit({})", self.kernel.current_pid(), state.ebx as i32);
        self.kernel.exit(state.ebx as i32)
    }

    /// Print a string to the console.
    ///
    /// * `ebx` - user address of the string
    /// * `ecx` - number of bytes
    fn sys_print_string(&self, state: &InterruptState) -> KernelResult<i32> {
        if state.ecx == 0 {
            return Ok(0);
        }
        let text = self.user_string(state.ebx, state.ecx, self.limits.max_print_length)?;
        self.kernel.put_buf(text.as_bytes());
        Ok(0)
    }

    /// Wait for a key press and return its code.
    ///
    /// Background processes (anywhere up the owner chain) may not read the
    /// keyboard.
    fn sys_get_key(&self, _state: &InterruptState) -> KernelResult<i32> {
        let mut next = Some(self.kernel.current_pid());
        while let Some(info) = next.and_then(|pid| self.kernel.thread_info(pid)) {
            if !info.has_user_context {
                break;
            }
            if info.background {
                log::warn!("background pid {} asked for a key", info.pid);
                return Err(KernelError::InvalidArgument);
            }
            next = info.owner;
        }
        Ok(self.kernel.wait_for_key() as i32)
    }

    /// Set the current text attributes.
    ///
    /// * `ebx` - attribute byte
    fn sys_set_attr(&self, state: &InterruptState) -> KernelResult<i32> {
        self.kernel.set_attr(state.ebx as u8);
        Ok(0)
    }

    /// Get the cursor position.
    ///
    /// * `ebx` - user address of an `i32` receiving the row
    /// * `ecx` - user address of an `i32` receiving the column
    fn sys_get_cursor(&self, state: &InterruptState) -> KernelResult<i32> {
        let (row, col) = self.kernel.cursor();
        if !copy_to_user(&self.kernel, state.ebx as usize, &row.to_le_bytes())
            || !copy_to_user(&self.kernel, state.ecx as usize, &col.to_le_bytes())
        {
            return Err(KernelError::InvalidArgument);
        }
        Ok(0)
    }

    /// Move the cursor.
    ///
    /// * `ebx` - row
    /// * `ecx` - column
    fn sys_put_cursor(&self, state: &InterruptState) -> KernelResult<i32> {
        if self.kernel.put_cursor(state.ebx as i32, state.ecx as i32) {
            Ok(0)
        } else {
            Err(KernelError::InvalidArgument)
        }
    }

    /// Create a new user process.
    ///
    /// * `ebx`, `ecx` - user address and length of the program path
    /// * `edx`, `esi` - user address and length of the command line
    ///
    /// Returns the new pid.
    fn sys_spawn(&self, state: &InterruptState) -> KernelResult<i32> {
        let program = self.user_string(state.ebx, state.ecx, self.limits.max_path_length)?;
        let command = self.user_string(state.edx, state.esi, self.limits.max_command_length)?;
        let program = program.as_str()?;
        let command = command.as_str()?;

        let pid = {
            let _window = InterruptWindow::open(&self.kernel);
            self.kernel.spawn(program, command)
        };
        match pid {
            Ok(pid) => log::info!("spawned {} as pid {}", program, pid),
            Err(e) => log::warn!("spawn {} failed: {}", program, e),
        }
        pid
    }

    /// Wait for a process to exit.
    ///
    /// * `ebx` - pid to wait for
    ///
    /// Returns the exit code of the process.
    fn sys_wait(&self, state: &InterruptState) -> KernelResult<i32> {
        let pid = state.ebx as Pid;
        if self.kernel.thread_info(pid).is_none() {
            return Err(KernelError::NotFound);
        }

        let _window = InterruptWindow::open(&self.kernel);
        Ok(self.kernel.join(pid))
    }

    /// Pid of the calling process.
    fn sys_get_pid(&self, _state: &InterruptState) -> KernelResult<i32> {
        Ok(self.kernel.current_pid())
    }

    /// Set the scheduling policy.
    ///
    /// * `ebx` - policy (0 round robin, 1 multilevel feedback)
    /// * `ecx` - ticks per quantum, `MIN_QUANTUM..=MAX_QUANTUM`
    fn sys_set_scheduling_policy(&self, state: &InterruptState) -> KernelResult<i32> {
        let policy = SchedulingPolicy::from_raw(state.ebx).ok_or(KernelError::InvalidArgument)?;
        let quantum = state.ecx;
        if !(MIN_QUANTUM..=MAX_QUANTUM).contains(&quantum) {
            return Err(KernelError::InvalidArgument);
        }
        self.scheduling.lock().apply(policy, quantum);
        Ok(0)
    }

    /// Current tick count.
    fn sys_get_time_of_day(&self, _state: &InterruptState) -> KernelResult<i32> {
        Ok(self.kernel.ticks() as i32)
    }

    /// Create (or open) a named semaphore.
    ///
    /// * `ebx`, `ecx` - user address and length of the name
    /// * `edx` - initial count, used only if the name is new
    ///
    /// Returns the semaphore id.
    fn sys_create_semaphore(&self, state: &InterruptState) -> KernelResult<i32> {
        let name = self.user_string(state.ebx, state.ecx, self.limits.max_semaphore_name_length)?;
        self.semaphores.create(name.as_bytes(), state.edx as i32)
    }

    /// Acquire a semaphore.
    ///
    /// * `ebx` - semaphore id
    ///
    /// If the count is not positive the caller sleeps on the semaphore and,
    /// once woken, gets `WouldBlock` back; it must call P again.
    fn sys_p(&self, state: &InterruptState) -> KernelResult<i32> {
        let id = state.ebx as i32;
        match self.semaphores.acquire(id, self.kernel.current_pid())? {
            Acquire::Acquired => Ok(0),
            Acquire::Blocked => {
                self.kernel.suspend_current();
                Err(KernelError::WouldBlock)
            }
        }
    }

    /// Release a semaphore.
    ///
    /// * `ebx` - semaphore id
    fn sys_v(&self, state: &InterruptState) -> KernelResult<i32> {
        self.semaphores
            .release(state.ebx as i32, |pid| self.kernel.wake(pid))?;
        Ok(0)
    }

    /// Drop a reference to a semaphore.
    ///
    /// * `ebx` - semaphore id
    fn sys_destroy_semaphore(&self, state: &InterruptState) -> KernelResult<i32> {
        self.semaphores
            .destroy(state.ebx as i32, |pid| self.kernel.wake(pid))?;
        Ok(0)
    }
}
