//! Syscall Trap Entry
//!
//! The register snapshot saved by the trap stub and the glue that routes
//! it to the syscall table.
//!
//! # Calling Convention
//! - `eax`: call number on entry, result on return
//! - `ebx`, `ecx`, `edx`, `esi`: arguments in order

use crate::error::KernelError;
use crate::platform::{CriticalSection, Kernel};
use crate::syscall::numbers::NUM_SYSCALLS;
use crate::syscall::Dispatcher;

/// Registers saved on syscall entry
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterruptState {
    pub eax: u32,
    pub ebx: u32,
    pub ecx: u32,
    pub edx: u32,
    pub esi: u32,
    pub edi: u32,
    pub ebp: u32,
}

impl InterruptState {
    /// Snapshot for call `number` with up to four arguments.
    pub const fn syscall(number: usize, args: [u32; 4]) -> Self {
        Self {
            eax: number as u32,
            ebx: args[0],
            ecx: args[1],
            edx: args[2],
            esi: args[3],
            edi: 0,
            ebp: 0,
        }
    }
}

/// Handle a syscall trap from user mode.
///
/// Runs with interrupts masked; handlers that block open their own window.
/// Unknown call numbers are rejected here, before reaching the table.
pub fn handle_syscall<K: Kernel>(dispatcher: &Dispatcher<K>, state: &mut InterruptState) {
    let _masked = CriticalSection::enter(dispatcher.kernel());

    let number = state.eax as usize;
    let result = if number < NUM_SYSCALLS {
        dispatcher.dispatch(state)
    } else {
        log::warn!("unknown syscall {}", number);
        KernelError::Unsupported.code()
    };
    state.eax = result as u32;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syscall::mock::MockKernel;
    use crate::syscall::numbers::{SYS_GETPID, SYS_SPAWN};

    #[test]
    fn test_result_lands_in_eax() {
        let d = Dispatcher::new(MockKernel::new(7));
        let mut state = InterruptState::syscall(SYS_GETPID, [0; 4]);
        handle_syscall(&d, &mut state);
        assert_eq!(state.eax, 7);
        assert!(d.kernel().interrupts_enabled());
    }

    #[test]
    fn test_unknown_number_is_rejected() {
        let d = Dispatcher::new(MockKernel::new(7));
        let mut state = InterruptState::syscall(1000, [1, 2, 3, 4]);
        handle_syscall(&d, &mut state);
        assert_eq!(state.eax as i32, KernelError::Unsupported.code());
        assert_eq!(state.ebx, 1);
    }

    #[test]
    fn test_handler_runs_masked_except_in_window() {
        let d = Dispatcher::new(MockKernel::new(7));
        let space = d.kernel().space();
        assert!(space.copy_to_user(64, b"/c/a.exe"));
        assert!(space.copy_to_user(96, b"a"));

        let mut state = InterruptState::syscall(SYS_SPAWN, [64, 8, 96, 1]);
        handle_syscall(&d, &mut state);
        assert_eq!(state.eax, 42);
        assert_eq!(d.kernel().interrupts_during_last_call(), Some(true));
        assert!(d.kernel().interrupts_enabled());
    }

    #[test]
    fn test_masked_caller_stays_masked() {
        let d = Dispatcher::new(MockKernel::new(7));
        d.kernel().interrupts_masked();
        let mut state = InterruptState::syscall(SYS_GETPID, [0; 4]);
        handle_syscall(&d, &mut state);
        assert!(!d.kernel().interrupts_enabled());
    }
}
