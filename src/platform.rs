//! Platform Collaborators
//!
//! Narrow contracts for everything this crate consumes but does not
//! implement: the thread scheduler, console and keyboard drivers, the tick
//! counter, interrupt masking, and the privileged LDT load.
//!
//! # Concurrency
//! The kernel is single-core. Masking interrupts is the one global
//! critical section; [`CriticalSection`] and [`InterruptWindow`] are the
//! scoped forms of "disable" and "enable" so that every path restores the
//! expected state.

use alloc::sync::Arc;

use crate::error::KernelResult;
use crate::seg::Selector;
use crate::user::ProcessAddressSpace;

/// Process/thread identifier.
pub type Pid = i32;

/// Scheduler view of one thread, as needed by the syscall layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadInfo {
    pub pid: Pid,
    /// Thread that owns (spawned) this one, if any.
    pub owner: Option<Pid>,
    /// Whether the thread runs a user program.
    pub has_user_context: bool,
    /// Whether the process was started in the background.
    pub background: bool,
}

/// Thread lifecycle and blocking primitives.
pub trait Threads {
    /// Pid of the thread executing the current syscall.
    fn current_pid(&self) -> Pid;

    /// Look up a live thread.
    fn thread_info(&self, pid: Pid) -> Option<ThreadInfo>;

    /// Address space of the current thread; `None` for kernel threads.
    fn current_address_space(&self) -> Option<Arc<ProcessAddressSpace>>;

    /// Terminate the current process.
    fn exit(&self, code: i32) -> !;

    /// Load and start a new user process.
    fn spawn(&self, program: &str, command: &str) -> KernelResult<Pid>;

    /// Block until `pid` terminates and return its exit code.
    fn join(&self, pid: Pid) -> i32;

    /// Move the current thread off the run queue and schedule another.
    /// Returns once the thread has been woken.
    fn suspend_current(&self);

    /// Make a suspended thread runnable again.
    fn wake(&self, pid: Pid);
}

/// Text console.
pub trait Console {
    fn put_buf(&self, buf: &[u8]);
    fn set_attr(&self, attr: u8);
    /// Current cursor position as `(row, col)`.
    fn cursor(&self) -> (i32, i32);
    /// Move the cursor; false if the position is off screen.
    fn put_cursor(&self, row: i32, col: i32) -> bool;
}

/// Keyboard input.
pub trait Keyboard {
    /// Block until a key is available and return its code.
    fn wait_for_key(&self) -> u16;
}

/// Timer tick counter.
pub trait Clock {
    fn ticks(&self) -> u32;
}

/// Interrupt masking.
pub trait Interrupts {
    fn enable(&self);
    fn disable(&self);
    fn enabled(&self) -> bool;
}

/// The privileged "switch addressing context" instruction.
pub trait SegmentLoader {
    fn load_ldt(&self, selector: Selector);
}

/// Everything the syscall dispatcher needs from the rest of the kernel.
pub trait Kernel: Threads + Console + Keyboard + Clock + Interrupts {}

impl<T: Threads + Console + Keyboard + Clock + Interrupts> Kernel for T {}

/// Masks interrupts for its lifetime and restores the previous state on
/// drop.
#[must_use]
pub struct CriticalSection<'a, I: Interrupts + ?Sized> {
    irq: &'a I,
    was_enabled: bool,
}

impl<'a, I: Interrupts + ?Sized> CriticalSection<'a, I> {
    pub fn enter(irq: &'a I) -> Self {
        let was_enabled = irq.enabled();
        if was_enabled {
            irq.disable();
        }
        Self { irq, was_enabled }
    }
}

impl<I: Interrupts + ?Sized> Drop for CriticalSection<'_, I> {
    fn drop(&mut self) {
        if self.was_enabled {
            self.irq.enable();
        }
    }
}

/// Opens a window with interrupts enabled inside a masked region.
///
/// Used around calls that run for unbounded time (spawn, join). Interrupts
/// are masked again when the window closes, on every exit path.
#[must_use]
pub struct InterruptWindow<'a, I: Interrupts + ?Sized> {
    irq: &'a I,
}

impl<'a, I: Interrupts + ?Sized> InterruptWindow<'a, I> {
    pub fn open(irq: &'a I) -> Self {
        irq.enable();
        Self { irq }
    }
}

impl<I: Interrupts + ?Sized> Drop for InterruptWindow<'_, I> {
    fn drop(&mut self) {
        self.irq.disable();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    struct FakeIrq {
        enabled: Cell<bool>,
        transitions: Cell<u32>,
    }

    impl Interrupts for FakeIrq {
        fn enable(&self) {
            self.enabled.set(true);
            self.transitions.set(self.transitions.get() + 1);
        }
        fn disable(&self) {
            self.enabled.set(false);
            self.transitions.set(self.transitions.get() + 1);
        }
        fn enabled(&self) -> bool {
            self.enabled.get()
        }
    }

    #[test]
    fn test_critical_section_restores_enabled() {
        let irq = FakeIrq { enabled: Cell::new(true), transitions: Cell::new(0) };
        {
            let _cs = CriticalSection::enter(&irq);
            assert!(!irq.enabled());
        }
        assert!(irq.enabled());
    }

    #[test]
    fn test_critical_section_nested_in_masked_region() {
        let irq = FakeIrq { enabled: Cell::new(false), transitions: Cell::new(0) };
        {
            let _cs = CriticalSection::enter(&irq);
        }
        assert!(!irq.enabled());
        assert_eq!(irq.transitions.get(), 0);
    }

    #[test]
    fn test_interrupt_window() {
        let irq = FakeIrq { enabled: Cell::new(false), transitions: Cell::new(0) };
        {
            let _window = InterruptWindow::open(&irq);
            assert!(irq.enabled());
        }
        assert!(!irq.enabled());
    }
}
