//! Recording kernel used by the syscall and trap tests.

use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use crate::error::{KernelError, KernelResult};
use crate::platform::{Clock, Console, Interrupts, Keyboard, Pid, ThreadInfo, Threads};
use crate::user::testing::sample_space;
use crate::user::ProcessAddressSpace;

const SCREEN_ROWS: i32 = 25;
const SCREEN_COLS: i32 = 80;

pub struct MockKernel {
    pid: Pid,
    space: Option<Arc<ProcessAddressSpace>>,
    threads: RefCell<Vec<ThreadInfo>>,
    console: RefCell<Vec<u8>>,
    attr: Cell<u8>,
    cursor: Cell<(i32, i32)>,
    key: u16,
    ticks: u32,
    exit_code: i32,
    spawn_error: Option<KernelError>,
    spawned: RefCell<Vec<(String, String)>>,
    interrupts: Cell<bool>,
    interrupts_in_call: Cell<Option<bool>>,
    suspensions: Cell<usize>,
    woken: RefCell<Vec<Pid>>,
}

impl MockKernel {
    /// A user process with a small loaded address space.
    pub fn new(pid: Pid) -> Self {
        let mut kernel = Self::kernel_thread(pid);
        kernel.space = Some(Arc::new(sample_space("prog")));
        kernel
    }

    /// A thread without user memory.
    pub fn kernel_thread(pid: Pid) -> Self {
        Self {
            pid,
            space: None,
            threads: RefCell::new(Vec::new()),
            console: RefCell::new(Vec::new()),
            attr: Cell::new(0x07),
            cursor: Cell::new((0, 0)),
            key: 0,
            ticks: 0,
            exit_code: 0,
            spawn_error: None,
            spawned: RefCell::new(Vec::new()),
            interrupts: Cell::new(true),
            interrupts_in_call: Cell::new(None),
            suspensions: Cell::new(0),
            woken: RefCell::new(Vec::new()),
        }
    }

    pub fn with_key(mut self, key: u16) -> Self {
        self.key = key;
        self
    }

    pub fn with_ticks(mut self, ticks: u32) -> Self {
        self.ticks = ticks;
        self
    }

    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    pub fn failing_spawn(mut self, error: KernelError) -> Self {
        self.spawn_error = Some(error);
        self
    }

    pub fn add_thread(&self, info: ThreadInfo) {
        self.threads.borrow_mut().push(info);
    }

    pub fn space(&self) -> Arc<ProcessAddressSpace> {
        self.space.clone().unwrap()
    }

    /// Simulate arriving through the trap gate.
    pub fn interrupts_masked(&self) {
        self.interrupts.set(false);
    }

    pub fn interrupts_enabled(&self) -> bool {
        self.interrupts.get()
    }

    /// Interrupt state seen by the last spawn or join.
    pub fn interrupts_during_last_call(&self) -> Option<bool> {
        self.interrupts_in_call.get()
    }

    pub fn console_output(&self) -> Vec<u8> {
        self.console.borrow().clone()
    }

    pub fn attr(&self) -> u8 {
        self.attr.get()
    }

    pub fn spawned(&self) -> Vec<(String, String)> {
        self.spawned.borrow().clone()
    }

    pub fn suspensions(&self) -> usize {
        self.suspensions.get()
    }

    pub fn woken(&self) -> Vec<Pid> {
        self.woken.borrow().clone()
    }
}

impl Threads for MockKernel {
    fn current_pid(&self) -> Pid {
        self.pid
    }

    fn thread_info(&self, pid: Pid) -> Option<ThreadInfo> {
        self.threads.borrow().iter().find(|t| t.pid == pid).copied()
    }

    fn current_address_space(&self) -> Option<Arc<ProcessAddressSpace>> {
        self.space.clone()
    }

    fn exit(&self, code: i32) -> ! {
        panic!("exit({})", code)
    }

    fn spawn(&self, program: &str, command: &str) -> KernelResult<Pid> {
        self.interrupts_in_call.set(Some(self.interrupts.get()));
        if let Some(error) = self.spawn_error {
            return Err(error);
        }
        self.spawned
            .borrow_mut()
            .push((program.to_string(), command.to_string()));
        Ok(42)
    }

    fn join(&self, _pid: Pid) -> i32 {
        self.interrupts_in_call.set(Some(self.interrupts.get()));
        self.exit_code
    }

    fn suspend_current(&self) {
        self.suspensions.set(self.suspensions.get() + 1);
    }

    fn wake(&self, pid: Pid) {
        self.woken.borrow_mut().push(pid);
    }
}

impl Console for MockKernel {
    fn put_buf(&self, buf: &[u8]) {
        self.console.borrow_mut().extend_from_slice(buf);
    }

    fn set_attr(&self, attr: u8) {
        self.attr.set(attr);
    }

    fn cursor(&self) -> (i32, i32) {
        self.cursor.get()
    }

    fn put_cursor(&self, row: i32, col: i32) -> bool {
        if !(0..SCREEN_ROWS).contains(&row) || !(0..SCREEN_COLS).contains(&col) {
            return false;
        }
        self.cursor.set((row, col));
        true
    }
}

impl Keyboard for MockKernel {
    fn wait_for_key(&self) -> u16 {
        self.key
    }
}

impl Clock for MockKernel {
    fn ticks(&self) -> u32 {
        self.ticks
    }
}

impl Interrupts for MockKernel {
    fn enable(&self) {
        self.interrupts.set(true);
    }

    fn disable(&self) {
        self.interrupts.set(false);
    }

    fn enabled(&self) -> bool {
        self.interrupts.get()
    }
}
