//! Named Semaphores
//!
//! A fixed table of counting semaphores addressed by small integer ids and
//! created by name. Processes share a semaphore by creating it under the
//! same name.
//!
//! # Acquire Protocol
//! ```text
//!             value > 0: value -= 1
//!   acquire ─────────────────────────────> Acquired
//!      │
//!      │ value <= 0: caller queued
//!      v
//!   Blocked ── release (wakes every waiter) ──> caller retries acquire
//! ```
//! Acquire never waits for the count itself: a blocked caller is put on the
//! slot's wait queue and must issue acquire again once woken. Release wakes
//! all waiters, so each of them re-checks the count.
//!
//! # Locking
//! The whole table sits behind one lock. No operation yields while holding
//! it; waking a thread only makes it runnable.

use alloc::collections::VecDeque;

use spin::Mutex;

use crate::config::{MAX_SEMAPHORE_NAME_LENGTH, TOTAL_SEMAPHORES};
use crate::error::{KernelError, KernelResult};
use crate::platform::Pid;

/// Value stored in a slot after it is destroyed.
const DESTROYED_VALUE: i32 = -1;

/// Outcome of an acquire attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    /// The count was positive and has been decremented.
    Acquired,
    /// The caller was queued; it must retry after being woken.
    Blocked,
}

/// Observable state of one semaphore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SemaphoreInfo {
    pub id: i32,
    pub value: i32,
    pub references: u32,
    pub waiters: usize,
}

struct Slot {
    name: [u8; MAX_SEMAPHORE_NAME_LENGTH],
    /// 0 marks a free slot.
    name_len: usize,
    value: i32,
    id: i32,
    references: u32,
    exists: bool,
    wait_queue: VecDeque<Pid>,
}

impl Slot {
    const fn free() -> Self {
        Self {
            name: [0; MAX_SEMAPHORE_NAME_LENGTH],
            name_len: 0,
            value: DESTROYED_VALUE,
            id: -1,
            references: 0,
            exists: false,
            wait_queue: VecDeque::new(),
        }
    }

    #[inline]
    fn is_free(&self) -> bool {
        self.name_len == 0
    }

    #[inline]
    fn name(&self) -> &[u8] {
        &self.name[..self.name_len]
    }

    fn claim(&mut self, id: usize, name: &[u8], initial_value: i32) {
        self.name[..name.len()].copy_from_slice(name);
        self.name_len = name.len();
        self.value = initial_value;
        self.id = id as i32;
        self.references = 1;
        self.exists = true;
    }

    fn release_slot(&mut self) {
        self.name = [0; MAX_SEMAPHORE_NAME_LENGTH];
        self.name_len = 0;
        self.value = DESTROYED_VALUE;
        self.id = -1;
        self.references = 0;
        self.exists = false;
    }
}

/// The semaphore table.
pub struct SemaphoreTable {
    slots: Mutex<[Slot; TOTAL_SEMAPHORES]>,
}

fn live_slot(slots: &mut [Slot; TOTAL_SEMAPHORES], id: i32) -> KernelResult<&mut Slot> {
    let index = usize::try_from(id).map_err(|_| KernelError::NotFound)?;
    match slots.get_mut(index) {
        Some(slot) if slot.exists => Ok(slot),
        _ => Err(KernelError::NotFound),
    }
}

impl SemaphoreTable {
    pub const fn new() -> Self {
        const FREE: Slot = Slot::free();
        Self {
            slots: Mutex::new([FREE; TOTAL_SEMAPHORES]),
        }
    }

    /// Create the semaphore `name`, or take another reference to it if it
    /// already exists.
    ///
    /// Returns the semaphore id. When the name already exists its current
    /// value is kept and `initial_value` is ignored.
    ///
    /// # Errors
    /// - `InvalidArgument`: empty name or name longer than
    ///   `MAX_SEMAPHORE_NAME_LENGTH`
    /// - `NoSlotAvailable`: the table is full
    pub fn create(&self, name: &[u8], initial_value: i32) -> KernelResult<i32> {
        if name.is_empty() || name.len() > MAX_SEMAPHORE_NAME_LENGTH {
            return Err(KernelError::InvalidArgument);
        }

        let mut slots = self.slots.lock();
        if let Some(slot) = slots.iter_mut().find(|s| !s.is_free() && s.name() == name) {
            slot.references += 1;
            log::debug!("semaphore {} referenced ({} refs)", slot.id, slot.references);
            return Ok(slot.id);
        }

        let (index, slot) = slots
            .iter_mut()
            .enumerate()
            .find(|(_, s)| s.is_free())
            .ok_or(KernelError::NoSlotAvailable)?;
        slot.claim(index, name, initial_value);
        log::debug!("semaphore {} created with value {}", index, initial_value);
        Ok(slot.id)
    }

    /// Try to take one unit of semaphore `id` on behalf of `caller`.
    ///
    /// # Errors
    /// `NotFound` if `id` is out of range or names no live semaphore.
    pub fn acquire(&self, id: i32, caller: Pid) -> KernelResult<Acquire> {
        let mut slots = self.slots.lock();
        let slot = live_slot(&mut slots, id)?;
        if slot.value <= 0 {
            slot.wait_queue.push_back(caller);
            log::debug!("semaphore {} unavailable, pid {} queued", id, caller);
            return Ok(Acquire::Blocked);
        }
        slot.value -= 1;
        Ok(Acquire::Acquired)
    }

    /// Return one unit to semaphore `id`.
    ///
    /// If the count was not positive, every queued waiter is passed to
    /// `wake` before the count is incremented. Returns the number woken.
    ///
    /// # Errors
    /// - `NotFound`: `id` names no live semaphore
    /// - `InvalidArgument`: the count is already `i32::MAX`; nothing changes
    pub fn release(&self, id: i32, mut wake: impl FnMut(Pid)) -> KernelResult<usize> {
        let mut slots = self.slots.lock();
        let slot = live_slot(&mut slots, id)?;
        let next = slot.value.checked_add(1).ok_or(KernelError::InvalidArgument)?;
        let mut woken = 0;
        if slot.value <= 0 {
            while let Some(pid) = slot.wait_queue.pop_front() {
                wake(pid);
                woken += 1;
            }
        }
        slot.value = next;
        Ok(woken)
    }

    /// Drop one reference to semaphore `id`; the slot is freed when the
    /// last reference goes.
    ///
    /// Threads still queued on a freed slot are passed to `wake` so their
    /// retry observes `NotFound` instead of sleeping forever.
    pub fn destroy(&self, id: i32, mut wake: impl FnMut(Pid)) -> KernelResult<()> {
        let mut slots = self.slots.lock();
        let slot = live_slot(&mut slots, id)?;
        slot.references = slot.references.saturating_sub(1);
        if slot.references > 0 {
            return Ok(());
        }
        while let Some(pid) = slot.wait_queue.pop_front() {
            wake(pid);
        }
        slot.release_slot();
        log::debug!("semaphore {} destroyed", id);
        Ok(())
    }

    /// State of semaphore `id`, if it exists.
    pub fn info(&self, id: i32) -> Option<SemaphoreInfo> {
        let mut slots = self.slots.lock();
        let slot = live_slot(&mut slots, id).ok()?;
        Some(SemaphoreInfo {
            id: slot.id,
            value: slot.value,
            references: slot.references,
            waiters: slot.wait_queue.len(),
        })
    }
}

impl Default for SemaphoreTable {
    fn default() -> Self {
        Self::new()
    }
}
