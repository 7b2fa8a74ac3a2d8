//! Global Descriptor Table
//!
//! Fixed-size table of segment descriptors. The leading entries belong to
//! the kernel; the rest are handed out one per process to describe that
//! process's LDT.
//!
//! # Design
//! - Slots are claimed by [`DescriptorTable::allocate`], which returns an
//!   [`IsolationDescriptor`] capability for the slot
//! - The capability is not `Clone`; freeing consumes it
//! - Each slot carries a generation so a capability from a previous
//!   tenant of the slot cannot touch the current one

use core::fmt;

use spin::Mutex;

use super::descriptor::{PrivilegeLevel, SegmentDescriptor};
use super::selector::{Selector, TableKind};
use crate::config::{FIRST_FREE_GDT_ENTRY, NUM_GDT_ENTRIES};
use crate::error::{KernelError, KernelResult};

/// Capability for one descriptor table slot.
pub struct IsolationDescriptor {
    index: u16,
    generation: u32,
}

impl IsolationDescriptor {
    #[inline]
    pub const fn index(&self) -> usize {
        self.index as usize
    }

    #[inline]
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    /// Kernel-privilege selector for this slot in the global table.
    #[inline]
    pub const fn selector(&self) -> Selector {
        Selector::new(PrivilegeLevel::Kernel, TableKind::Global, self.index)
    }
}

impl fmt::Debug for IsolationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IsolationDescriptor(#{}, gen={})", self.index, self.generation)
    }
}

#[derive(Clone, Copy)]
struct Slot {
    descriptor: SegmentDescriptor,
    in_use: bool,
    generation: u32,
}

impl Slot {
    const fn free() -> Self {
        Self {
            descriptor: SegmentDescriptor::null(),
            in_use: false,
            generation: 0,
        }
    }
}

struct TableInner {
    slots: [Slot; NUM_GDT_ENTRIES],
}

impl TableInner {
    fn check(&self, cap: &IsolationDescriptor) -> KernelResult<usize> {
        let index = cap.index();
        match self.slots.get(index) {
            Some(slot) if slot.in_use && slot.generation == cap.generation => Ok(index),
            _ => Err(KernelError::NotFound),
        }
    }
}

/// The global descriptor table.
pub struct DescriptorTable {
    inner: Mutex<TableInner>,
}

impl DescriptorTable {
    /// Create a table with the kernel entries reserved.
    pub const fn new() -> Self {
        let mut slots = [Slot::free(); NUM_GDT_ENTRIES];
        let mut i = 0;
        while i < FIRST_FREE_GDT_ENTRY {
            slots[i].in_use = true;
            i += 1;
        }
        Self {
            inner: Mutex::new(TableInner { slots }),
        }
    }

    /// Claim a free slot.
    ///
    /// # Errors
    /// `ResourceExhausted` if every slot is taken.
    pub fn allocate(&self) -> KernelResult<IsolationDescriptor> {
        let mut inner = self.inner.lock();
        for index in FIRST_FREE_GDT_ENTRY..NUM_GDT_ENTRIES {
            let slot = &mut inner.slots[index];
            if !slot.in_use {
                slot.in_use = true;
                slot.generation = slot.generation.wrapping_add(1);
                slot.descriptor = SegmentDescriptor::null();
                return Ok(IsolationDescriptor {
                    index: index as u16,
                    generation: slot.generation,
                });
            }
        }
        log::warn!("descriptor table exhausted");
        Err(KernelError::ResourceExhausted)
    }

    /// Point the slot at an LDT of `entries` descriptors located at
    /// `ldt_base`.
    pub fn init_ldt(
        &self,
        cap: &IsolationDescriptor,
        ldt_base: usize,
        entries: usize,
    ) -> KernelResult<()> {
        let mut inner = self.inner.lock();
        let index = inner.check(cap)?;
        inner.slots[index].descriptor = SegmentDescriptor::ldt(ldt_base, entries);
        Ok(())
    }

    /// Release a slot. Consumes the capability.
    pub fn free(&self, cap: IsolationDescriptor) -> KernelResult<()> {
        let mut inner = self.inner.lock();
        let index = inner.check(&cap)?;
        let slot = &mut inner.slots[index];
        slot.in_use = false;
        slot.descriptor = SegmentDescriptor::null();
        Ok(())
    }

    /// Current contents of a slot.
    pub fn entry(&self, index: usize) -> Option<SegmentDescriptor> {
        self.inner.lock().slots.get(index).map(|slot| slot.descriptor)
    }

    /// Number of slots available for processes.
    pub fn free_entries(&self) -> usize {
        self.inner
            .lock()
            .slots
            .iter()
            .filter(|slot| !slot.in_use)
            .count()
    }
}

impl Default for DescriptorTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) fn test_table() -> &'static DescriptorTable {
    alloc::boxed::Box::leak(alloc::boxed::Box::new(DescriptorTable::new()))
}
