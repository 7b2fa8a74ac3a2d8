//! User Memory Pool
//!
//! Backing regions for user processes are carved out of a dedicated
//! region managed by `linked_list_allocator`.
//!
//! # Design
//! - One contiguous, page-aligned block per process
//! - Blocks are zeroed before they are handed out
//! - [`BackingMemory`] returns its block to the pool on drop, so a region
//!   is freed exactly once on every path

use core::alloc::Layout;
use core::fmt;
use core::ptr::{self, NonNull};

use linked_list_allocator::Heap;
use spin::Mutex;

use super::page::PAGE_SIZE;
use crate::error::{KernelError, KernelResult};

/// Allocator for process backing memory.
pub struct UserMemoryPool {
    heap: Mutex<Heap>,
}

impl UserMemoryPool {
    /// Create a pool with no memory; call [`init`](Self::init) before use.
    pub const fn empty() -> Self {
        Self {
            heap: Mutex::new(Heap::empty()),
        }
    }

    /// Hand the region `[start, start + size)` to the pool.
    ///
    /// # Safety
    /// - The region must be valid for reads and writes for `'static`
    /// - Nothing else may access the region afterwards
    /// - Must be called at most once
    pub unsafe fn init(&self, start: *mut u8, size: usize) {
        // SAFETY: Guaranteed by the caller.
        unsafe { self.heap.lock().init(start, size) };
    }

    /// Create a pool over a leaked or static region.
    pub fn from_region(region: &'static mut [u8]) -> Self {
        let pool = Self::empty();
        // SAFETY: The region is exclusively borrowed for 'static and is
        // only reachable through the pool from here on.
        unsafe { pool.init(region.as_mut_ptr(), region.len()) };
        pool
    }

    /// Allocate a zeroed, page-aligned block of `size` bytes.
    ///
    /// # Errors
    /// `OutOfMemory` if no hole is large enough.
    pub fn allocate_zeroed(&'static self, size: usize) -> KernelResult<BackingMemory> {
        if size == 0 {
            return Err(KernelError::InvalidArgument);
        }
        let layout =
            Layout::from_size_align(size, PAGE_SIZE).map_err(|_| KernelError::OutOfMemory)?;
        let block = self
            .heap
            .lock()
            .allocate_first_fit(layout)
            .map_err(|_| KernelError::OutOfMemory)?;

        // SAFETY: The block was just allocated with `size` bytes and is not
        // shared with anyone yet.
        unsafe { ptr::write_bytes(block.as_ptr(), 0, size) };

        Ok(BackingMemory {
            block,
            layout,
            pool: self,
        })
    }

    /// Bytes currently handed out.
    pub fn used(&self) -> usize {
        self.heap.lock().used()
    }

    /// Bytes still available.
    pub fn free(&self) -> usize {
        self.heap.lock().free()
    }

    fn release(&self, block: NonNull<u8>, layout: Layout) {
        // SAFETY: `block` came from `allocate_first_fit` on this heap with
        // the same layout, and BackingMemory releases it only once.
        unsafe { self.heap.lock().deallocate(block, layout) };
    }
}

/// An exclusively owned, zero-initialized block of user memory.
pub struct BackingMemory {
    block: NonNull<u8>,
    layout: Layout,
    pool: &'static UserMemoryPool,
}

// SAFETY: BackingMemory is the only handle to its block; access goes
// through `&self`/`&mut self` borrows of this value.
unsafe impl Send for BackingMemory {}
// SAFETY: Shared access only hands out `&[u8]`.
unsafe impl Sync for BackingMemory {}

impl BackingMemory {
    /// Length of the block in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.layout.size()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.layout.size() == 0
    }

    /// Kernel address of the first byte. Segment bases are derived from it.
    #[inline]
    pub fn base_address(&self) -> usize {
        self.block.as_ptr() as usize
    }

    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: The block is valid for `len` bytes for as long as self
        // lives, and writes require `&mut self`.
        unsafe { core::slice::from_raw_parts(self.block.as_ptr(), self.len()) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: As above, and `&mut self` guarantees exclusivity.
        unsafe { core::slice::from_raw_parts_mut(self.block.as_ptr(), self.len()) }
    }
}

impl fmt::Debug for BackingMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BackingMemory({:#x}, {} bytes)", self.base_address(), self.len())
    }
}

impl Drop for BackingMemory {
    fn drop(&mut self) {
        self.pool.release(self.block, self.layout);
    }
}

/// Leak a fresh pool of `size` bytes for tests.
#[cfg(test)]
pub(crate) fn test_pool(size: usize) -> &'static UserMemoryPool {
    use alloc::boxed::Box;
    use alloc::vec;

    let region: &'static mut [u8] = Box::leak(vec![0xAAu8; size].into_boxed_slice());
    Box::leak(Box::new(UserMemoryPool::from_region(region)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_is_zeroed_and_aligned() {
        let pool = test_pool(64 * 1024);
        let memory = pool.allocate_zeroed(2 * PAGE_SIZE).unwrap();
        assert_eq!(memory.len(), 2 * PAGE_SIZE);
        assert_eq!(memory.base_address() % PAGE_SIZE, 0);
        assert!(memory.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_drop_returns_memory() {
        let pool = test_pool(64 * 1024);
        let before = pool.used();
        {
            let _memory = pool.allocate_zeroed(PAGE_SIZE).unwrap();
            assert!(pool.used() >= before + PAGE_SIZE);
        }
        assert_eq!(pool.used(), before);
    }

    #[test]
    fn test_out_of_memory() {
        let pool = test_pool(16 * 1024);
        assert_eq!(
            pool.allocate_zeroed(64 * PAGE_SIZE).unwrap_err(),
            KernelError::OutOfMemory
        );
    }

    #[test]
    fn test_zero_size_rejected() {
        let pool = test_pool(16 * 1024);
        assert_eq!(
            pool.allocate_zeroed(0).unwrap_err(),
            KernelError::InvalidArgument
        );
    }
}
