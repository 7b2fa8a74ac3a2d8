//! Process Address Space
//!
//! One contiguous backing region per process, holding its segments, stack
//! and argument block, plus the LDT that confines the process to it.
//!
//! # Memory Layout (offsets relative to the region)
//! ```text
//! 0                      segments at their load addresses (gaps zero)
//! round_up(max_va)       stack (DEFAULT_USER_STACK_SIZE, grows down)
//! + stack size           argument block; initial stack pointer
//! round_up(...)          end of region
//! ```
//!
//! # Lifetime
//! Built once by [`Loader`], shared through `Arc` by the threads that run
//! it, destroyed when the last holder drops it. Dropping frees the
//! descriptor slot first, then returns the memory to the pool.

use alloc::boxed::Box;
use core::fmt;

use spin::Mutex;

use super::argblock;
use crate::config::{DEFAULT_USER_STACK_SIZE, NUM_USER_LDT_ENTRIES};
use crate::error::{KernelError, KernelResult};
use crate::exe::{self, ExecutableLayout};
use crate::mm::{page_count, round_up_to_page, BackingMemory, UserMemoryPool};
use crate::seg::{
    DescriptorTable, IsolationDescriptor, PrivilegeLevel, SegmentDescriptor, Selector, TableKind,
};

/// LDT index of the user code segment.
pub const LDT_CODE_INDEX: u16 = 0;
/// LDT index of the user data segment.
pub const LDT_DATA_INDEX: u16 = 1;

/// Isolated memory of one user process.
pub struct ProcessAddressSpace {
    memory: Mutex<BackingMemory>,
    size: usize,
    entry_address: usize,
    stack_pointer_address: usize,
    argument_block_address: usize,
    ldt: [SegmentDescriptor; NUM_USER_LDT_ENTRIES],
    /// Hardware copy of `ldt`; the global LDT descriptor points here.
    raw_ldt: Box<[u64; NUM_USER_LDT_ENTRIES]>,
    /// Taken in `drop`.
    descriptor: Option<IsolationDescriptor>,
    ldt_selector: Selector,
    code_selector: Selector,
    data_selector: Selector,
    descriptors: &'static DescriptorTable,
}

impl ProcessAddressSpace {
    /// Total bytes in the backing region.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn entry_address(&self) -> usize {
        self.entry_address
    }

    #[inline]
    pub fn stack_pointer_address(&self) -> usize {
        self.stack_pointer_address
    }

    #[inline]
    pub fn argument_block_address(&self) -> usize {
        self.argument_block_address
    }

    /// Global selector of this process's LDT.
    #[inline]
    pub fn ldt_selector(&self) -> Selector {
        self.ldt_selector
    }

    #[inline]
    pub fn code_selector(&self) -> Selector {
        self.code_selector
    }

    #[inline]
    pub fn data_selector(&self) -> Selector {
        self.data_selector
    }

    /// The process's local descriptors (code, data).
    #[inline]
    pub fn ldt(&self) -> &[SegmentDescriptor; NUM_USER_LDT_ENTRIES] {
        &self.ldt
    }

    /// The LDT in the 8-byte hardware format, as the CPU reads it.
    #[inline]
    pub fn raw_ldt(&self) -> &[u64; NUM_USER_LDT_ENTRIES] {
        &self.raw_ldt
    }

    /// Run `f` over the backing region.
    pub(crate) fn with_memory<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        f(self.memory.lock().as_mut_slice())
    }
}

impl fmt::Debug for ProcessAddressSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessAddressSpace")
            .field("size", &self.size)
            .field("entry", &self.entry_address)
            .field("stack", &self.stack_pointer_address)
            .field("args", &self.argument_block_address)
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

impl Drop for ProcessAddressSpace {
    fn drop(&mut self) {
        if let Some(descriptor) = self.descriptor.take() {
            if let Err(e) = self.descriptors.free(descriptor) {
                log::error!("freeing LDT descriptor failed: {}", e);
            }
        }
        // `memory` drops after this, returning the region under the pool lock.
    }
}

/// Builds address spaces from executable images.
#[derive(Clone, Copy)]
pub struct Loader {
    pool: &'static UserMemoryPool,
    descriptors: &'static DescriptorTable,
}

impl Loader {
    pub const fn new(pool: &'static UserMemoryPool, descriptors: &'static DescriptorTable) -> Self {
        Self { pool, descriptors }
    }

    /// Parse `image` and build its address space.
    pub fn load(&self, image: &[u8], command: &str) -> KernelResult<ProcessAddressSpace> {
        let layout = exe::parse(image)?;
        self.build(image, &layout, command)
    }

    /// Build the address space for an already-parsed image.
    ///
    /// # Errors
    /// - `FormatError`: a segment lies outside the image or overflows
    /// - `OutOfMemory`: the pool cannot hold the region
    /// - `ResourceExhausted`: no descriptor table slot is free
    ///
    /// On error nothing stays allocated.
    pub fn build(
        &self,
        image: &[u8],
        layout: &ExecutableLayout,
        command: &str,
    ) -> KernelResult<ProcessAddressSpace> {
        let max_va = layout.max_virtual_address().ok_or(KernelError::FormatError)?;
        for segment in &layout.segments {
            let file_end = segment
                .file_offset
                .checked_add(segment.file_length)
                .ok_or(KernelError::FormatError)?;
            if file_end > image.len() || segment.file_length > segment.memory_size {
                return Err(KernelError::FormatError);
            }
        }

        let (argc, arg_block_size) = argblock::measure(command);
        let stack_base = round_up_to_page(max_va).ok_or(KernelError::FormatError)?;
        let arg_block_address = stack_base
            .checked_add(DEFAULT_USER_STACK_SIZE)
            .ok_or(KernelError::FormatError)?;
        let size = arg_block_address
            .checked_add(arg_block_size)
            .and_then(round_up_to_page)
            .ok_or(KernelError::FormatError)?;

        log::info!(
            "user memory: {} bytes ({:#x}, {} pages)",
            size,
            size,
            page_count(size)
        );

        let mut memory = self.pool.allocate_zeroed(size)?;
        {
            let region = memory.as_mut_slice();
            for segment in &layout.segments {
                let src = &image[segment.file_offset..segment.file_offset + segment.file_length];
                let start = segment.load_address;
                region[start..start + segment.file_length].copy_from_slice(src);
            }
            argblock::format(
                &mut region[arg_block_address..arg_block_address + arg_block_size],
                argc,
                arg_block_address,
                command,
            )?;
        }

        let base = memory.base_address();
        let pages = page_count(size);
        let ldt = [
            SegmentDescriptor::code(base, pages, PrivilegeLevel::User),
            SegmentDescriptor::data(base, pages, PrivilegeLevel::User),
        ];
        let raw_ldt = Box::new(ldt.map(|desc| desc.to_raw()));

        let descriptor = self.descriptors.allocate()?;
        let ldt_base = raw_ldt.as_ptr() as usize;
        if let Err(e) = self
            .descriptors
            .init_ldt(&descriptor, ldt_base, NUM_USER_LDT_ENTRIES)
        {
            if let Err(free_err) = self.descriptors.free(descriptor) {
                log::error!("freeing LDT descriptor failed: {}", free_err);
            }
            return Err(e);
        }
        let ldt_selector = descriptor.selector();

        log::debug!("LDT descriptor {:?} for region {:#x}", descriptor, base);

        Ok(ProcessAddressSpace {
            memory: Mutex::new(memory),
            size,
            entry_address: layout.entry_address,
            stack_pointer_address: arg_block_address,
            argument_block_address: arg_block_address,
            ldt,
            raw_ldt,
            descriptor: Some(descriptor),
            ldt_selector,
            code_selector: Selector::new(PrivilegeLevel::User, TableKind::Local, LDT_CODE_INDEX),
            data_selector: Selector::new(PrivilegeLevel::User, TableKind::Local, LDT_DATA_INDEX),
            descriptors: self.descriptors,
        })
    }
}

/// Load an executable into a fresh address space.
pub fn load_user_program(
    image: &[u8],
    command: &str,
    pool: &'static UserMemoryPool,
    descriptors: &'static DescriptorTable,
) -> KernelResult<ProcessAddressSpace> {
    Loader::new(pool, descriptors).load(image, command)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::exe::testing::ImageBuilder;
    use crate::mm::test_pool;
    use crate::seg::test_table;

    /// A small process: 16 bytes of code at 0 and 8 bytes of data at 4096.
    pub fn sample_image() -> alloc::vec::Vec<u8> {
        ImageBuilder::new(0x10)
            .segment(0, 16, 0, 16)
            .segment(16, 8, 4096, 8)
            .build()
    }

    pub fn sample_space(command: &str) -> ProcessAddressSpace {
        let loader = Loader::new(test_pool(256 * 1024), test_table());
        loader.load(&sample_image(), command).unwrap()
    }
}
