//! Executable Images
//!
//! The loader's view of an executable: an ordered list of segments and an
//! entry address. Produced by the ELF parser, consumed once by the address
//! space builder.

mod elf;

use alloc::vec::Vec;

use bitflags::bitflags;

pub use elf::{parse, ELF_MAGIC, ELF_HEADER_SIZE, PROGRAM_HEADER_SIZE};

#[cfg(test)]
pub(crate) use elf::testing;

bitflags! {
    /// Protection flags of a segment, as declared in its program header.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SegmentFlags: u32 {
        const EXECUTE = 1 << 0;
        const WRITE = 1 << 1;
        const READ = 1 << 2;
    }
}

/// One loadable range of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutableSegment {
    /// Offset of the segment's bytes in the image.
    pub file_offset: usize,
    /// Bytes present in the image.
    pub file_length: usize,
    /// Offset in the process's memory where the segment starts.
    pub load_address: usize,
    /// Bytes the segment occupies in memory (tail beyond the file bytes
    /// is zero).
    pub memory_size: usize,
    pub flags: SegmentFlags,
}

impl ExecutableSegment {
    /// First byte past the segment in memory, or `None` on overflow.
    #[inline]
    pub fn memory_end(&self) -> Option<usize> {
        self.load_address.checked_add(self.memory_size)
    }
}

/// Parsed layout of an executable.
///
/// Segments keep their header order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableLayout {
    pub segments: Vec<ExecutableSegment>,
    pub entry_address: usize,
}

impl ExecutableLayout {
    /// Highest byte any segment occupies, i.e. the maximum of
    /// `load_address + memory_size` over all segments.
    pub fn max_virtual_address(&self) -> Option<usize> {
        let mut max = 0;
        for segment in &self.segments {
            let top = segment.memory_end()?;
            if top > max {
                max = top;
            }
        }
        Some(max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn segment(load_address: usize, memory_size: usize) -> ExecutableSegment {
        ExecutableSegment {
            file_offset: 0,
            file_length: 0,
            load_address,
            memory_size,
            flags: SegmentFlags::READ,
        }
    }

    #[test]
    fn test_max_virtual_address() {
        let layout = ExecutableLayout {
            segments: vec![segment(4096, 8), segment(0, 16)],
            entry_address: 0,
        };
        assert_eq!(layout.max_virtual_address(), Some(4104));
    }

    #[test]
    fn test_max_virtual_address_overflow() {
        let layout = ExecutableLayout {
            segments: vec![segment(usize::MAX, 2)],
            entry_address: 0,
        };
        assert_eq!(layout.max_virtual_address(), None);
    }
}
