//! ELF Segment Parser
//!
//! Extracts the program-header table of a 32-bit little-endian ELF image.
//!
//! # Image Layout
//! ```text
//! offset  size  field
//! 0       4     magic (0x7f 'E' 'L' 'F')
//! 24      4     entry address
//! 28      4     program header table offset
//! 44      2     program header count
//!
//! program header (32 bytes each):
//! 4  offset   8  vaddr   16  filesz   20  memsz   24  flags
//! ```
//!
//! # Security
//! The image is untrusted. Every field read is bounds-checked against the
//! buffer and nothing is returned unless the whole table parses.

use alloc::vec::Vec;

use super::{ExecutableLayout, ExecutableSegment, SegmentFlags};
use crate::config::EXE_MAX_SEGMENTS;
use crate::error::{KernelError, KernelResult};

/// Magic marker at the start of every image.
pub const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

/// Size of the ELF32 file header.
pub const ELF_HEADER_SIZE: usize = 52;

/// Size of one ELF32 program header.
pub const PROGRAM_HEADER_SIZE: usize = 32;

mod ehdr {
    pub const ENTRY: usize = 24;
    pub const PHOFF: usize = 28;
    pub const PHNUM: usize = 44;
}

mod phdr {
    pub const OFFSET: usize = 4;
    pub const VADDR: usize = 8;
    pub const FILESZ: usize = 16;
    pub const MEMSZ: usize = 20;
    pub const FLAGS: usize = 24;
}

fn read_u16(bytes: &[u8], at: usize) -> KernelResult<u16> {
    let end = at.checked_add(2).ok_or(KernelError::FormatError)?;
    let raw = bytes.get(at..end).ok_or(KernelError::FormatError)?;
    Ok(u16::from_le_bytes([raw[0], raw[1]]))
}

fn read_u32(bytes: &[u8], at: usize) -> KernelResult<u32> {
    let end = at.checked_add(4).ok_or(KernelError::FormatError)?;
    let raw = bytes.get(at..end).ok_or(KernelError::FormatError)?;
    Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

/// Read the `u32` at `field` bytes into the entry starting at `base`.
fn read_field(bytes: &[u8], base: usize, field: usize) -> KernelResult<u32> {
    let at = base.checked_add(field).ok_or(KernelError::FormatError)?;
    read_u32(bytes, at)
}

/// Determine how the segments of an executable need to be loaded.
///
/// # Errors
/// `FormatError` if the image is empty or truncated, the magic marker is
/// wrong, or it declares more than `EXE_MAX_SEGMENTS` program headers.
pub fn parse(image: &[u8]) -> KernelResult<ExecutableLayout> {
    if image.is_empty() {
        return Err(KernelError::FormatError);
    }
    if image.len() < ELF_HEADER_SIZE || image[..4] != ELF_MAGIC {
        log::debug!("rejecting image: bad magic or short header");
        return Err(KernelError::FormatError);
    }

    let count = read_u16(image, ehdr::PHNUM)? as usize;
    if count > EXE_MAX_SEGMENTS {
        log::debug!("rejecting image: {} program headers", count);
        return Err(KernelError::FormatError);
    }

    let table = read_u32(image, ehdr::PHOFF)? as usize;
    let entry_address = read_u32(image, ehdr::ENTRY)? as usize;

    let mut segments = Vec::with_capacity(count);
    for i in 0..count {
        let header = table
            .checked_add(i * PROGRAM_HEADER_SIZE)
            .ok_or(KernelError::FormatError)?;
        segments.push(ExecutableSegment {
            file_offset: read_field(image, header, phdr::OFFSET)? as usize,
            file_length: read_field(image, header, phdr::FILESZ)? as usize,
            load_address: read_field(image, header, phdr::VADDR)? as usize,
            memory_size: read_field(image, header, phdr::MEMSZ)? as usize,
            flags: SegmentFlags::from_bits_retain(read_field(image, header, phdr::FLAGS)?),
        });
    }

    Ok(ExecutableLayout {
        segments,
        entry_address,
    })
}


#[cfg(test)]
mod tests {
    use super::testing::ImageBuilder;
    use super::*;

    #[test]
    fn test_parse_preserves_header_order() {
        let image = ImageBuilder::new(0x20)
            .segment(0, 16, 0, 16)
            .segment(16, 8, 4096, 8)
            .build();
        let layout = parse(&image).unwrap();

        assert_eq!(layout.entry_address, 0x20);
        assert_eq!(layout.segments.len(), 2);
        assert_eq!(layout.segments[0].file_offset, 0);
        assert_eq!(layout.segments[0].file_length, 16);
        assert_eq!(layout.segments[1].file_offset, 16);
        assert_eq!(layout.segments[1].load_address, 4096);
        assert_eq!(layout.segments[1].memory_size, 8);
        assert_eq!(
            layout.segments[1].flags,
            SegmentFlags::EXECUTE | SegmentFlags::READ
        );
    }

    #[test]
    fn test_empty_image() {
        assert_eq!(parse(&[]), Err(KernelError::FormatError));
    }

    #[test]
    fn test_bad_magic() {
        let mut image = ImageBuilder::new(0).segment(0, 4, 0, 4).build();
        image[1] = b'X';
        assert_eq!(parse(&image), Err(KernelError::FormatError));
    }

    #[test]
    fn test_too_many_segments() {
        let mut builder = ImageBuilder::new(0);
        for i in 0..=EXE_MAX_SEGMENTS as u32 {
            builder = builder.segment(0, 0, i * 4096, 16);
        }
        assert_eq!(parse(&builder.build()), Err(KernelError::FormatError));
    }

    #[test]
    fn test_max_segments_accepted() {
        let mut builder = ImageBuilder::new(0);
        for i in 0..EXE_MAX_SEGMENTS as u32 {
            builder = builder.segment(0, 0, i * 4096, 16);
        }
        let layout = parse(&builder.build()).unwrap();
        assert_eq!(layout.segments.len(), EXE_MAX_SEGMENTS);
    }

    #[test]
    fn test_truncated_header_table() {
        let image = ImageBuilder::new(0)
            .segment(0, 4, 0, 4)
            .segment(0, 4, 4096, 4)
            .build();
        let cut = ELF_HEADER_SIZE + PROGRAM_HEADER_SIZE + 10;
        assert_eq!(parse(&image[..cut]), Err(KernelError::FormatError));
    }

    #[test]
    fn test_short_header() {
        assert_eq!(parse(&ELF_MAGIC), Err(KernelError::FormatError));
    }

    #[test]
    fn test_header_table_offset_past_end() {
        let mut image = ImageBuilder::new(0).segment(0, 4, 0, 4).build();
        image[ehdr::PHOFF..ehdr::PHOFF + 4].copy_from_slice(&(u32::MAX - 2).to_le_bytes());
        assert_eq!(parse(&image), Err(KernelError::FormatError));
    }

    #[test]
    fn test_field_offset_overflow() {
        let image = [0u8; 64];
        assert_eq!(
            read_field(&image, usize::MAX - 2, phdr::FLAGS),
            Err(KernelError::FormatError)
        );
        assert_eq!(read_field(&image, 0, phdr::OFFSET), Ok(0));
    }
}
