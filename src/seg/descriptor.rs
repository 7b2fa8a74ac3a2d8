//! Segment Descriptors
//!
//! Typed form of the 8-byte x86 segment descriptor.
//!
//! # Raw Layout
//! ```text
//! 63      56 55  52 51    48 47     40 39        16 15        0
//! ┌─────────┬──────┬────────┬─────────┬────────────┬───────────┐
//! │base 31:24│G D 0 A│lim 19:16│ access  │ base 23:0  │ lim 15:0  │
//! └─────────┴──────┴────────┴─────────┴────────────┴───────────┘
//! ```
//! Segment bases are 32-bit on the target; only the low 32 bits of a base
//! are encoded.

use bitflags::bitflags;

use crate::config::PAGE_SIZE;

bitflags! {
    /// Access byte of a segment descriptor.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DescriptorAccess: u8 {
        const ACCESSED = 1 << 0;
        /// Readable (code) or writable (data).
        const READ_WRITE = 1 << 1;
        const CONFORMING = 1 << 2;
        const EXECUTABLE = 1 << 3;
        /// Code/data segment rather than a system descriptor.
        const CODE_DATA = 1 << 4;
        const DPL_LOW = 1 << 5;
        const DPL_HIGH = 1 << 6;
        const PRESENT = 1 << 7;

        /// System descriptor type for a local descriptor table.
        const SYSTEM_LDT = 0b0010;
    }
}

/// Descriptor / requested privilege level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PrivilegeLevel {
    Kernel = 0,
    User = 3,
}

impl PrivilegeLevel {
    const fn dpl_bits(self) -> u8 {
        (self as u8) << 5
    }

    const fn from_dpl_bits(access: u8) -> Self {
        if (access >> 5) & 0b11 == 0 {
            Self::Kernel
        } else {
            Self::User
        }
    }
}

/// Flag nibble bits (raw bits 52..55).
const FLAG_DEFAULT_32: u8 = 1 << 2;
const FLAG_PAGE_GRANULAR: u8 = 1 << 3;

/// One segment descriptor.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SegmentDescriptor {
    base: usize,
    /// 20-bit limit; units depend on granularity.
    limit: u32,
    access: DescriptorAccess,
    flags: u8,
}

impl SegmentDescriptor {
    /// The null descriptor.
    pub const fn null() -> Self {
        Self {
            base: 0,
            limit: 0,
            access: DescriptorAccess::empty(),
            flags: 0,
        }
    }

    /// Executable, readable segment covering `num_pages` pages at `base`.
    pub fn code(base: usize, num_pages: usize, privilege: PrivilegeLevel) -> Self {
        Self::paged(
            base,
            num_pages,
            DescriptorAccess::EXECUTABLE | DescriptorAccess::READ_WRITE,
            privilege,
        )
    }

    /// Writable data segment covering `num_pages` pages at `base`.
    pub fn data(base: usize, num_pages: usize, privilege: PrivilegeLevel) -> Self {
        Self::paged(base, num_pages, DescriptorAccess::READ_WRITE, privilege)
    }

    fn paged(
        base: usize,
        num_pages: usize,
        kind: DescriptorAccess,
        privilege: PrivilegeLevel,
    ) -> Self {
        debug_assert!(num_pages > 0);
        let access = DescriptorAccess::PRESENT
            | DescriptorAccess::CODE_DATA
            | kind
            | DescriptorAccess::from_bits_retain(privilege.dpl_bits());
        Self {
            base,
            limit: (num_pages.saturating_sub(1) as u32) & 0xF_FFFF,
            access,
            flags: FLAG_PAGE_GRANULAR | FLAG_DEFAULT_32,
        }
    }

    /// System descriptor for an LDT of `entries` descriptors at `base`.
    pub fn ldt(base: usize, entries: usize) -> Self {
        let bytes = entries * core::mem::size_of::<u64>();
        Self {
            base,
            limit: (bytes.saturating_sub(1) as u32) & 0xF_FFFF,
            access: DescriptorAccess::PRESENT | DescriptorAccess::SYSTEM_LDT,
            flags: 0,
        }
    }

    #[inline]
    pub const fn base(&self) -> usize {
        self.base
    }

    #[inline]
    pub const fn access(&self) -> DescriptorAccess {
        self.access
    }

    #[inline]
    pub fn is_present(&self) -> bool {
        self.access.contains(DescriptorAccess::PRESENT)
    }

    #[inline]
    pub const fn privilege(&self) -> PrivilegeLevel {
        PrivilegeLevel::from_dpl_bits(self.access.bits())
    }

    /// Number of bytes addressable through this segment.
    pub fn extent(&self) -> usize {
        let units = self.limit as usize + 1;
        if self.flags & FLAG_PAGE_GRANULAR != 0 {
            units * PAGE_SIZE
        } else {
            units
        }
    }

    /// Encode as the 8-byte hardware format.
    pub fn to_raw(&self) -> u64 {
        let base = self.base as u64 & 0xFFFF_FFFF;
        let limit = self.limit as u64;
        (limit & 0xFFFF)
            | (base & 0xFF_FFFF) << 16
            | (self.access.bits() as u64) << 40
            | ((limit >> 16) & 0xF) << 48
            | (self.flags as u64 & 0xF) << 52
            | ((base >> 24) & 0xFF) << 56
    }

    /// Decode the 8-byte hardware format.
    pub fn from_raw(raw: u64) -> Self {
        let base = ((raw >> 16) & 0xFF_FFFF) | ((raw >> 56) & 0xFF) << 24;
        let limit = (raw & 0xFFFF) | ((raw >> 48) & 0xF) << 16;
        Self {
            base: base as usize,
            limit: limit as u32,
            access: DescriptorAccess::from_bits_retain((raw >> 40) as u8),
            flags: ((raw >> 52) & 0xF) as u8,
        }
    }
}

impl Default for SegmentDescriptor {
    fn default() -> Self {
        Self::null()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_code_descriptor() {
        let desc = SegmentDescriptor::code(0x0010_0000, 5, PrivilegeLevel::User);
        assert_eq!(desc.extent(), 5 * PAGE_SIZE);
        assert_eq!(desc.privilege(), PrivilegeLevel::User);
        assert!(desc.access().contains(DescriptorAccess::EXECUTABLE));
        // limit 4, base 0x100000, access 0xFA, flags 0xC
        assert_eq!(desc.to_raw(), 0x00C0_FA10_0000_0004);
        assert_eq!(SegmentDescriptor::from_raw(0x00C0_FA10_0000_0004), desc);
    }

    #[test]
    fn test_data_descriptor_not_executable() {
        let desc = SegmentDescriptor::data(0, 1, PrivilegeLevel::User);
        assert!(!desc.access().contains(DescriptorAccess::EXECUTABLE));
        assert!(desc.access().contains(DescriptorAccess::READ_WRITE));
        assert_eq!(desc.extent(), PAGE_SIZE);
    }

    #[test]
    fn test_ldt_descriptor() {
        let desc = SegmentDescriptor::ldt(0x1234_5678, 2);
        assert_eq!(desc.extent(), 16);
        assert_eq!(desc.privilege(), PrivilegeLevel::Kernel);
        let raw = desc.to_raw();
        assert_eq!(raw & 0xFFFF, 15);
        assert_eq!((raw >> 16) & 0xFF_FFFF, 0x34_5678);
        assert_eq!(raw >> 56, 0x12);
        assert_eq!((raw >> 40) & 0xFF, 0x82);
    }

    #[test]
    fn test_null_descriptor() {
        assert_eq!(SegmentDescriptor::null().to_raw(), 0);
        assert!(!SegmentDescriptor::null().is_present());
    }
}
