//! Segment Selectors
//!
//! A selector names one descriptor: `index << 3 | table << 2 | rpl`.

use super::descriptor::PrivilegeLevel;

/// Which descriptor table a selector indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Global,
    Local,
}

/// A 16-bit segment selector.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(transparent)]
pub struct Selector(u16);

impl Selector {
    pub const fn new(privilege: PrivilegeLevel, table: TableKind, index: u16) -> Self {
        let ti = match table {
            TableKind::Global => 0,
            TableKind::Local => 1 << 2,
        };
        Self((index << 3) | ti | privilege as u16)
    }

    #[inline]
    pub const fn bits(self) -> u16 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> u16 {
        self.0 >> 3
    }

    #[inline]
    pub const fn table(self) -> TableKind {
        if self.0 & (1 << 2) != 0 {
            TableKind::Local
        } else {
            TableKind::Global
        }
    }

    #[inline]
    pub const fn privilege(self) -> PrivilegeLevel {
        if self.0 & 0b11 == 0 {
            PrivilegeLevel::Kernel
        } else {
            PrivilegeLevel::User
        }
    }
}
