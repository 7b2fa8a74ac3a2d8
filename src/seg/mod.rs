//! Flat-Segment Isolation
//!
//! Each process is confined to its backing region by a pair of LDT
//! segments (code, data) at user privilege. The LDT itself is described
//! by one global descriptor table slot.
//!
//! # Security Properties
//! - Segment base/limit cover exactly the process's backing region
//! - User selectors carry user privilege; only the kernel loads the LDT
//! - A descriptor slot is released exactly once (capability consumed)

pub mod descriptor;
pub mod selector;
pub mod table;

pub use descriptor::{DescriptorAccess, PrivilegeLevel, SegmentDescriptor};
pub use selector::{Selector, TableKind};
pub use table::{DescriptorTable, IsolationDescriptor};

#[cfg(test)]
pub(crate) use table::test_table;
