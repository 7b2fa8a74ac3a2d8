//! Memory management for user processes
//!
//! Provides:
//! - Page rounding helpers
//! - The user memory pool that backs every process address space
//!
//! # Security Principles
//! - Every block is zeroed before a process can see it
//! - Blocks are released exactly once, by ownership

pub mod page;
mod pool;

pub use page::{is_page_aligned, page_count, round_up_to_page, PAGE_SIZE};
pub use pool::{BackingMemory, UserMemoryPool};

#[cfg(test)]
pub(crate) use pool::test_pool;
