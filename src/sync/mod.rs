//! Synchronization primitives exposed to user processes
//!
//! Currently the named semaphore table, reached only through the
//! semaphore system calls.

pub mod semaphore;

pub use semaphore::{Acquire, SemaphoreInfo, SemaphoreTable};
