//! segkern - Segmented Process Execution Substrate
//!
//! Turns executable images into isolated user processes on a flat-segment
//! machine, marshals system calls across the user/kernel boundary, and
//! provides named counting semaphores for user programs.
//!
//! # Layers
//! - `exe`: executable image parsing (segment list + entry point)
//! - `mm`: page arithmetic and the user memory pool
//! - `seg`: segment descriptors, selectors, and the descriptor table
//! - `user`: process address spaces, argument blocks, validated copies
//! - `sync`: the semaphore table
//! - `syscall`: the numbered system call table
//!
//! # Security Model
//! - Every user address is an offset into its own backing region
//! - Every user-memory access passes the boundary validator first
//! - Invalid user input is rejected with an error code, never trusted
//!
//! The scheduler, interrupt plumbing, drivers and the descriptor-table
//! hardware instructions live outside this crate and are reached through
//! the traits in `platform`.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

extern crate alloc;

pub mod config;
pub mod error;
pub mod exe;
pub mod logging;
pub mod mm;
pub mod platform;
pub mod seg;
pub mod sync;
pub mod syscall;
pub mod trap;
pub mod user;

pub use error::{KernelError, KernelResult};
pub use exe::{ExecutableLayout, ExecutableSegment};
pub use platform::{Kernel, Pid};
pub use syscall::Dispatcher;
pub use user::{load_user_program, ProcessAddressSpace};
