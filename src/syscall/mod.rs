//! System Call Interface
//!
//! The fixed table of system calls available to user programs and the
//! kernel state owned by it (semaphores, scheduling policy).
//!
//! # Security Model
//! - Whitelist approach: only the sixteen numbered calls exist
//! - All pointer and length arguments are validated before use
//! - Invalid inputs return negative error codes, never panic
//!
//! # Syscalls
//! - 0: null()
//! - 1: exit(code)
//! - 2: print_string(buf, len)
//! - 3: get_key()
//! - 4: set_attr(attr)
//! - 5: get_cursor(row_ptr, col_ptr)
//! - 6: put_cursor(row, col)
//! - 7: spawn(path, path_len, command, command_len)
//! - 8: wait(pid)
//! - 9: get_pid()
//! - 10: set_scheduling_policy(policy, quantum)
//! - 11: get_time_of_day()
//! - 12: create_semaphore(name, name_len, initial)
//! - 13: p(id)
//! - 14: v(id)
//! - 15: destroy_semaphore(id)

mod handler;
mod user_string;

#[cfg(test)]
pub(crate) mod mock;

pub use handler::{numbers, Dispatcher, SchedulingPolicy, SchedulingState};
pub use user_string::UserString;
