//! Argument Block
//!
//! The command line handed to a new process, laid out in its memory.
//!
//! # Layout (little-endian, 32-bit user addresses)
//! ```text
//! +0   argc
//! +4   argv            user address of the vector below
//! +8   argv[0..argc]   user addresses of the strings
//!      0               terminator
//!      "word\0" ...    the strings
//! ```

use crate::error::{KernelError, KernelResult};

const HEADER_SIZE: usize = 8;
const POINTER_SIZE: usize = 4;

fn words(command: &str) -> impl Iterator<Item = &str> {
    command.split_ascii_whitespace()
}

/// Number of arguments in `command` and the bytes its block needs.
pub fn measure(command: &str) -> (usize, usize) {
    let mut argc = 0;
    let mut strings = 0;
    for word in words(command) {
        argc += 1;
        strings += word.len() + 1;
    }
    (argc, HEADER_SIZE + (argc + 1) * POINTER_SIZE + strings)
}

fn user_pointer(address: usize) -> KernelResult<[u8; 4]> {
    u32::try_from(address)
        .map(u32::to_le_bytes)
        .map_err(|_| KernelError::InvalidArgument)
}

/// Write the argument block for `command` into `dest`.
///
/// `user_address` is where `dest[0]` appears in the process's address
/// space; every pointer in the block is relative to the process.
pub fn format(dest: &mut [u8], argc: usize, user_address: usize, command: &str) -> KernelResult<()> {
    let (expected_argc, size) = measure(command);
    if argc != expected_argc || dest.len() < size {
        return Err(KernelError::InvalidArgument);
    }

    let vector = HEADER_SIZE;
    let mut string = vector + (argc + 1) * POINTER_SIZE;

    dest[0..4].copy_from_slice(&user_pointer(argc)?);
    dest[4..8].copy_from_slice(&user_pointer(user_address + vector)?);

    for (i, word) in words(command).enumerate() {
        let slot = vector + i * POINTER_SIZE;
        dest[slot..slot + POINTER_SIZE].copy_from_slice(&user_pointer(user_address + string)?);
        dest[string..string + word.len()].copy_from_slice(word.as_bytes());
        dest[string + word.len()] = 0;
        string += word.len() + 1;
    }

    let terminator = vector + argc * POINTER_SIZE;
    dest[terminator..terminator + POINTER_SIZE].fill(0);
    Ok(())
}
