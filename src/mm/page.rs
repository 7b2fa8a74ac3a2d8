//! Page Arithmetic
//!
//! User memory is reserved in whole pages. All helpers report overflow
//! instead of wrapping, since their inputs come from untrusted images.

pub use crate::config::PAGE_SIZE;

/// Page size mask
pub const PAGE_MASK: usize = PAGE_SIZE - 1;

/// Round `value` up to the next page boundary.
#[inline]
pub const fn round_up_to_page(value: usize) -> Option<usize> {
    match value.checked_add(PAGE_MASK) {
        Some(v) => Some(v & !PAGE_MASK),
        None => None,
    }
}

/// Check if `value` is a multiple of the page size.
#[inline]
pub const fn is_page_aligned(value: usize) -> bool {
    value & PAGE_MASK == 0
}

/// Number of whole pages in `bytes`.
#[inline]
pub const fn page_count(bytes: usize) -> usize {
    bytes / PAGE_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_up() {
        assert_eq!(round_up_to_page(0), Some(0));
        assert_eq!(round_up_to_page(1), Some(PAGE_SIZE));
        assert_eq!(round_up_to_page(PAGE_SIZE), Some(PAGE_SIZE));
        assert_eq!(round_up_to_page(4104), Some(8192));
        assert_eq!(round_up_to_page(usize::MAX), None);
    }

    #[test]
    fn test_alignment() {
        assert!(is_page_aligned(0));
        assert!(is_page_aligned(8192));
        assert!(!is_page_aligned(4097));
        assert_eq!(page_count(20480), 5);
    }
}
