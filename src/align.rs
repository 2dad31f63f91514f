//! Size rounding and overflow-checked layout arithmetic.
//!
//! Every size the allocator derives from client input goes through this
//! module, so a request near `usize::MAX` fails cleanly instead of wrapping
//! into a tiny mapping.

use crate::arena::ARENA_HEADER_SIZE;
use crate::block::BLOCK_HEADER_SIZE;

/// Size in bytes of one page requested from the operating system.
pub const PAGE_SIZE: usize = 4096;

/// Payloads are aligned to this boundary.
pub const ALIGNMENT: usize = 8;

/// Rounds `value` up to a multiple of `alignment` (a power of two).
/// `None` when the rounded value is not representable.
pub(crate) fn round_up(value: usize, alignment: usize) -> Option<usize> {
  debug_assert!(alignment.is_power_of_two());
  Some(value.checked_add(alignment - 1)? & !(alignment - 1))
}

/// Total extent of a block hosting a `payload`-byte allocation: the payload
/// rounded up to [`ALIGNMENT`], plus the embedded block header.
pub(crate) fn block_size_for(payload: usize) -> Option<usize> {
  round_up(payload, ALIGNMENT)?.checked_add(BLOCK_HEADER_SIZE)
}

/// Number of pages a fresh arena needs to host a single block of
/// `block_size` bytes after its own header.
pub(crate) fn pages_for_block(block_size: usize) -> Option<usize> {
  let total = block_size.checked_add(ARENA_HEADER_SIZE)?;
  Some(round_up(total, PAGE_SIZE)? / PAGE_SIZE)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn round_up_covers_every_residue() {
    for base in 0..8usize {
      let start = base * ALIGNMENT + 1;
      for value in start..=start + ALIGNMENT - 1 {
        assert_eq!(round_up(value, ALIGNMENT), Some((base + 1) * ALIGNMENT));
      }
    }
    assert_eq!(round_up(0, ALIGNMENT), Some(0));
    assert_eq!(round_up(PAGE_SIZE, PAGE_SIZE), Some(PAGE_SIZE));
    assert_eq!(round_up(PAGE_SIZE + 1, PAGE_SIZE), Some(2 * PAGE_SIZE));
  }

  #[test]
  fn round_up_detects_wraparound() {
    assert_eq!(round_up(usize::MAX, ALIGNMENT), None);
    assert_eq!(round_up(usize::MAX - 2, PAGE_SIZE), None);
  }

  #[test]
  fn block_size_includes_header_and_rounding() {
    assert_eq!(block_size_for(1), Some(ALIGNMENT + BLOCK_HEADER_SIZE));
    assert_eq!(block_size_for(8), Some(8 + BLOCK_HEADER_SIZE));
    assert_eq!(block_size_for(9), Some(16 + BLOCK_HEADER_SIZE));
    assert_eq!(block_size_for(usize::MAX - 3), None);
  }

  #[test]
  fn page_count_accounts_for_arena_header() {
    // A block that fits next to the arena header needs one page; one byte
    // past that boundary spills into a second page.
    let fits = PAGE_SIZE - ARENA_HEADER_SIZE;
    assert_eq!(pages_for_block(fits), Some(1));
    assert_eq!(pages_for_block(fits + 1), Some(2));
    assert_eq!(pages_for_block(3 * PAGE_SIZE), Some(4));
  }

  #[test]
  fn page_count_detects_wraparound() {
    assert_eq!(pages_for_block(usize::MAX - ARENA_HEADER_SIZE + 1), None);
    assert_eq!(pages_for_block(usize::MAX - ARENA_HEADER_SIZE), None);
  }
}
