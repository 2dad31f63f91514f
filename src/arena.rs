//! Arena management: acquisition and release of page-aligned mappings from
//! the operating system, and the per-arena block table.
//!
//! An [`Arena`] owns exactly one anonymous private mapping. Dropping it
//! returns the mapping with `munmap`, so arena reclamation and allocator
//! teardown are both expressed as plain ownership.

use std::mem;
use std::ptr::{self, NonNull};

use log::debug;

use crate::align::PAGE_SIZE;
use crate::block::{BLOCK_HEADER_SIZE, BlockHeader, BlockRec};
use crate::error::{AllocError, AllocResult};

/// Stable handle of one arena. Handles are issued from a monotonically
/// increasing counter and never reused within an allocator's lifetime, so a
/// handle read back from a released block's header cannot silently alias a
/// newer arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub(crate) struct ArenaId(pub u64);

/// Header written once at the base of every mapping. The first block always
/// begins immediately after it; placement never probes the space in front of
/// the first live block.
#[repr(C)]
struct ArenaHeader {
  id: u64,
  num_pages: usize,
}

pub(crate) const ARENA_HEADER_SIZE: usize = mem::size_of::<ArenaHeader>();

/// One OS-backed mapping plus the bookkeeping for the blocks it hosts.
pub(crate) struct Arena {
  base: NonNull<u8>,
  num_pages: usize,
  /// Live blocks, strictly ordered by ascending offset and non-overlapping.
  blocks: Vec<BlockRec>,
}

impl Arena {
  /// Maps `num_pages` fresh, zero-initialized, read-write pages and writes
  /// the arena header. On refusal by the OS no state is created.
  pub fn map(id: ArenaId, num_pages: usize) -> AllocResult<Self> {
    let len = num_pages * PAGE_SIZE;
    let addr = unsafe {
      libc::mmap(
        ptr::null_mut(),
        len,
        libc::PROT_READ | libc::PROT_WRITE,
        libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
        -1,
        0,
      )
    };
    if addr == libc::MAP_FAILED {
      return Err(AllocError::MappingFailed { bytes: len });
    }
    let base = NonNull::new(addr.cast::<u8>())
      .ok_or(AllocError::MappingFailed { bytes: len })?;

    unsafe {
      base.cast::<ArenaHeader>().write(ArenaHeader { id: id.0, num_pages });
    }
    debug!("mapped arena {}: {} pages ({} bytes) at {:p}", id.0, num_pages, len, base);

    Ok(Self {
      base,
      num_pages,
      blocks: Vec::new(),
    })
  }

  #[cfg(test)]
  pub fn base(&self) -> NonNull<u8> {
    self.base
  }

  /// Whether the embedded header still matches the bookkeeping. A mismatch
  /// means a client handed back a pointer into a foreign or clobbered
  /// mapping.
  pub fn header_intact(&self, id: ArenaId) -> bool {
    let header = unsafe { self.base.cast::<ArenaHeader>().as_ref() };
    header.id == id.0 && header.num_pages == self.num_pages
  }

  /// Length of the mapping in bytes.
  pub fn len(&self) -> usize {
    self.num_pages * PAGE_SIZE
  }

  pub fn block_count(&self) -> usize {
    self.blocks.len()
  }

  /// First-fit gap search, in address order: the space after each live block,
  /// bounded by the next block's offset or the arena end. Returns the offset
  /// of the first gap that can host `block_size` bytes.
  pub fn find_gap(&self, block_size: usize) -> Option<usize> {
    let end = self.len();
    for (i, rec) in self.blocks.iter().enumerate() {
      let candidate = rec.end();
      let limit = self.blocks.get(i + 1).map_or(end, |next| next.offset);
      if limit - candidate >= block_size {
        return Some(candidate);
      }
    }
    None
  }

  /// Writes a block header at `offset` and records the block at its sorted
  /// position. Returns the payload pointer.
  pub fn install(&mut self, offset: usize, block_size: usize, id: ArenaId) -> NonNull<u8> {
    debug_assert!(offset >= ARENA_HEADER_SIZE);
    debug_assert!(offset + block_size <= self.len());

    let idx = self.blocks.partition_point(|rec| rec.offset < offset);
    debug_assert!(idx == 0 || self.blocks[idx - 1].end() <= offset);
    debug_assert!(self.blocks.get(idx).is_none_or(|next| offset + block_size <= next.offset));

    unsafe {
      let head = self.base.as_ptr().add(offset).cast::<BlockHeader>();
      head.write(BlockHeader { size: block_size, arena: id });
    }
    self.blocks.insert(idx, BlockRec { offset, size: block_size });
    unsafe { NonNull::new_unchecked(self.base.as_ptr().add(offset + BLOCK_HEADER_SIZE)) }
  }

  /// Byte offset of a block header pointer from the arena base.
  ///
  /// # Safety
  /// `head` must point into this arena's mapping.
  pub unsafe fn offset_of(&self, head: *const u8) -> usize {
    let offset = unsafe { head.offset_from(self.base.as_ptr()) };
    debug_assert!(offset >= 0 && (offset as usize) < self.len());
    offset as usize
  }

  /// Drops the record for the block at `offset`. Returns `true` when the
  /// arena no longer hosts any block and must be released.
  ///
  /// Panics when `offset` does not match a live block; a failed lookup here
  /// means the caller violated the release preconditions, and halting beats
  /// corrupting the table.
  pub fn remove(&mut self, offset: usize) -> bool {
    match self.blocks.binary_search_by_key(&offset, |rec| rec.offset) {
      Ok(idx) => {
        self.blocks.remove(idx);
      }
      Err(_) => panic!("released pointer does not match a live block"),
    }
    self.blocks.is_empty()
  }
}

impl Drop for Arena {
  fn drop(&mut self) {
    let len = self.len();
    unsafe {
      libc::munmap(self.base.as_ptr().cast::<libc::c_void>(), len);
    }
    debug!("unmapped arena at {:p} ({} bytes)", self.base, len);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn block(size: usize) -> usize {
    size + BLOCK_HEADER_SIZE
  }

  #[test]
  fn map_stamps_the_header_at_base() {
    let arena = Arena::map(ArenaId(7), 2).unwrap();
    assert_eq!(arena.len(), 2 * PAGE_SIZE);
    let header = unsafe { arena.base().cast::<ArenaHeader>().as_ref() };
    assert_eq!(header.id, 7);
    assert_eq!(header.num_pages, 2);
    assert!(arena.header_intact(ArenaId(7)));
    assert!(!arena.header_intact(ArenaId(8)));
  }

  #[test]
  fn mapping_is_zero_initialized() {
    let arena = Arena::map(ArenaId(0), 1).unwrap();
    let bytes = unsafe {
      std::slice::from_raw_parts(arena.base().as_ptr().add(ARENA_HEADER_SIZE), 64)
    };
    assert!(bytes.iter().all(|&b| b == 0));
  }

  #[test]
  fn gap_search_is_first_fit_in_address_order() {
    let id = ArenaId(0);
    let mut arena = Arena::map(id, 1).unwrap();

    let first = ARENA_HEADER_SIZE;
    arena.install(first, block(64), id);
    let second = first + block(64);
    arena.install(second, block(128), id);

    // Only the tail gap is open.
    assert_eq!(arena.find_gap(block(8)), Some(second + block(128)));

    // Freeing the middle block opens a gap between the neighbors, and the
    // first fitting gap wins even when the tail gap is larger.
    assert!(!arena.remove(second));
    assert_eq!(arena.find_gap(block(128)), Some(second));
    assert_eq!(arena.find_gap(block(8)), Some(second));

    // A middle gap too small for the request is skipped in favor of the
    // tail gap.
    arena.install(second, block(128), id);
    let third = second + block(128);
    arena.install(third, block(32), id);
    assert!(!arena.remove(second));
    assert_eq!(arena.find_gap(block(256)), Some(third + block(32)));
    assert_eq!(arena.find_gap(block(64)), Some(second));
  }

  #[test]
  fn space_before_first_block_is_never_probed() {
    let id = ArenaId(0);
    let mut arena = Arena::map(id, 1).unwrap();

    let first = ARENA_HEADER_SIZE;
    arena.install(first, block(64), id);
    let second = first + block(64);
    arena.install(second, block(64), id);

    // Removing the head block leaves its space unreachable; the next fit
    // lands after the surviving block.
    assert!(!arena.remove(first));
    assert_eq!(arena.find_gap(block(8)), Some(second + block(64)));
  }

  #[test]
  fn gap_search_fails_when_arena_is_full() {
    let id = ArenaId(0);
    let mut arena = Arena::map(id, 1).unwrap();
    let size = PAGE_SIZE - ARENA_HEADER_SIZE;
    arena.install(ARENA_HEADER_SIZE, size, id);
    assert_eq!(arena.find_gap(8), None);
  }

  #[test]
  fn remove_reports_empty_arena() {
    let id = ArenaId(0);
    let mut arena = Arena::map(id, 1).unwrap();
    arena.install(ARENA_HEADER_SIZE, block(16), id);
    let next = ARENA_HEADER_SIZE + block(16);
    arena.install(next, block(16), id);

    assert!(!arena.remove(ARENA_HEADER_SIZE));
    assert!(arena.remove(next));
  }

  #[test]
  #[should_panic(expected = "does not match a live block")]
  fn remove_of_unknown_offset_panics() {
    let id = ArenaId(0);
    let mut arena = Arena::map(id, 1).unwrap();
    arena.install(ARENA_HEADER_SIZE, block(16), id);
    arena.remove(ARENA_HEADER_SIZE + 8);
  }
}
