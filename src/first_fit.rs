//! The allocator proper: first-fit block placement across a creation-ordered
//! sequence of arenas, plus the public allocate / zero-allocate / resize /
//! release surface.

use std::ptr::{self, NonNull};

use indexmap::IndexMap;
use log::trace;

use crate::align;
use crate::arena::{ARENA_HEADER_SIZE, Arena, ArenaId};
use crate::block::{BLOCK_HEADER_SIZE, BlockHeader};
use crate::error::{AllocError, AllocResult};

/// A first-fit allocator over anonymous memory mappings.
///
/// Each instance owns its arenas outright; there is no process-global state,
/// so independent allocators can coexist and an embedding program can wrap
/// one in whatever synchronization it needs. The type holds raw mapping
/// pointers and is deliberately neither `Send` nor `Sync`: concurrent calls
/// without an external mutex are undefined with respect to list integrity.
///
/// Placement policy: first fit, walking arenas in creation order and gaps
/// within an arena in address order, without splitting. Excess space in a
/// chosen gap stays unusable until a neighboring block is released; that is a
/// documented fragmentation trade-off, not a defect. Arenas are reclaimed
/// eagerly: releasing the last block of an arena unmaps it immediately.
pub struct FirstFitAllocator {
  /// Arenas in creation order. `shift_remove` preserves that order when an
  /// emptied arena is dropped, keeping the search contract stable.
  arenas: IndexMap<ArenaId, Arena>,
  next_id: u64,
}

impl FirstFitAllocator {
  pub fn new() -> Self {
    Self {
      arenas: IndexMap::new(),
      next_id: 0,
    }
  }

  /// Bytes currently mapped from the operating system across all arenas.
  pub fn mapped_bytes(&self) -> usize {
    self.arenas.values().map(Arena::len).sum()
  }

  /// Number of live arenas.
  pub fn arena_count(&self) -> usize {
    self.arenas.len()
  }

  /// Number of live blocks across all arenas.
  pub fn block_count(&self) -> usize {
    self.arenas.values().map(Arena::block_count).sum()
  }

  /// Allocates `size` bytes and returns a pointer to the payload, which is
  /// 8-byte aligned and at least `size` bytes long.
  ///
  /// Fails with [`AllocError::ZeroSize`] for `size == 0`: a zero-size request
  /// never produces a valid allocation here, unlike the ambiguous `malloc(0)`
  /// contract. Oversized requests fail with [`AllocError::Overflow`] before
  /// any memory is touched.
  pub fn allocate(&mut self, size: usize) -> AllocResult<NonNull<u8>> {
    if size == 0 {
      return Err(AllocError::ZeroSize);
    }
    let block_size = align::block_size_for(size).ok_or(AllocError::Overflow)?;
    self.place_block(block_size)
  }

  /// Allocates `count * size` bytes and zero-fills the payload.
  ///
  /// Fails with [`AllocError::Overflow`] when the product is not
  /// representable, before anything is allocated.
  pub fn zero_allocate(&mut self, count: usize, size: usize) -> AllocResult<NonNull<u8>> {
    let bytes = count.checked_mul(size).ok_or(AllocError::Overflow)?;
    let payload = self.allocate(bytes)?;
    // A fresh mapping is zeroed by the OS, but a reused gap is not.
    unsafe {
      ptr::write_bytes(payload.as_ptr(), 0, bytes);
    }
    Ok(payload)
  }

  /// Grows or shrinks the allocation behind `ptr` to `new_size` bytes,
  /// preserving the first `min(old_size, new_size)` bytes of the payload.
  ///
  /// `resize(None, n)` behaves as `allocate(n)`; `resize(Some(p), 0)` behaves
  /// as `release(p)` and returns `Ok(None)`. The new block is allocated and
  /// filled before the old one is released, so the copy source stays mapped
  /// even when the old block was its arena's only occupant; on allocation
  /// failure the old block is left untouched.
  ///
  /// # Safety
  /// `ptr`, when present, must satisfy the same preconditions as
  /// [`release`](Self::release).
  pub unsafe fn resize(
    &mut self,
    ptr: Option<NonNull<u8>>,
    new_size: usize,
  ) -> AllocResult<Option<NonNull<u8>>> {
    let Some(old) = ptr else {
      return self.allocate(new_size).map(Some);
    };
    if new_size == 0 {
      unsafe {
        self.release(old);
      }
      return Ok(None);
    }

    let old_payload = unsafe { header_of(old) }.size - BLOCK_HEADER_SIZE;
    let new = self.allocate(new_size)?;
    unsafe {
      // The old block is still live, so the two payloads cannot overlap.
      ptr::copy_nonoverlapping(old.as_ptr(), new.as_ptr(), old_payload.min(new_size));
      self.release(old);
    }
    Ok(Some(new))
  }

  /// Releases the allocation behind `ptr`. If the block was its arena's only
  /// occupant, the arena's mapping is returned to the OS immediately.
  ///
  /// # Safety
  /// `ptr` must have been returned by this allocator's [`allocate`],
  /// [`zero_allocate`] or [`resize`](Self::resize) and must not have been
  /// released since. Double release, foreign pointers, and use after release
  /// are precondition violations; where the bookkeeping can still detect one
  /// it panics rather than corrupting its tables, but no detection is
  /// guaranteed.
  ///
  /// [`allocate`]: Self::allocate
  /// [`zero_allocate`]: Self::zero_allocate
  pub unsafe fn release(&mut self, ptr: NonNull<u8>) {
    let header = unsafe { header_of(ptr) };
    let Some(arena) = self.arenas.get_mut(&header.arena) else {
      panic!("released pointer does not belong to a live arena");
    };
    debug_assert!(arena.header_intact(header.arena));

    let head = unsafe { ptr.as_ptr().sub(BLOCK_HEADER_SIZE) };
    let offset = unsafe { arena.offset_of(head) };
    trace!("releasing {} byte block in arena {} at offset {}", header.size, header.arena.0, offset);

    if arena.remove(offset) {
      // Last block gone: arenas are never kept around empty.
      self.arenas.shift_remove(&header.arena);
    }
  }

  /// Places a block of `block_size` total bytes: first fit across the arena
  /// sequence, or a fresh arena sized for exactly this block.
  fn place_block(&mut self, block_size: usize) -> AllocResult<NonNull<u8>> {
    for (&id, arena) in self.arenas.iter_mut() {
      if let Some(offset) = arena.find_gap(block_size) {
        trace!("placed {} byte block in arena {} at offset {}", block_size, id.0, offset);
        return Ok(arena.install(offset, block_size, id));
      }
    }

    let num_pages = align::pages_for_block(block_size).ok_or(AllocError::Overflow)?;
    let id = ArenaId(self.next_id);
    let mut arena = Arena::map(id, num_pages)?;
    let payload = arena.install(ARENA_HEADER_SIZE, block_size, id);
    self.next_id += 1;
    self.arenas.insert(id, arena);
    Ok(payload)
  }
}

impl Default for FirstFitAllocator {
  fn default() -> Self {
    Self::new()
  }
}

/// Reads the header embedded immediately before a payload pointer.
///
/// # Safety
/// `payload` must point at the payload of a live block.
unsafe fn header_of(payload: NonNull<u8>) -> BlockHeader {
  unsafe { payload.as_ptr().sub(BLOCK_HEADER_SIZE).cast::<BlockHeader>().read() }
}
