use std::mem;

use crate::arena::ArenaId;

/// Header embedded at the start of every block. The payload follows it
/// immediately, so the payload pointer handed to the client sits
/// `BLOCK_HEADER_SIZE` bytes past the block's base address.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct BlockHeader {
  /// Total extent of the block in bytes: this header plus the
  /// alignment-rounded payload.
  pub size: usize,
  /// Handle of the owning arena.
  pub arena: ArenaId,
}

pub(crate) const BLOCK_HEADER_SIZE: usize = mem::size_of::<BlockHeader>();

/// Bookkeeping record for one live block, held by its arena in ascending
/// offset order. Replaces the intrusive previous/next pointers a header would
/// otherwise carry inside the mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlockRec {
  /// Byte offset of the block's header from the arena base.
  pub offset: usize,
  /// Total extent in bytes, mirroring the embedded header.
  pub size: usize,
}

impl BlockRec {
  /// Offset one past the block's last byte, where the next gap begins.
  pub fn end(&self) -> usize {
    self.offset + self.size
  }
}
