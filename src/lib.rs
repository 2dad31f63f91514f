//! # mapalloc - A First-Fit Memory Allocator Over mmap Arenas
//!
//! This crate implements a self-contained dynamic memory allocator that
//! manages its own virtual address space with anonymous `mmap(2)` regions,
//! independent of the platform allocator. It exposes the four canonical
//! operations - allocate, zero-allocate, resize, release - for client code
//! that needs deterministic control over heap layout.
//!
//! ## Overview
//!
//! Memory is organized in two nested scopes. The allocator owns a sequence
//! of **arenas**, coarse page-aligned mappings obtained from the OS; each
//! arena hosts a sequence of **blocks**, the individual client allocations:
//!
//! ```text
//!   Allocator State:
//!
//!   FirstFitAllocator ── arenas (creation order) ──┐
//!                                                  ▼
//!   ┌─ Arena 0 (1 page) ──────────────────┐  ┌─ Arena 1 (3 pages) ─────────┐
//!   │ ┌──────┬─────────┬─────────┬──────┐ │  │ ┌──────┬──────────────────┐ │
//!   │ │arena │ block A │ block B │ free │ │  │ │arena │     block C      │ │
//!   │ │header│hdr│ data│hdr│ data│      │ │  │ │header│ hdr │    data    │ │
//!   │ └──────┴─────────┴─────────┴──────┘ │  │ └──────┴──────────────────┘ │
//!   └─────────────────────────────────────┘  └─────────────────────────────┘
//!
//!   Placement is first-fit: arenas are walked in creation order, gaps
//!   within an arena in address order, and the first gap large enough
//!   wins. Gaps are never split; an arena whose last block is released
//!   is unmapped immediately.
//! ```
//!
//! Each block carries a small header directly in front of the payload:
//!
//! ```text
//!   Single Block:
//!   ┌────────────────────────┬───────────────────────────────┐
//!   │     Block Header       │           Payload             │
//!   │  ┌──────────────────┐  │  ┌─────────────────────────┐  │
//!   │  │ size:  total     │  │  │  requested bytes,       │  │
//!   │  │ arena: handle    │  │  │  rounded up to 8        │  │
//!   │  └──────────────────┘  │  └─────────────────────────┘  │
//!   └────────────────────────┴───────────────────────────────┘
//!                            ▲
//!                            └── Pointer returned to the client
//! ```
//!
//! Unlike a classic intrusive design, the previous/next relationships of
//! arenas and blocks live in owned containers inside the allocator (an
//! insertion-ordered arena table and a sorted per-arena block table); the
//! embedded header only records the block's extent and the stable handle of
//! its owning arena.
//!
//! ## Crate Structure
//!
//! ```text
//!   mapalloc
//!   ├── align      - size rounding and overflow-checked page arithmetic
//!   ├── arena      - OS mapping lifecycle and the per-arena block table
//!   ├── block      - embedded block header and bookkeeping records
//!   ├── error      - failure taxonomy
//!   └── first_fit  - FirstFitAllocator: placement engine and public API
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mapalloc::FirstFitAllocator;
//!
//! fn main() {
//!     let mut allocator = FirstFitAllocator::new();
//!
//!     let ptr = allocator.allocate(64).expect("allocation failed");
//!     unsafe {
//!         ptr.as_ptr().write(42);
//!         println!("Value: {}", ptr.as_ptr().read());
//!
//!         allocator.release(ptr);
//!     }
//! }
//! ```
//!
//! ## Failure Contract
//!
//! - `allocate(0)` is a defined failure, never a zero-byte allocation.
//! - Any size computation that would wrap `usize` fails before memory is
//!   touched.
//! - A refused OS mapping propagates as a failure with no partial state.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: no internal synchronization; the allocator
//!   is `!Send + !Sync` and expects one logical owner
//! - **No coalescing or splitting**: first-fit placement with the
//!   fragmentation behavior that implies
//! - **No empty-arena caching**: reclamation is eager
//! - **Unix-only**: requires `libc` and `mmap` (POSIX systems)
//!
//! ## Safety
//!
//! Allocation itself is safe; using the returned memory, resizing, and
//! releasing are `unsafe` and carry the usual allocator preconditions
//! (no double release, no foreign pointers, no use after release).

mod align;
mod arena;
mod block;
mod error;
mod first_fit;

pub use align::{ALIGNMENT, PAGE_SIZE};
pub use error::{AllocError, AllocResult};
pub use first_fit::FirstFitAllocator;
