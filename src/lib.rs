//! # Tileheap: Fixed-Arena Allocator with Misuse Detection
//!
//! Tileheap manages a single fixed-capacity arena and provides `malloc`/`free`
//! style allocation on top of it, while detecting the classic ways the
//! interface gets misused.
//!
//! ## Architecture
//!
//! The arena is partitioned into chunks, each a fixed 8-byte header (payload
//! size + allocation state) followed by its payload. There is no free list:
//! traversal is pure offset arithmetic from the first chunk, so the chunk
//! sequence always tiles the arena exactly.
//!
//! - **Allocation**: first-fit scan with 8-byte size rounding; oversized free
//!   chunks are split so the remainder stays usable.
//! - **Deallocation**: a validation ladder (bounds, alignment, header
//!   plausibility, double-free) runs before any state changes; adjacent free
//!   chunks are coalesced immediately in both directions.
//! - **Leak audit**: a read-only walk reports chunks still allocated at
//!   shutdown.
//!
//! Error detection covers out-of-memory, pointers never returned by the
//! allocator, pointers into the middle of a chunk, double frees, and leaks.
//!
//! ## Usage
//!
//! The core engine operates on an explicit [`Arena`] value:
//!
//! ```rust
//! use tileheap::Arena;
//!
//! let mut arena = Arena::new();
//!
//! let ptr = arena.allocate(100).unwrap();
//! // Use the memory...
//! arena.deallocate(ptr).unwrap();
//!
//! assert!(arena.leak_report().is_clean());
//! ```
//!
//! Programs that want the drop-in `malloc`/`free` surface use the [`global`]
//! boundary layer instead, via the [`malloc!`] and [`free!`] macros. That
//! layer owns the single process-wide arena, prints diagnostics with the
//! caller's file and line, and terminates the process with status 2 on fatal
//! misuse (invalid pointer or double free).
#![warn(clippy::pedantic, clippy::nursery)]
#![forbid(unsafe_op_in_unsafe_fn)]

mod alloc;
mod arena;
mod audit;
mod dealloc;
mod error;
pub mod global;
mod utils;

// Public exports
pub use arena::{
    ALIGNMENT, Arena, CAPACITY, ChunkInfo, ChunkState, Chunks, HEADER_SIZE, MIN_CHUNK_SIZE,
};
pub use audit::LeakReport;
pub use error::{HeapError, PointerFault, Result};
