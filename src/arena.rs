//! Arena storage and the chunk header model.
//!
//! The arena owns a fixed-capacity, 8-byte-aligned byte region and partitions
//! it into chunks: an 8-byte header followed by the payload. Headers carry
//! the payload size and the allocation state, nothing else, so reaching a
//! chunk is always offset arithmetic from the arena start.
//!
//! Every `unsafe` operation in the crate lives in this module: raw header
//! word access, payload pointer derivation, and resolving a client pointer
//! back to an arena offset. The engines above (`alloc`, `dealloc`, `audit`)
//! are safe code over these accessors.

use core::cell::UnsafeCell;
use core::ptr::NonNull;
use std::io;

use crate::utils::is_aligned;

/// Total arena capacity in bytes.
pub const CAPACITY: usize = 4096;

/// Alignment unit for headers, payloads and size rounding.
pub const ALIGNMENT: usize = 8;

/// Size of a chunk header: one word holding the payload size (low 32 bits)
/// and the allocation state (high 32 bits).
pub const HEADER_SIZE: usize = 8;

/// Smallest chunk the arena will ever carve out (header plus minimum
/// payload). Splitting never produces anything smaller.
pub const MIN_CHUNK_SIZE: usize = 16;

/// Smallest payload any chunk can carry.
pub(crate) const MIN_PAYLOAD: usize = MIN_CHUNK_SIZE - HEADER_SIZE;

const WORD: usize = size_of::<u64>();

const _: () = assert!(HEADER_SIZE == WORD);
const _: () = assert!(CAPACITY % ALIGNMENT == 0);
const _: () = assert!(MIN_CHUNK_SIZE >= HEADER_SIZE + ALIGNMENT);
const _: () = assert!(CAPACITY >= MIN_CHUNK_SIZE);

/// Allocation state of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    Free,
    Allocated,
}

/// Decoded chunk header.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ChunkHeader {
    pub(crate) size: usize,
    pub(crate) state: ChunkState,
}

/// Undecoded header word, read by free-side validation before the word can
/// be trusted to describe a real chunk.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RawHeader {
    pub(crate) size: usize,
    pub(crate) state_bits: u32,
}

impl RawHeader {
    pub(crate) const FREE: u32 = 0;
    pub(crate) const ALLOCATED: u32 = 1;
}

/// A fixed-capacity memory arena.
///
/// Created as a single free chunk spanning the whole capacity. Word storage
/// guarantees the base (and therefore every payload) is 8-byte aligned;
/// `UnsafeCell` is required because clients write payload bytes through raw
/// pointers while the arena is borrowed.
pub struct Arena {
    words: Box<[UnsafeCell<u64>]>,
}

// SAFETY: The arena exclusively owns its buffer. Payload pointers handed to
// clients are only valid under the single-threaded usage contract.
unsafe impl Send for Arena {}

impl Arena {
    /// Create an arena of [`CAPACITY`] bytes holding a single free chunk.
    #[must_use]
    pub fn new() -> Self {
        let words = (0..CAPACITY / WORD)
            .map(|_| UnsafeCell::new(0))
            .collect::<Box<[_]>>();
        let mut arena = Self { words };
        arena.set_header(
            0,
            ChunkHeader {
                size: CAPACITY - HEADER_SIZE,
                state: ChunkState::Free,
            },
        );
        arena
    }

    /// Arena capacity in bytes.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.words.len() * WORD
    }

    /// Base pointer of the arena region.
    fn base(&self) -> *mut u8 {
        // UnsafeCell is repr(transparent), so the slice pointer doubles as a
        // mutable byte pointer over the whole region.
        self.words.as_ptr().cast_mut().cast::<u8>()
    }

    fn word(&self, offset: usize) -> u64 {
        debug_assert!(is_aligned(offset, WORD));
        debug_assert!(offset < self.capacity());
        // SAFETY: The offset is in bounds and word-aligned. Reads may race
        // only with client payload writes, which the usage contract forbids
        // from touching header words.
        unsafe { self.words[offset / WORD].get().read() }
    }

    fn set_word(&mut self, offset: usize, value: u64) {
        debug_assert!(is_aligned(offset, WORD));
        debug_assert!(offset < self.capacity());
        *self.words[offset / WORD].get_mut() = value;
    }

    /// Read the header word at `offset` without interpreting it.
    pub(crate) fn raw_header(&self, offset: usize) -> RawHeader {
        let word = self.word(offset);
        RawHeader {
            size: (word & u64::from(u32::MAX)) as usize,
            state_bits: (word >> 32) as u32,
        }
    }

    /// Read the header of a known-valid chunk at `offset`.
    pub(crate) fn header(&self, offset: usize) -> ChunkHeader {
        let raw = self.raw_header(offset);
        debug_assert!(raw.state_bits <= RawHeader::ALLOCATED);
        ChunkHeader {
            size: raw.size,
            state: if raw.state_bits == RawHeader::FREE {
                ChunkState::Free
            } else {
                ChunkState::Allocated
            },
        }
    }

    /// Write a chunk header at `offset`.
    pub(crate) fn set_header(&mut self, offset: usize, header: ChunkHeader) {
        debug_assert!(header.size > 0);
        debug_assert!(is_aligned(header.size, ALIGNMENT));
        debug_assert!(offset + HEADER_SIZE + header.size <= self.capacity());
        let state_bits = match header.state {
            ChunkState::Free => RawHeader::FREE,
            ChunkState::Allocated => RawHeader::ALLOCATED,
        };
        self.set_word(
            offset,
            header.size as u64 | (u64::from(state_bits) << 32),
        );
    }

    /// Payload pointer of the chunk at `offset`.
    pub(crate) fn payload_ptr(&self, offset: usize) -> NonNull<u8> {
        debug_assert!(offset + HEADER_SIZE <= self.capacity());
        // SAFETY: The payload start is in bounds, and the base pointer is
        // derived from an owned, non-null buffer.
        unsafe { NonNull::new_unchecked(self.base().add(offset + HEADER_SIZE)) }
    }

    /// Byte offset of `ptr` relative to the arena base, if it points inside
    /// the arena at all.
    pub(crate) fn offset_of(&self, ptr: NonNull<u8>) -> Option<usize> {
        let addr = ptr.as_ptr().addr();
        let base = self.base().addr();
        (addr >= base && addr < base + self.capacity()).then_some(addr - base)
    }

    /// Walk the chunk sequence from the first chunk to the last.
    ///
    /// This traversal is the only way to reach a chunk; there is no side
    /// index, so "find the chunk before X" is a scan from the start.
    #[must_use]
    pub fn chunks(&self) -> Chunks<'_> {
        Chunks {
            arena: self,
            offset: 0,
        }
    }

    /// Print every chunk's offset, payload size and state in arena order.
    ///
    /// Diagnostic only; the allocation algorithms never call this.
    ///
    /// # Errors
    ///
    /// Propagates failures from the underlying writer.
    pub fn dump<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "=== arena dump ===")?;
        for (index, chunk) in self.chunks().enumerate() {
            writeln!(
                writer,
                "chunk {index}: offset={:#06x} size={} state={:?}",
                chunk.offset, chunk.size, chunk.state
            )?;
        }
        writeln!(writer, "=== end arena dump ===")
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

/// A chunk as seen by traversal: its offset, payload size and state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkInfo {
    pub offset: usize,
    pub size: usize,
    pub state: ChunkState,
}

/// Iterator over the arena's chunk sequence.
pub struct Chunks<'a> {
    arena: &'a Arena,
    offset: usize,
}

impl Iterator for Chunks<'_> {
    type Item = ChunkInfo;

    fn next(&mut self) -> Option<ChunkInfo> {
        if self.offset >= self.arena.capacity() {
            return None;
        }
        let header = self.arena.header(self.offset);
        // A zero-size header would stall the walk; treat it as the end.
        if header.size == 0 {
            self.offset = self.arena.capacity();
            return None;
        }
        let info = ChunkInfo {
            offset: self.offset,
            size: header.size,
            state: header.state,
        };
        self.offset += HEADER_SIZE + header.size;
        Some(info)
    }
}
