//! Deallocation engine.
//!
//! Frees run a validation ladder before any state changes: bounds, then
//! alignment, then header plausibility, then double-free. Only a pointer
//! that survives all four stages is treated as a live payload. After the
//! chunk is marked free it is coalesced with its neighbors immediately, so
//! two adjacent free chunks never exist between operations.
//!
//! The plausibility stage is what catches pointers that are in bounds and
//! aligned but were never returned by the allocator, such as a pointer into
//! the middle of a payload: the bytes there are interpreted as a header, and
//! a fabricated header almost always fails the size or state checks. A
//! payload pattern that happens to decode as a small valid header can slip
//! through; the state-word check narrows that window but does not close it.

use core::ptr::NonNull;

use crate::arena::{ALIGNMENT, Arena, ChunkHeader, ChunkState, HEADER_SIZE, RawHeader};
use crate::error::{HeapError, PointerFault, Result};
use crate::utils::is_aligned;

impl Arena {
    /// Free the chunk whose payload starts at `ptr`.
    ///
    /// The pointer may be any value; everything that is not exactly a live
    /// payload start is reported as an error without touching arena state.
    /// Null handling (a benign no-op) belongs to the boundary layer, which
    /// is why this takes `NonNull`.
    ///
    /// # Errors
    ///
    /// - `HeapError::InvalidPointer` if `ptr` is outside the arena,
    ///   misaligned, or does not resolve to a plausible chunk header
    /// - `HeapError::DoubleFree` if the chunk is already free
    pub fn deallocate(&mut self, ptr: NonNull<u8>) -> Result<()> {
        let offset = self.validate(ptr)?;

        let mut size = self.header(offset).size;

        // Forward coalesce: absorb the next chunk if it is free.
        let next = offset + HEADER_SIZE + size;
        if next < self.capacity() {
            let next_header = self.header(next);
            if next_header.state == ChunkState::Free {
                size += HEADER_SIZE + next_header.size;
            }
        }

        self.set_header(
            offset,
            ChunkHeader {
                size,
                state: ChunkState::Free,
            },
        );

        // Backward coalesce: headers do not record their predecessor, so
        // scan from the first chunk for the one ending at `offset`.
        let mut scan = 0;
        while scan < offset {
            let header = self.header(scan);
            let end = scan + HEADER_SIZE + header.size;
            if end == offset {
                if header.state == ChunkState::Free {
                    self.set_header(
                        scan,
                        ChunkHeader {
                            size: header.size + HEADER_SIZE + size,
                            state: ChunkState::Free,
                        },
                    );
                }
                break;
            }
            scan = end;
        }

        Ok(())
    }

    /// Run the validation ladder and return the owning chunk's offset.
    fn validate(&self, ptr: NonNull<u8>) -> Result<usize> {
        let Some(payload_offset) = self.offset_of(ptr) else {
            return Err(HeapError::InvalidPointer(PointerFault::OutOfBounds));
        };

        if !is_aligned(payload_offset, ALIGNMENT) {
            return Err(HeapError::InvalidPointer(PointerFault::Misaligned));
        }

        // The first payload starts at HEADER_SIZE; anything below that
        // cannot have a header in front of it.
        if payload_offset < HEADER_SIZE {
            return Err(HeapError::InvalidPointer(PointerFault::CorruptHeader));
        }
        let offset = payload_offset - HEADER_SIZE;

        let raw = self.raw_header(offset);
        let plausible = raw.size > 0
            && is_aligned(raw.size, ALIGNMENT)
            && offset + HEADER_SIZE + raw.size <= self.capacity()
            && raw.state_bits <= RawHeader::ALLOCATED;
        if !plausible {
            return Err(HeapError::InvalidPointer(PointerFault::CorruptHeader));
        }

        if self.header(offset).state == ChunkState::Free {
            return Err(HeapError::DoubleFree);
        }

        Ok(offset)
    }
}
