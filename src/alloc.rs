//! Allocation engine.
//!
//! First-fit search over the chunk sequence with 8-byte size rounding.
//! First-fit keeps the scan simple and cheap per request, at the cost of
//! leaving larger free chunks fragmented earlier than best-fit would.

use core::ptr::NonNull;

use crate::arena::{ALIGNMENT, Arena, ChunkHeader, ChunkState, HEADER_SIZE, MIN_PAYLOAD};
use crate::error::{HeapError, Result};
use crate::utils::align_up;

impl Arena {
    /// Allocate `size` bytes and return a pointer to the payload start.
    ///
    /// The request is rounded up to a multiple of 8 and floored at the
    /// minimum payload, so the resulting chunk can always be split and
    /// merged independently later. The first free chunk large enough is
    /// taken; it is split when the remainder can still hold a header plus
    /// the minimum payload, and used whole otherwise so that no unusable
    /// sliver is ever created.
    ///
    /// Failed requests leave the arena completely untouched.
    ///
    /// # Errors
    ///
    /// - `HeapError::InvalidRequest` if `size` is zero
    /// - `HeapError::OutOfMemory` if no free chunk can satisfy the request
    pub fn allocate(&mut self, size: usize) -> Result<NonNull<u8>> {
        if size == 0 {
            return Err(HeapError::InvalidRequest);
        }

        // Requests beyond the whole arena can never fit; rejecting them here
        // also keeps the rounding below overflow-free.
        if size > self.capacity() {
            return Err(HeapError::OutOfMemory(size));
        }
        let aligned = align_up(size, ALIGNMENT).max(MIN_PAYLOAD);

        let mut offset = 0;
        while offset < self.capacity() {
            let chunk = self.header(offset);

            if chunk.state == ChunkState::Free && chunk.size >= aligned {
                let remaining = chunk.size - aligned;

                if remaining >= HEADER_SIZE + MIN_PAYLOAD {
                    // Split: allocated prefix, free remainder right after it.
                    self.set_header(
                        offset + HEADER_SIZE + aligned,
                        ChunkHeader {
                            size: remaining - HEADER_SIZE,
                            state: ChunkState::Free,
                        },
                    );
                    self.set_header(
                        offset,
                        ChunkHeader {
                            size: aligned,
                            state: ChunkState::Allocated,
                        },
                    );
                } else {
                    // Too little left over to stand alone; hand out the
                    // whole chunk.
                    self.set_header(
                        offset,
                        ChunkHeader {
                            size: chunk.size,
                            state: ChunkState::Allocated,
                        },
                    );
                }

                return Ok(self.payload_ptr(offset));
            }

            offset += HEADER_SIZE + chunk.size;
        }

        Err(HeapError::OutOfMemory(size))
    }
}
