use thiserror::Error;

/// The specific way a freed pointer failed validation.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PointerFault {
    /// Pointer lies outside the arena entirely
    #[error("out of bounds")]
    OutOfBounds,
    /// Pointer is not on an 8-byte boundary relative to the arena start
    #[error("misaligned")]
    Misaligned,
    /// Pointer is in bounds and aligned but does not resolve to a plausible
    /// chunk header (e.g. it points into the middle of a payload)
    #[error("invalid chunk header")]
    CorruptHeader,
}

/// Errors that can occur during arena operations
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum HeapError {
    /// Zero-size allocation request
    #[error("Unable to allocate 0 bytes")]
    InvalidRequest,
    /// No free chunk large enough for the requested size
    #[error("Unable to allocate {0} bytes")]
    OutOfMemory(usize),
    /// Attempted to free a pointer the allocator never returned
    #[error("Inappropriate pointer, {0}")]
    InvalidPointer(PointerFault),
    /// Attempted to free a chunk that is already free
    #[error("Double free")]
    DoubleFree,
}

impl HeapError {
    /// Whether the boundary layer treats this error as a caller contract
    /// breach that must terminate the process.
    ///
    /// Soft errors (`InvalidRequest`, `OutOfMemory`) leave the arena
    /// untouched and the caller may continue.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::InvalidPointer(_) | Self::DoubleFree)
    }
}

pub type Result<T> = core::result::Result<T, HeapError>;
