//! Leak auditor.

use crate::arena::{Arena, ChunkState};

/// Summary of chunks still allocated at shutdown.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LeakReport {
    /// Number of chunks still allocated.
    pub objects: usize,
    /// Total payload bytes still allocated.
    pub bytes: usize,
}

impl LeakReport {
    /// Whether nothing was leaked.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.objects == 0
    }
}

impl Arena {
    /// Walk the arena and account for every chunk still allocated.
    ///
    /// Observational only: state is never altered.
    #[must_use]
    pub fn leak_report(&self) -> LeakReport {
        let mut report = LeakReport::default();
        for chunk in self.chunks() {
            if chunk.state == ChunkState::Allocated {
                report.objects += 1;
                report.bytes += chunk.size;
            }
        }
        report
    }
}
