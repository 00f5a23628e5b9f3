//! # Progress Tracking
//!
//! A retried or restarted transfer may replay data the channel already
//! counted: a substrate that cannot resume starts again from zero. The
//! tracker keeps the high-water mark and only releases progress above it,
//! so forwarded deltas always sum to the furthest point ever reached.

use super::types::ResumePoint;

#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    acked: ResumePoint,
    position: ResumePoint,
}

impl ProgressTracker {
    /// Start tracking with `acked` already counted.
    pub fn new(acked: ResumePoint) -> Self {
        Self {
            acked,
            position: acked,
        }
    }

    /// A new attempt begins at `start`.
    pub fn restart_at(&mut self, start: ResumePoint) {
        self.position = start;
    }

    /// Apply a substrate report. Returns the part beyond the high-water mark.
    pub fn apply(&mut self, bytes: u64, blocks: u64) -> Option<(u64, u64)> {
        self.position.bytes = self.position.bytes.saturating_add(bytes);
        self.position.blocks = self.position.blocks.saturating_add(blocks);

        let bytes_delta = self.position.bytes.saturating_sub(self.acked.bytes);
        let blocks_delta = self.position.blocks.saturating_sub(self.acked.blocks);
        if bytes_delta == 0 && blocks_delta == 0 {
            return None;
        }

        self.acked.bytes = self.acked.bytes.max(self.position.bytes);
        self.acked.blocks = self.acked.blocks.max(self.position.blocks);
        Some((bytes_delta, blocks_delta))
    }

    #[must_use]
    pub fn acknowledged(&self) -> ResumePoint {
        self.acked
    }
}
