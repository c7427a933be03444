//! Per-arena allocation counters.
//!
//! [`ArenaMetrics`] is updated in place by every push, rewind and growth
//! step. It is the observability hook for the one tolerated runtime
//! failure (a decommit refused by the OS), and the cheapest way to see
//! which growth path an arena is actually taking.

/// Cumulative counters for one arena.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArenaMetrics {
    /// Successful push calls (including alignment-only pushes).
    pub pushes: u64,
    /// Rewinds via `pop_to`, `pop` and `clear`.
    pub rewinds: u64,
    /// Times the reservation was extended by committing pages.
    pub commits: u64,
    /// Times trailing pages were decommitted on rewind.
    pub decommits: u64,
    /// Decommits the OS refused. The pages simply stay committed.
    pub decommit_failures: u64,
    /// Heap chunks linked after creation.
    pub chunks_linked: u64,
    /// Times growth moved onto an already linked chunk left behind by a
    /// rewind instead of linking a new one.
    pub chunk_reuses: u64,
    /// Times a reserve/commit arena switched to chunks (0 or 1).
    pub fallbacks: u64,
    /// Highest cursor position ever reached.
    pub high_water: usize,
}

impl ArenaMetrics {
    pub(crate) fn record_push(&mut self, end: usize) {
        self.pushes += 1;
        self.high_water = self.high_water.max(end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = ArenaMetrics::default();
        assert_eq!(m.pushes, 0);
        assert_eq!(m.decommit_failures, 0);
        assert_eq!(m.high_water, 0);
    }

    #[test]
    fn high_water_only_rises() {
        let mut m = ArenaMetrics::default();
        m.record_push(128);
        m.record_push(64);
        assert_eq!(m.pushes, 2);
        assert_eq!(m.high_water, 128);
    }
}
