//! Per-remaining-piece-count performance counters and the two optional
//! signal-driven flags that request a mid-search status dump.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// One row of the statistics table, keyed externally by remaining-piece
/// count `k`.
#[derive(Default)]
pub struct PieceCountStats {
    pub attempts: AtomicU64,
    pub fits: AtomicU64,
    pub filters: AtomicU64,
    pub parity_backtracks: AtomicU64,
    pub volume_backtracks: AtomicU64,
}

/// The performance-meter tree: a flat table indexed by remaining-piece
/// count, plus a handful of puzzle-wide totals. The search itself is
/// single-threaded, so plain `AtomicU64` cells are used only for interior
/// mutability through a shared `&Stats` reference, not for cross-thread
/// safety.
#[derive(Debug)]
pub struct Stats {
    by_piece_count: Vec<PieceCountStats>,
    pub solutions: AtomicU64,
    pub redundant_solutions: AtomicU64,
    pub monte_carlo_trials: AtomicU64,
}

impl Stats {
    pub fn new(max_piece_count: usize) -> Stats {
        let mut by_piece_count = Vec::with_capacity(max_piece_count + 1);
        by_piece_count.resize_with(max_piece_count + 1, PieceCountStats::default);
        Stats {
            by_piece_count,
            solutions: AtomicU64::new(0),
            redundant_solutions: AtomicU64::new(0),
            monte_carlo_trials: AtomicU64::new(0),
        }
    }

    fn row(&self, remaining: usize) -> &PieceCountStats {
        &self.by_piece_count[remaining.min(self.by_piece_count.len() - 1)]
    }

    pub fn record_attempt(&self, remaining: usize) {
        self.row(remaining).attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fit(&self, remaining: usize) {
        self.row(remaining).fits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_filter(&self, remaining: usize) {
        self.row(remaining).filters.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_parity_backtrack(&self, remaining: usize) {
        self.row(remaining)
            .parity_backtracks
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_volume_backtrack(&self, remaining: usize) {
        self.row(remaining)
            .volume_backtracks
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_solution(&self) {
        self.solutions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_redundant_solution(&self) {
        self.redundant_solutions.fetch_add(1, Ordering::Relaxed);
    }

    /// Iterate `(remaining_piece_count, row)` for every row with at least
    /// one nonzero counter — the formatter skips untouched rows. A row can
    /// carry only a backtrack count with zero attempts (a top-level parity
    /// or volume rejection happens before any placement is attempted), so
    /// this checks every counter rather than just `attempts`.
    pub fn rows(&self) -> impl Iterator<Item = (usize, &PieceCountStats)> {
        self.by_piece_count.iter().enumerate().filter(|(_, row)| {
            row.attempts.load(Ordering::Relaxed) > 0
                || row.fits.load(Ordering::Relaxed) > 0
                || row.filters.load(Ordering::Relaxed) > 0
                || row.parity_backtracks.load(Ordering::Relaxed) > 0
                || row.volume_backtracks.load(Ordering::Relaxed) > 0
        })
    }
}

/// Flags set by an installed OS signal handler and polled at every
/// recursive entry. Neither mutates search state; they only request that
/// the next poll print something.
pub static PRINT_STATS_REQUESTED: AtomicBool = AtomicBool::new(false);
pub static PRINT_TRACE_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Take and clear the "print running statistics" request, if any.
pub fn take_print_stats_request() -> bool {
    PRINT_STATS_REQUESTED.swap(false, Ordering::Relaxed)
}

/// Take and clear the "print current partial placement" request, if any.
pub fn take_print_trace_request() -> bool {
    PRINT_TRACE_REQUESTED.swap(false, Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_only_reports_touched_counts() {
        let stats = Stats::new(10);
        stats.record_attempt(3);
        stats.record_fit(3);
        let rows: Vec<_> = stats.rows().collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, 3);
    }

    #[test]
    fn out_of_range_remaining_clamps_into_last_row() {
        let stats = Stats::new(2);
        stats.record_attempt(100);
        let rows: Vec<_> = stats.rows().collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, 2);
    }

    #[test]
    fn signal_flags_round_trip() {
        assert!(!take_print_stats_request());
        PRINT_STATS_REQUESTED.store(true, Ordering::Relaxed);
        assert!(take_print_stats_request());
        assert!(!take_print_stats_request());
    }
}
