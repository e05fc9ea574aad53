//! Prometheus metrics (lock-free atomics, zero allocation on hot path).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    // --- Sync passes ---
    pub passes_started: AtomicU64,
    pub passes_completed: AtomicU64,
    pub passes_failed: AtomicU64,
    pub passes_superseded: AtomicU64,

    // --- Latency (μs, updated via CAS) ---
    pub pass_duration_us_sum: AtomicU64,
    pub pass_duration_us_max: AtomicU64,

    // --- Reconciliation ---
    pub proposals_resolved: AtomicU64,
    pub bids_resolved: AtomicU64,
    pub sentinel_bids_skipped: AtomicU64,
    pub metadata_gaps: AtomicU64,

    // --- Commands ---
    pub commands_total: AtomicU64,
    pub commands_failed: AtomicU64,
    pub commands_rejected: AtomicU64,
}

impl Metrics {
    const fn new() -> Self {
        Self {
            passes_started: AtomicU64::new(0),
            passes_completed: AtomicU64::new(0),
            passes_failed: AtomicU64::new(0),
            passes_superseded: AtomicU64::new(0),
            pass_duration_us_sum: AtomicU64::new(0),
            pass_duration_us_max: AtomicU64::new(0),
            proposals_resolved: AtomicU64::new(0),
            bids_resolved: AtomicU64::new(0),
            sentinel_bids_skipped: AtomicU64::new(0),
            metadata_gaps: AtomicU64::new(0),
            commands_total: AtomicU64::new(0),
            commands_failed: AtomicU64::new(0),
            commands_rejected: AtomicU64::new(0),
        }
    }

    pub fn record_pass_duration(&self, start: Instant) {
        let us = start.elapsed().as_micros() as u64;
        self.pass_duration_us_sum.fetch_add(us, Ordering::Relaxed);
        // CAS loop for max tracking
        let mut cur = self.pass_duration_us_max.load(Ordering::Relaxed);
        while us > cur {
            match self.pass_duration_us_max.compare_exchange_weak(
                cur,
                us,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => cur = actual,
            }
        }
    }

    /// Render in Prometheus text exposition format.
    pub fn render(&self) -> String {
        let started = self.passes_started.load(Ordering::Relaxed);
        let completed = self.passes_completed.load(Ordering::Relaxed);
        let failed = self.passes_failed.load(Ordering::Relaxed);
        let superseded = self.passes_superseded.load(Ordering::Relaxed);
        let dur_sum = self.pass_duration_us_sum.load(Ordering::Relaxed);
        let dur_max = self.pass_duration_us_max.swap(0, Ordering::Relaxed);
        let proposals = self.proposals_resolved.load(Ordering::Relaxed);
        let bids = self.bids_resolved.load(Ordering::Relaxed);
        let sentinels = self.sentinel_bids_skipped.load(Ordering::Relaxed);
        let gaps = self.metadata_gaps.load(Ordering::Relaxed);
        let commands = self.commands_total.load(Ordering::Relaxed);
        let commands_failed = self.commands_failed.load(Ordering::Relaxed);
        let commands_rejected = self.commands_rejected.load(Ordering::Relaxed);

        // Convert μs to seconds for Prometheus conventions
        let dur_sum_s = dur_sum as f64 / 1_000_000.0;
        let dur_max_s = dur_max as f64 / 1_000_000.0;

        format!(
            "\
# HELP swap_sync_passes_started_total Proposal sync passes started.\n\
# TYPE swap_sync_passes_started_total counter\n\
swap_sync_passes_started_total {started}\n\
# HELP swap_sync_passes_completed_total Proposal sync passes that committed a bid index.\n\
# TYPE swap_sync_passes_completed_total counter\n\
swap_sync_passes_completed_total {completed}\n\
# HELP swap_sync_passes_failed_total Proposal sync passes aborted by a gateway error.\n\
# TYPE swap_sync_passes_failed_total counter\n\
swap_sync_passes_failed_total {failed}\n\
# HELP swap_sync_passes_superseded_total Passes cancelled by a newer trigger.\n\
# TYPE swap_sync_passes_superseded_total counter\n\
swap_sync_passes_superseded_total {superseded}\n\
# HELP swap_sync_pass_duration_seconds_sum Total pass time (seconds).\n\
# TYPE swap_sync_pass_duration_seconds_sum counter\n\
swap_sync_pass_duration_seconds_sum {dur_sum_s:.6}\n\
# HELP swap_sync_pass_duration_seconds_max Max pass time since last scrape (seconds).\n\
# TYPE swap_sync_pass_duration_seconds_max gauge\n\
swap_sync_pass_duration_seconds_max {dur_max_s:.6}\n\
# HELP swap_sync_proposals_resolved_total Proposals enriched with metadata.\n\
# TYPE swap_sync_proposals_resolved_total counter\n\
swap_sync_proposals_resolved_total {proposals}\n\
# HELP swap_sync_bids_resolved_total Bids added to the bid index.\n\
# TYPE swap_sync_bids_resolved_total counter\n\
swap_sync_bids_resolved_total {bids}\n\
# HELP swap_sync_sentinel_bids_skipped_total Empty bid slots filtered out.\n\
# TYPE swap_sync_sentinel_bids_skipped_total counter\n\
swap_sync_sentinel_bids_skipped_total {sentinels}\n\
# HELP swap_sync_metadata_gaps_total Ledger assets with no metadata document.\n\
# TYPE swap_sync_metadata_gaps_total counter\n\
swap_sync_metadata_gaps_total {gaps}\n\
# HELP swap_sync_commands_total Commands sent to the ledger.\n\
# TYPE swap_sync_commands_total counter\n\
swap_sync_commands_total {commands}\n\
# HELP swap_sync_commands_failed_total Commands the ledger rejected.\n\
# TYPE swap_sync_commands_failed_total counter\n\
swap_sync_commands_failed_total {commands_failed}\n\
# HELP swap_sync_commands_rejected_total Commands refused before reaching the ledger.\n\
# TYPE swap_sync_commands_rejected_total counter\n\
swap_sync_commands_rejected_total {commands_rejected}\n"
        )
    }
}
