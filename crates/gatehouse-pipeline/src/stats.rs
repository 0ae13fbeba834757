//! Request statistics aggregation.
//!
//! Counters are kept per distinct request path and recorded exactly once
//! per request through a completion guard. The guard fires on normal
//! completion, on unwind and on task cancellation alike, so abandoned
//! requests are counted rather than leaked.

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// How often a summary line is emitted, in completed requests.
const SUMMARY_EVERY: u64 = 100;

#[derive(Debug, Default)]
struct GroupCounters {
    total: AtomicU64,
    success: AtomicU64,
    client_error: AtomicU64,
    server_error: AtomicU64,
    abandoned: AtomicU64,
    duration_micros: AtomicU64,
    max_duration_micros: AtomicU64,
}

/// A point-in-time copy of one group's counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSnapshot {
    /// Completed plus abandoned requests in this group.
    pub total: u64,
    /// Responses with a 2xx or 3xx status.
    pub success: u64,
    /// Responses with a 4xx status.
    pub client_error: u64,
    /// Responses with a 5xx status.
    pub server_error: u64,
    /// Requests that never produced a response.
    pub abandoned: u64,
    /// Accumulated handling time in microseconds.
    pub total_duration_micros: u64,
    /// Mean handling time in microseconds.
    pub avg_duration_micros: u64,
    /// Worst handling time in microseconds.
    pub max_duration_micros: u64,
}

/// Aggregated request counters for the whole gateway.
#[derive(Debug, Default)]
pub struct StatisticsAggregator {
    groups: RwLock<HashMap<String, Arc<GroupCounters>>>,
    completed: AtomicU64,
}

impl StatisticsAggregator {
    /// Creates an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking one request. The returned guard records the
    /// outcome when dropped; until `finish` is called it counts as
    /// abandoned.
    #[must_use]
    pub fn track(self: &Arc<Self>, group: impl Into<String>) -> CompletionGuard {
        CompletionGuard {
            aggregator: Arc::clone(self),
            group: group.into(),
            started_at: Instant::now(),
            status: None,
        }
    }

    /// Returns a snapshot of every group, keyed by group name.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, GroupSnapshot> {
        self.groups
            .read()
            .iter()
            .map(|(name, counters)| {
                let total = counters.total.load(Ordering::Relaxed);
                let duration = counters.duration_micros.load(Ordering::Relaxed);
                (
                    name.clone(),
                    GroupSnapshot {
                        total,
                        success: counters.success.load(Ordering::Relaxed),
                        client_error: counters.client_error.load(Ordering::Relaxed),
                        server_error: counters.server_error.load(Ordering::Relaxed),
                        abandoned: counters.abandoned.load(Ordering::Relaxed),
                        total_duration_micros: duration,
                        avg_duration_micros: if total == 0 { 0 } else { duration / total },
                        max_duration_micros: counters.max_duration_micros.load(Ordering::Relaxed),
                    },
                )
            })
            .collect()
    }

    /// Total requests recorded so far, including abandoned ones.
    #[must_use]
    pub fn total_recorded(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    fn group(&self, name: &str) -> Arc<GroupCounters> {
        if let Some(counters) = self.groups.read().get(name) {
            return Arc::clone(counters);
        }
        Arc::clone(
            self.groups
                .write()
                .entry(name.to_string())
                .or_default(),
        )
    }

    fn record(&self, group_name: &str, status: Option<u16>, duration_micros: u64) {
        let group = self.group(group_name);
        group.total.fetch_add(1, Ordering::Relaxed);
        group.duration_micros.fetch_add(duration_micros, Ordering::Relaxed);
        group
            .max_duration_micros
            .fetch_max(duration_micros, Ordering::Relaxed);

        match status {
            Some(code) if code < 400 => group.success.fetch_add(1, Ordering::Relaxed),
            Some(code) if code < 500 => group.client_error.fetch_add(1, Ordering::Relaxed),
            Some(_) => group.server_error.fetch_add(1, Ordering::Relaxed),
            None => group.abandoned.fetch_add(1, Ordering::Relaxed),
        };

        let completed = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        if completed % SUMMARY_EVERY == 0 {
            self.log_summary(completed);
        }
    }

    fn log_summary(&self, completed: u64) {
        for (name, snap) in self.snapshot() {
            info!(
                group = %name,
                total = snap.total,
                success = snap.success,
                client_error = snap.client_error,
                server_error = snap.server_error,
                abandoned = snap.abandoned,
                avg_micros = snap.avg_duration_micros,
                max_micros = snap.max_duration_micros,
                "request statistics"
            );
        }
        info!(completed, "statistics summary emitted");
    }
}

/// Records exactly one outcome for one request, on drop.
pub struct CompletionGuard {
    aggregator: Arc<StatisticsAggregator>,
    group: String,
    started_at: Instant,
    status: Option<u16>,
}

impl CompletionGuard {
    /// Marks the request as finished with the given status. Idempotent:
    /// only the first call takes effect.
    pub fn finish(&mut self, status: u16) {
        if self.status.is_none() {
            self.status = Some(status);
        }
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        let micros = u64::try_from(self.started_at.elapsed().as_micros()).unwrap_or(u64::MAX);
        self.aggregator.record(&self.group, self.status, micros);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcomes_are_bucketed_by_status_class() {
        let agg = Arc::new(StatisticsAggregator::new());

        agg.track("/provider").finish(200);
        agg.track("/provider").finish(302);
        agg.track("/provider").finish(404);
        agg.track("/provider").finish(503);

        let snap = &agg.snapshot()["/provider"];
        assert_eq!(snap.total, 4);
        assert_eq!(snap.success, 2);
        assert_eq!(snap.client_error, 1);
        assert_eq!(snap.server_error, 1);
        assert_eq!(snap.abandoned, 0);
    }

    #[test]
    fn dropped_guard_counts_as_abandoned() {
        let agg = Arc::new(StatisticsAggregator::new());
        drop(agg.track("/provider"));

        let snap = &agg.snapshot()["/provider"];
        assert_eq!(snap.total, 1);
        assert_eq!(snap.abandoned, 1);
    }

    #[test]
    fn finish_is_idempotent() {
        let agg = Arc::new(StatisticsAggregator::new());
        let mut guard = agg.track("/provider");
        guard.finish(200);
        guard.finish(500);
        drop(guard);

        let snap = &agg.snapshot()["/provider"];
        assert_eq!(snap.success, 1);
        assert_eq!(snap.server_error, 0);
    }

    #[test]
    fn snapshot_reads_are_idempotent() {
        let agg = Arc::new(StatisticsAggregator::new());
        agg.track("/provider/order/list").finish(200);
        agg.track("/provider/order/list").finish(404);

        let first = agg.snapshot();
        let second = agg.snapshot();
        assert_eq!(first, second);

        let entry = &second["/provider/order/list"];
        assert_eq!(entry.total, 2);
        assert!(entry.total_duration_micros >= entry.max_duration_micros);
    }

    #[test]
    fn groups_are_tracked_independently() {
        let agg = Arc::new(StatisticsAggregator::new());
        agg.track("/provider").finish(200);
        agg.track("/consumer").finish(500);

        let snapshot = agg.snapshot();
        assert_eq!(snapshot["/provider"].success, 1);
        assert_eq!(snapshot["/consumer"].server_error, 1);
        assert_eq!(agg.total_recorded(), 2);
    }
}
