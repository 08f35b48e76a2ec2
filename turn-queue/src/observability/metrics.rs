use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters for queue operations, shared by every engine clone
#[derive(Debug, Default)]
pub struct LiveMetrics {
    joins: AtomicU64,
    rejected_joins: AtomicU64,
    calls: AtomicU64,
    served: AtomicU64,
    left: AtomicU64,
    credited_leaves: AtomicU64,
    conflicts: AtomicU64,
    announcements_failed: AtomicU64,
}

impl LiveMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_joins(&self) {
        self.joins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rejected_joins(&self) {
        self.rejected_joins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_calls(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_served(&self, count: u64) {
        self.served.fetch_add(count, Ordering::Relaxed);
    }

    /// A voluntary departure; `credited` when the client was being served
    pub fn increment_left(&self, credited: bool) {
        self.left.fetch_add(1, Ordering::Relaxed);
        if credited {
            self.credited_leaves.fetch_add(1, Ordering::Relaxed);
            self.served.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn increment_conflicts(&self) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_announcements_failed(&self) {
        self.announcements_failed.fetch_add(1, Ordering::Relaxed);
    }

    // Getters
    pub fn joins(&self) -> u64 {
        self.joins.load(Ordering::Relaxed)
    }

    pub fn rejected_joins(&self) -> u64 {
        self.rejected_joins.load(Ordering::Relaxed)
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn served(&self) -> u64 {
        self.served.load(Ordering::Relaxed)
    }

    pub fn left(&self) -> u64 {
        self.left.load(Ordering::Relaxed)
    }

    pub fn credited_leaves(&self) -> u64 {
        self.credited_leaves.load(Ordering::Relaxed)
    }

    pub fn conflicts(&self) -> u64 {
        self.conflicts.load(Ordering::Relaxed)
    }

    pub fn announcements_failed(&self) -> u64 {
        self.announcements_failed.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            joins: self.joins(),
            rejected_joins: self.rejected_joins(),
            calls: self.calls(),
            served: self.served(),
            left: self.left(),
            credited_leaves: self.credited_leaves(),
            conflicts: self.conflicts(),
            announcements_failed: self.announcements_failed(),
        }
    }
}

/// Serializable copy of [`LiveMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MetricsSnapshot {
    pub joins: u64,
    pub rejected_joins: u64,
    pub calls: u64,
    pub served: u64,
    pub left: u64,
    pub credited_leaves: u64,
    pub conflicts: u64,
    pub announcements_failed: u64,
}

impl MetricsSnapshot {
    /// Share of admissions refused by a guard, in percent
    pub fn rejection_rate(&self) -> f64 {
        let attempts = self.joins + self.rejected_joins;
        if attempts == 0 {
            0.0
        } else {
            (self.rejected_joins as f64 / attempts as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credited_leave_counts_as_served() {
        let metrics = LiveMetrics::new();
        metrics.add_served(2);
        metrics.increment_left(true);
        metrics.increment_left(false);

        let snap = metrics.snapshot();
        assert_eq!(snap.served, 3);
        assert_eq!(snap.left, 2);
        assert_eq!(snap.credited_leaves, 1);
    }

    #[test]
    fn test_rejection_rate() {
        let metrics = LiveMetrics::new();
        assert_eq!(metrics.snapshot().rejection_rate(), 0.0);

        for _ in 0..3 {
            metrics.increment_joins();
        }
        metrics.increment_rejected_joins();
        assert_eq!(metrics.snapshot().rejection_rate(), 25.0);
    }
}
