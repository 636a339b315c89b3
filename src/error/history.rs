//! Bounded, time-ordered store of normalized failures.
//!
//! Insertion always appends; when the bound is exceeded the oldest record is
//! evicted. Correlation analysis depends on the store preserving call order.

use std::collections::{BTreeMap, VecDeque};

use chrono::{Duration, Utc};
use serde::Serialize;

use super::record::{ErrorKind, ErrorRecord, Severity};

/// Window used for the "recent errors" count.
const RECENT_WINDOW_SECS: i64 = 60;

/// Aggregate counts over the history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorStatistics {
    /// Records currently held.
    pub total: usize,
    /// Count per failure kind.
    pub by_kind: BTreeMap<ErrorKind, usize>,
    /// Count per severity.
    pub by_severity: BTreeMap<Severity, usize>,
    /// Records within the trailing 60-second window.
    pub recent_count: usize,
}

/// FIFO-bounded log of [`ErrorRecord`]s.
#[derive(Debug)]
pub struct ErrorHistory {
    records: VecDeque<ErrorRecord>,
    capacity: usize,
}

impl ErrorHistory {
    /// Creates a history bounded at `capacity` records. A zero capacity is
    /// bumped to one so insertion never panics.
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Appends a record, evicting the oldest when full.
    pub fn push(&mut self, record: ErrorRecord) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no records are held.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Configured bound.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Ordered snapshot, oldest first.
    pub fn snapshot(&self) -> Vec<ErrorRecord> {
        self.records.iter().cloned().collect()
    }

    /// Drops all records.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Records of `kind` whose timestamp falls inside the trailing `window`.
    pub fn recent_of_kind(&self, kind: ErrorKind, window: Duration) -> Vec<&ErrorRecord> {
        let cutoff = Utc::now() - window;
        self.records
            .iter()
            .filter(|r| r.kind == kind && r.timestamp >= cutoff)
            .collect()
    }

    /// Kinds of the most recent `n` records, oldest of those first.
    pub fn recent_kinds(&self, n: usize) -> Vec<ErrorKind> {
        let skip = self.records.len().saturating_sub(n);
        self.records.iter().skip(skip).map(|r| r.kind).collect()
    }

    /// Records within the trailing 60-second window.
    pub fn recent_count(&self) -> usize {
        let cutoff = Utc::now() - Duration::seconds(RECENT_WINDOW_SECS);
        self.records.iter().filter(|r| r.timestamp >= cutoff).count()
    }

    /// Aggregate counts by kind and severity.
    pub fn statistics(&self) -> ErrorStatistics {
        let mut by_kind: BTreeMap<ErrorKind, usize> = BTreeMap::new();
        let mut by_severity: BTreeMap<Severity, usize> = BTreeMap::new();
        for record in &self.records {
            *by_kind.entry(record.kind).or_insert(0) += 1;
            *by_severity.entry(record.severity).or_insert(0) += 1;
        }
        ErrorStatistics {
            total: self.records.len(),
            by_kind,
            by_severity,
            recent_count: self.recent_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: ErrorKind, message: &str) -> ErrorRecord {
        ErrorRecord::new(kind, message)
    }

    #[test]
    fn test_push_appends_in_order() {
        let mut history = ErrorHistory::new(10);
        history.push(record(ErrorKind::Network, "one"));
        history.push(record(ErrorKind::Docker, "two"));

        let snapshot = history.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].message, "one");
        assert_eq!(snapshot[1].message, "two");
    }

    #[test]
    fn test_fifo_eviction_at_capacity() {
        let mut history = ErrorHistory::new(3);
        for i in 0..5 {
            history.push(record(ErrorKind::Network, &format!("err-{i}")));
        }

        assert_eq!(history.len(), 3);
        let snapshot = history.snapshot();
        assert_eq!(snapshot[0].message, "err-2");
        assert_eq!(snapshot[2].message, "err-4");
    }

    #[test]
    fn test_zero_capacity_is_bumped() {
        let mut history = ErrorHistory::new(0);
        history.push(record(ErrorKind::Build, "boom"));
        assert_eq!(history.len(), 1);
        assert_eq!(history.capacity(), 1);
    }

    #[test]
    fn test_recent_of_kind_filters_by_window() {
        let mut history = ErrorHistory::new(10);
        let stale = record(ErrorKind::Network, "old")
            .with_timestamp(Utc::now() - Duration::seconds(120));
        history.push(stale);
        history.push(record(ErrorKind::Network, "fresh"));
        history.push(record(ErrorKind::Docker, "fresh but other kind"));

        let recent = history.recent_of_kind(ErrorKind::Network, Duration::seconds(60));
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].message, "fresh");
    }

    #[test]
    fn test_recent_kinds_takes_tail() {
        let mut history = ErrorHistory::new(10);
        history.push(record(ErrorKind::Network, "a"));
        history.push(record(ErrorKind::Docker, "b"));
        history.push(record(ErrorKind::Registry, "c"));

        assert_eq!(
            history.recent_kinds(2),
            vec![ErrorKind::Docker, ErrorKind::Registry]
        );
        assert_eq!(history.recent_kinds(10).len(), 3);
    }

    #[test]
    fn test_statistics_counts() {
        let mut history = ErrorHistory::new(10);
        history.push(record(ErrorKind::Network, "a"));
        history.push(record(ErrorKind::Network, "b"));
        history.push(record(ErrorKind::Security, "c"));

        let stats = history.statistics();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_kind.get(&ErrorKind::Network), Some(&2));
        assert_eq!(stats.by_kind.get(&ErrorKind::Security), Some(&1));
        assert_eq!(stats.by_severity.get(&Severity::Medium), Some(&2));
        assert_eq!(stats.by_severity.get(&Severity::High), Some(&1));
        assert_eq!(stats.recent_count, 3);
    }

    #[test]
    fn test_clear_empties_store() {
        let mut history = ErrorHistory::new(5);
        history.push(record(ErrorKind::Build, "x"));
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.statistics().total, 0);
    }
}
