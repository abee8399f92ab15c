//! Process-wide delivery counters.
//!
//! Counters are keyed by `(operation, project, result)` and only ever grow.
//! They are the only mutable state shared between dispatch units: a counter
//! is registered once under a write lock and incremented atomically
//! afterwards, so concurrent units only contend when a key is first seen.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

/// Counted by the dispatcher for every submitted event.
pub const OP_SUBMITTED: &str = "dispatch.submitted";
/// Counted by the collector for every consumed outcome, by status category.
pub const OP_OUTCOME: &str = "collect.outcome";
/// Counted by the collector for delivered outcomes, split into `ok` / `error`.
pub const OP_RESPONSE: &str = "collect.response";
/// Counted by the receiver for every inbound webhook request.
pub const OP_RECEIVED: &str = "receive.request";

/// Project component of process-wide counters.
pub const ALL_PROJECTS: &str = "*";
/// Result component of plain totals.
pub const RESULT_TOTAL: &str = "total";

/// Composite counter key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CounterKey {
    pub operation: String,
    pub project: String,
    pub result: String,
}

impl CounterKey {
    pub fn new(operation: &str, project: &str, result: &str) -> Self {
        Self {
            operation: operation.to_string(),
            project: project.to_string(),
            result: result.to_string(),
        }
    }
}

/// One counter value in a [`MetricsSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSample {
    pub operation: String,
    pub project: String,
    pub result: String,
    pub value: u64,
}

/// Point-in-time copy of every counter, sorted by key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub counters: Vec<CounterSample>,
}

impl MetricsSnapshot {
    /// Value of one counter, zero if it was never incremented.
    pub fn value(&self, operation: &str, project: &str, result: &str) -> u64 {
        self.counters
            .iter()
            .find(|s| s.operation == operation && s.project == project && s.result == result)
            .map_or(0, |s| s.value)
    }
}

/// Registry of monotonically increasing counters.
#[derive(Debug, Default)]
pub struct Counters {
    entries: RwLock<HashMap<CounterKey, Arc<AtomicU64>>>,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one to the counter for `(operation, project, result)`.
    pub fn increment(&self, operation: &str, project: &str, result: &str) {
        self.counter(CounterKey::new(operation, project, result))
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Current value of a counter, zero if it was never incremented.
    pub fn get(&self, operation: &str, project: &str, result: &str) -> u64 {
        let key = CounterKey::new(operation, project, result);
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    /// Sum of every per-project counter of `operation`, grouped by project.
    ///
    /// Process-wide counters (project [`ALL_PROJECTS`]) are excluded.
    pub fn per_project(&self, operation: &str) -> BTreeMap<String, u64> {
        let mut totals = BTreeMap::new();
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        for (key, counter) in entries.iter() {
            if key.operation == operation && key.project != ALL_PROJECTS {
                *totals.entry(key.project.clone()).or_insert(0) += counter.load(Ordering::Relaxed);
            }
        }
        totals
    }

    /// Copies every counter for exposition.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut counters: Vec<CounterSample> = entries
            .iter()
            .map(|(key, counter)| CounterSample {
                operation: key.operation.clone(),
                project: key.project.clone(),
                result: key.result.clone(),
                value: counter.load(Ordering::Relaxed),
            })
            .collect();
        counters.sort_by(|a, b| {
            (&a.operation, &a.project, &a.result).cmp(&(&b.operation, &b.project, &b.result))
        });
        MetricsSnapshot { counters }
    }

    fn counter(&self, key: CounterKey) -> Arc<AtomicU64> {
        if let Some(existing) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Arc::clone(existing);
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(entries.entry(key).or_default())
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn unseen_counters_read_as_zero() {
        let counters = Counters::new();
        assert_eq!(counters.get(OP_OUTCOME, "abc", "delivered"), 0);
        assert!(counters.snapshot().counters.is_empty());
    }

    #[test]
    fn increments_accumulate_per_key() {
        let counters = Counters::new();
        counters.increment(OP_OUTCOME, "abc", "delivered");
        counters.increment(OP_OUTCOME, "abc", "delivered");
        counters.increment(OP_OUTCOME, "abc", "not_mapped");

        assert_eq!(counters.get(OP_OUTCOME, "abc", "delivered"), 2);
        assert_eq!(counters.get(OP_OUTCOME, "abc", "not_mapped"), 1);
    }

    #[test]
    fn per_project_sums_results_and_skips_process_totals() {
        let counters = Counters::new();
        counters.increment(OP_OUTCOME, ALL_PROJECTS, RESULT_TOTAL);
        counters.increment(OP_OUTCOME, "abc", "delivered");
        counters.increment(OP_OUTCOME, "abc", "transport_failed");
        counters.increment(OP_OUTCOME, "xyz", "not_mapped");
        counters.increment(OP_RESPONSE, "abc", "ok");

        let totals = counters.per_project(OP_OUTCOME);
        assert_eq!(totals.get("abc"), Some(&2));
        assert_eq!(totals.get("xyz"), Some(&1));
        assert!(!totals.contains_key(ALL_PROJECTS));
    }

    #[test]
    fn snapshot_is_sorted_and_queryable() {
        let counters = Counters::new();
        counters.increment(OP_RESPONSE, "abc", "ok");
        counters.increment(OP_OUTCOME, "xyz", "delivered");
        counters.increment(OP_OUTCOME, "abc", "delivered");

        let snapshot = counters.snapshot();
        let keys: Vec<_> = snapshot
            .counters
            .iter()
            .map(|s| (s.operation.as_str(), s.project.as_str()))
            .collect();
        assert_eq!(
            keys,
            [(OP_OUTCOME, "abc"), (OP_OUTCOME, "xyz"), (OP_RESPONSE, "abc")]
        );
        assert_eq!(snapshot.value(OP_RESPONSE, "abc", "ok"), 1);
        assert_eq!(snapshot.value(OP_RESPONSE, "abc", "error"), 0);
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let counters = Arc::new(Counters::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let counters = Arc::clone(&counters);
                thread::spawn(move || {
                    let project = format!("p{}", i % 2);
                    for _ in 0..1000 {
                        counters.increment(OP_OUTCOME, ALL_PROJECTS, RESULT_TOTAL);
                        counters.increment(OP_OUTCOME, &project, "delivered");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counters.get(OP_OUTCOME, ALL_PROJECTS, RESULT_TOTAL), 8000);
        assert_eq!(counters.get(OP_OUTCOME, "p0", "delivered"), 4000);
        assert_eq!(counters.get(OP_OUTCOME, "p1", "delivered"), 4000);
    }
}
