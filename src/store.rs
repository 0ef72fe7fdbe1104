//! Shared heartbeat store for watch-stream ingestion
//!
//! Both watch subscriptions publish into one `HeartbeatStore`; HTTP-facing
//! consumers read snapshot copies. The store is the only synchronization
//! point between subscription tasks, so its lock is held strictly for the
//! duration of a push or a copy, never across I/O.

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

/// Which external stream produced a heartbeat record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HeartbeatSource {
    Pod,
    Lease,
}

impl HeartbeatSource {
    pub const fn as_str(&self) -> &'static str {
        match self {
            HeartbeatSource::Pod => "pod",
            HeartbeatSource::Lease => "lease",
        }
    }
}

impl std::fmt::Display for HeartbeatSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One observed liveness signal, normalized from a raw watch event
///
/// Records are append-only: once stored they are never mutated or removed.
/// Arrival order is preserved per source stream; consumers that need
/// cross-source ordering must sort by `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeartbeatRecord {
    pub source: HeartbeatSource,
    pub subject_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub observed_status: String,
    pub timestamp: SystemTime,
}

/// Thread-safe append-only collection of heartbeat records
#[derive(Clone, Default)]
pub struct HeartbeatStore {
    inner: Arc<Mutex<Vec<HeartbeatRecord>>>,
}

impl HeartbeatStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Append a record; blocks only for the duration of the push
    pub fn append(&self, record: HeartbeatRecord) {
        self.lock().push(record);
    }

    /// Return a consistent copy of every record appended so far
    pub fn snapshot(&self) -> Vec<HeartbeatRecord> {
        self.lock().clone()
    }

    /// Number of records stored
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check whether the store holds no records
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<HeartbeatRecord>> {
        // A poisoned lock only means a writer panicked mid-push; the
        // collection itself is still usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pod_record(name: &str) -> HeartbeatRecord {
        HeartbeatRecord {
            source: HeartbeatSource::Pod,
            subject_name: name.to_string(),
            namespace: Some("default".to_string()),
            observed_status: "Running".to_string(),
            timestamp: SystemTime::now(),
        }
    }

    #[test]
    fn test_append_then_snapshot() {
        let store = HeartbeatStore::new();
        assert!(store.is_empty());

        store.append(pod_record("nginx"));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].subject_name, "nginx");
        assert_eq!(snapshot[0].source, HeartbeatSource::Pod);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let store = HeartbeatStore::new();
        store.append(pod_record("nginx"));

        let snapshot = store.snapshot();
        store.append(pod_record("redis"));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_concurrent_appends_are_not_lost() {
        let store = HeartbeatStore::new();
        let writers = 8;
        let per_writer = 100;

        let handles: Vec<_> = (0..writers)
            .map(|w| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..per_writer {
                        store.append(pod_record(&format!("pod-{}-{}", w, i)));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("writer thread panicked");
        }

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), writers * per_writer);

        // Every writer's records must all be present
        for w in 0..writers {
            let count = snapshot
                .iter()
                .filter(|r| r.subject_name.starts_with(&format!("pod-{}-", w)))
                .count();
            assert_eq!(count, per_writer);
        }
    }

    #[test]
    fn test_per_writer_order_preserved() {
        let store = HeartbeatStore::new();
        for i in 0..10 {
            store.append(pod_record(&format!("pod-{}", i)));
        }

        let names: Vec<_> = store
            .snapshot()
            .into_iter()
            .map(|r| r.subject_name)
            .collect();
        let expected: Vec<_> = (0..10).map(|i| format!("pod-{}", i)).collect();
        assert_eq!(names, expected);
    }
}
