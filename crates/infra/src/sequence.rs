//! Scoped sequence allocation for human-facing reference numbers.
//!
//! Call and work order numbers carry a per-year sequence (`MC-2024-0042`,
//! `WO-2024-0008`). Allocation is serialized per scope so that concurrent
//! creators never receive the same number; the scope string encodes the
//! entity kind and year, e.g. `"workorder-2024"`.

use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SequenceError {
    #[error("sequence allocation failed: {0}")]
    Allocation(String),
}

/// Allocator of strictly increasing sequence numbers per scope.
///
/// `next()` returns `max(allocated) + 1` for the scope, starting at 1.
/// Implementations must serialize allocation within a scope.
pub trait SequenceAllocator: Send + Sync {
    fn next(&self, scope: &str) -> Result<u32, SequenceError>;
}

/// In-memory allocator backed by a mutex-guarded counter map.
#[derive(Debug, Default)]
pub struct InMemorySequenceAllocator {
    counters: Mutex<HashMap<String, u32>>,
}

impl InMemorySequenceAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-set a scope's high-water mark, e.g. when resuming from existing
    /// records.
    pub fn seed(&self, scope: &str, last_allocated: u32) -> Result<(), SequenceError> {
        let mut counters = self
            .counters
            .lock()
            .map_err(|_| SequenceError::Allocation("lock poisoned".to_string()))?;
        let entry = counters.entry(scope.to_string()).or_insert(0);
        *entry = (*entry).max(last_allocated);
        Ok(())
    }
}

impl SequenceAllocator for InMemorySequenceAllocator {
    fn next(&self, scope: &str) -> Result<u32, SequenceError> {
        let mut counters = self
            .counters
            .lock()
            .map_err(|_| SequenceError::Allocation("lock poisoned".to_string()))?;
        let entry = counters.entry(scope.to_string()).or_insert(0);
        *entry += 1;
        Ok(*entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn scopes_are_independent() {
        let alloc = InMemorySequenceAllocator::new();
        assert_eq!(alloc.next("workorder-2024").unwrap(), 1);
        assert_eq!(alloc.next("workorder-2024").unwrap(), 2);
        assert_eq!(alloc.next("workorder-2025").unwrap(), 1);
        assert_eq!(alloc.next("call-2024").unwrap(), 1);
    }

    #[test]
    fn seeding_resumes_after_existing_records() {
        let alloc = InMemorySequenceAllocator::new();
        alloc.seed("workorder-2024", 7).unwrap();
        assert_eq!(alloc.next("workorder-2024").unwrap(), 8);
    }

    #[test]
    fn concurrent_allocation_yields_distinct_numbers() {
        let alloc = Arc::new(InMemorySequenceAllocator::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let alloc = Arc::clone(&alloc);
            handles.push(std::thread::spawn(move || {
                (0..50)
                    .map(|_| alloc.next("workorder-2024").unwrap())
                    .collect::<Vec<_>>()
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            for n in handle.join().unwrap() {
                assert!(seen.insert(n), "duplicate sequence number {n}");
            }
        }
        assert_eq!(seen.len(), 400);
        assert_eq!(alloc.next("workorder-2024").unwrap(), 401);
    }
}
