//! Worker slot offsets
//!
//! Every live run holds a small integer offset that no other live run holds.
//! Offsets are handed out smallest-first so ports stay packed in
//! `[base_port, base_port + concurrency)`.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Allocator for worker slot offsets
#[derive(Debug, Default)]
pub struct OffsetAllocator {
    in_use: Mutex<BTreeSet<usize>>,
}

impl OffsetAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the smallest free offset. The offset is released when the
    /// returned lease is dropped.
    pub fn acquire(self: &Arc<Self>) -> OffsetLease {
        let mut in_use = self.lock();
        let offset = (0..)
            .find(|candidate| !in_use.contains(candidate))
            .unwrap_or_default();
        in_use.insert(offset);

        OffsetLease {
            allocator: Arc::clone(self),
            offset,
        }
    }

    /// Return an offset to the pool
    pub fn release(&self, offset: usize) {
        let removed = self.lock().remove(&offset);
        debug_assert!(removed, "offset {offset} released twice");
    }

    /// Sorted snapshot of offsets currently held
    #[cfg(test)]
    pub fn in_use(&self) -> Vec<usize> {
        self.lock().iter().copied().collect()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeSet<usize>> {
        self.in_use.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A reserved offset, released on drop
#[derive(Debug)]
pub struct OffsetLease {
    allocator: Arc<OffsetAllocator>,
    offset: usize,
}

impl OffsetLease {
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl Drop for OffsetLease {
    fn drop(&mut self) {
        self.allocator.release(self.offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn test_smallest_free_offset() {
        let allocator = Arc::new(OffsetAllocator::new());
        let a = allocator.acquire();
        let b = allocator.acquire();
        let c = allocator.acquire();
        assert_eq!((a.offset(), b.offset(), c.offset()), (0, 1, 2));

        drop(b);
        assert_eq!(allocator.in_use(), vec![0, 2]);

        let d = allocator.acquire();
        assert_eq!(d.offset(), 1);

        let e = allocator.acquire();
        assert_eq!(e.offset(), 3);
    }

    #[test]
    fn test_released_offset_is_reused() {
        let allocator = Arc::new(OffsetAllocator::new());
        let leases: Vec<_> = (0..3).map(|_| allocator.acquire()).collect();
        assert_eq!(leases[2].offset(), 2);

        let mut leases = leases;
        leases.pop();
        let again = allocator.acquire();
        assert_eq!(again.offset(), 2);
    }

    #[test]
    fn test_drop_releases_exactly_once() {
        let allocator = Arc::new(OffsetAllocator::new());
        {
            let _lease = allocator.acquire();
            assert_eq!(allocator.in_use(), vec![0]);
        }
        assert!(allocator.in_use().is_empty());
    }

    #[test]
    fn test_concurrent_leases_are_disjoint() {
        const THREADS: usize = 4;
        let allocator = Arc::new(OffsetAllocator::new());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let allocator = Arc::clone(&allocator);
                let seen = Arc::clone(&seen);
                thread::spawn(move || {
                    for _ in 0..500 {
                        let lease = allocator.acquire();
                        let held = allocator.in_use();
                        let unique: HashSet<_> = held.iter().collect();
                        assert_eq!(unique.len(), held.len());
                        assert!(held.contains(&lease.offset()));
                        seen.lock().unwrap().push(lease.offset());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(allocator.in_use().is_empty());
        assert!(seen.lock().unwrap().iter().all(|offset| *offset < THREADS));
    }
}
