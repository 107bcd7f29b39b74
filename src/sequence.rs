// ABOUTME: Per-session sequence number allocation for outbound SMPP requests
// ABOUTME: Lock-protected counter that hands out distinct, increasing 32-bit values

use std::sync::{Mutex, PoisonError};

/// Issues sequence numbers for outbound request PDUs.
///
/// Each session owns its own allocator, so sessions never share a counter.
/// The lock is held only for the increment, never across I/O, which makes
/// `next` safe to call from several tasks or threads at once.
///
/// The counter starts at 0, so the first value issued is 1. It wraps on
/// overflow like any `u32`; SMPP sessions rarely live long enough for that to
/// matter, but correlation across the wrap is the caller's concern.
#[derive(Debug, Default)]
pub struct SequenceAllocator {
    current: Mutex<u32>,
}

impl SequenceAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume allocation after `last`, so the next value issued is `last + 1`
    pub fn starting_after(last: u32) -> Self {
        Self {
            current: Mutex::new(last),
        }
    }

    /// Allocate the next sequence number
    pub fn next(&self) -> u32 {
        // The guarded section cannot panic, so a poisoned lock still holds a
        // valid counter.
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        *current = current.wrapping_add(1);
        *current
    }

    /// The most recently issued value (0 before the first allocation)
    pub fn current(&self) -> u32 {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn starts_at_one() {
        let allocator = SequenceAllocator::new();
        assert_eq!(allocator.current(), 0);
        assert_eq!(allocator.next(), 1);
        assert_eq!(allocator.next(), 2);
        assert_eq!(allocator.current(), 2);
    }

    #[test]
    fn wraps_on_overflow() {
        let allocator = SequenceAllocator::starting_after(u32::MAX - 1);
        assert_eq!(allocator.next(), u32::MAX);
        assert_eq!(allocator.next(), 0);
        assert_eq!(allocator.next(), 1);
    }

    #[test]
    fn concurrent_callers_get_distinct_increasing_values() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 1000;

        let allocator = Arc::new(SequenceAllocator::new());

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let allocator = Arc::clone(&allocator);
                thread::spawn(move || {
                    (0..PER_THREAD)
                        .map(|_| allocator.next())
                        .collect::<Vec<u32>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            let issued = handle.join().unwrap();
            // Each caller observes its own values in issuance order
            assert!(issued.windows(2).all(|w| w[0] < w[1]));
            for value in issued {
                assert!(seen.insert(value), "sequence {value} issued twice");
            }
        }

        let total = (THREADS * PER_THREAD) as u32;
        assert_eq!(seen.len() as u32, total);
        assert!(seen.iter().all(|v| (1..=total).contains(v)));
        assert_eq!(allocator.current(), total);
    }

    #[test]
    fn allocators_are_independent() {
        let first = SequenceAllocator::new();
        let second = SequenceAllocator::new();

        first.next();
        first.next();

        assert_eq!(second.next(), 1);
        assert_eq!(first.next(), 3);
    }
}
