//! Round-robin rotation counter.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Round-robin selector.
/// Stores an internal counter to rotate through a fixed number of slots.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the next slot index in `0..len`.
    ///
    /// Every caller observes a distinct counter value; wrap-around of the
    /// counter itself is harmless because only the residue is used.
    pub fn next_index(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let ticket = self.counter.fetch_add(1, Ordering::Relaxed);
        Some(ticket % len)
    }

    /// Number of selections made so far (modulo `usize`).
    pub fn issued(&self) -> usize {
        self.counter.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_robin() {
        let rr = RoundRobin::new();
        assert_eq!(rr.next_index(2), Some(0));
        assert_eq!(rr.next_index(2), Some(1));
        assert_eq!(rr.next_index(2), Some(0));
        assert_eq!(rr.issued(), 3);
    }

    #[test]
    fn empty_set_has_no_index() {
        let rr = RoundRobin::new();
        assert_eq!(rr.next_index(0), None);
        assert_eq!(rr.issued(), 0);
    }
}
