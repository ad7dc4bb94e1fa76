use std::sync::atomic::{AtomicU8, Ordering};

const OPEN: u8 = 0;
const IN_FLIGHT: u8 = 1;
const SEALED: u8 = 2;

/// Lets exactly one submission through per opened test.
///
/// `Open -> InFlight` is claimed by the first trigger; a successful finish seals
/// the latch, a failed one releases it back to `Open` so a retry can claim it.
#[derive(Debug, Default)]
pub struct CompletionLatch {
    state: AtomicU8,
}

impl CompletionLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` only for the caller that moved the latch out of `Open`.
    pub fn try_begin(&self) -> bool {
        self.state.compare_exchange(OPEN, IN_FLIGHT, Ordering::AcqRel, Ordering::Acquire).is_ok()
    }

    pub fn seal(&self) {
        self.state.store(SEALED, Ordering::Release);
    }

    pub fn release(&self) {
        let _ = self.state.compare_exchange(IN_FLIGHT, OPEN, Ordering::AcqRel, Ordering::Acquire);
    }

    /// Re-arms the latch for a newly opened test.
    pub fn reset(&self) {
        self.state.store(OPEN, Ordering::Release);
    }

    pub fn is_in_flight(&self) -> bool {
        self.state.load(Ordering::Acquire) == IN_FLIGHT
    }

    pub fn is_sealed(&self) -> bool {
        self.state.load(Ordering::Acquire) == SEALED
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    use super::*;

    #[test]
    fn only_first_trigger_wins() {
        let latch = CompletionLatch::new();
        assert!(latch.try_begin());
        assert!(!latch.try_begin());
        assert!(latch.is_in_flight());

        latch.seal();
        assert!(latch.is_sealed());
        assert!(!latch.try_begin());
    }

    #[test]
    fn release_allows_retry_but_not_after_seal() {
        let latch = CompletionLatch::new();
        assert!(latch.try_begin());
        latch.release();
        assert!(!latch.is_in_flight());
        assert!(latch.try_begin());

        latch.seal();
        latch.release();
        assert!(latch.is_sealed());
    }

    #[test]
    fn reset_reopens_sealed_latch() {
        let latch = CompletionLatch::new();
        assert!(latch.try_begin());
        latch.seal();
        latch.reset();
        assert!(latch.try_begin());
    }

    #[test]
    fn concurrent_triggers_admit_one() {
        let latch = Arc::new(CompletionLatch::new());
        let winners = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let latch = latch.clone();
                let winners = winners.clone();
                std::thread::spawn(move || {
                    if latch.try_begin() {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
    }
}
