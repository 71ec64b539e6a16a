//! Telemetry step sequence

use parking_lot::Mutex;

/// Process-wide step counter. `next` hands out each value exactly once.
#[derive(Debug, Default)]
pub struct StepCounter {
    next: Mutex<u64>,
}

impl StepCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a given value (e.g. the number of persisted snapshots)
    pub fn starting_at(step: u64) -> Self {
        Self { next: Mutex::new(step) }
    }

    /// Take the current step and advance
    pub fn next(&self) -> u64 {
        let mut guard = self.next.lock();
        let step = *guard;
        *guard += 1;
        step
    }

    /// Value the next caller will receive
    pub fn peek(&self) -> u64 {
        *self.next.lock()
    }
}
