//! The tact clock.

use zx_core::Bus;

/// Monotonic T-state counter.
///
/// The clock is the sole mutator of the tact count. A bulk advance of `n` is
/// exactly `n` single steps: for every step the counter increments once and
/// the bus's per-tact hook runs once, before the next step begins.
#[derive(Debug, Default)]
pub struct TactClock {
    tacts: u64,
}

impl TactClock {
    #[must_use]
    pub const fn new() -> Self {
        Self { tacts: 0 }
    }

    /// Total T-states elapsed.
    #[must_use]
    pub const fn tacts(&self) -> u64 {
        self.tacts
    }

    /// Advance by `count` T-states, firing the hook once per step.
    pub fn advance<B: Bus>(&mut self, bus: &mut B, count: u32) {
        for _ in 0..count {
            self.tacts += 1;
            bus.tact();
        }
    }

    /// Rewind to zero. Hard reset only.
    pub fn reset(&mut self) {
        self.tacts = 0;
    }
}
