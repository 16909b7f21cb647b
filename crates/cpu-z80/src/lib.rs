//! Cycle-accurate Z80 CPU core.
//!
//! Each call to [`Z80::step`] executes exactly one whole instruction,
//! advancing the tact clock through the host bus in documented T-state
//! increments. The per-tact hook on the bus fires once per T-state, which is
//! how contention, video beam position, and sound sampling stay in phase.

mod alu;
mod clock;
mod cpu;
mod flags;
mod registers;

pub use clock::TactClock;
pub use cpu::{Prefix, Z80};
pub use flags::{CF, DEC_FLAGS, HF, INC_FLAGS, NF, PF, SF, SZ53P, XF, YF, ZF};
pub use registers::Registers;
