//! Core contracts for the Spectrum emulator.
//!
//! The CPU never owns memory or peripherals; every access crosses the [`Bus`]
//! trait, and the passage of time is reported through its per-tact hook.

mod bus;
mod flat_bus;

pub use bus::Bus;
pub use flat_bus::FlatBus;
