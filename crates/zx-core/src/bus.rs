//! Memory and I/O bus contract.

/// Memory and I/O access contract between the CPU and its host machine.
///
/// The host performs address decoding, banking, and peripheral side effects.
/// Time is reported back through [`Bus::tact`], which the CPU invokes exactly
/// once for every T-state its clock advances; contention-modelling hosts do
/// their phase accounting there. The core itself never inserts wait states.
pub trait Bus {
    /// Read a byte from memory.
    fn read(&mut self, addr: u16) -> u8;

    /// Write a byte to memory.
    fn write(&mut self, addr: u16, value: u8);

    /// Read a byte from an I/O port.
    fn port_read(&mut self, port: u16) -> u8;

    /// Write a byte to an I/O port.
    fn port_write(&mut self, port: u16, value: u8);

    /// Per-T-state hook.
    ///
    /// Called after every single tact-counter increment, in strictly
    /// increasing tact order. Implementations perform bounded work and must
    /// not block; a typical host advances its video beam position, samples
    /// the beeper, and counts the frame tact here.
    fn tact(&mut self);
}
