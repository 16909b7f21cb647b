//! Z80 CPU core with instruction-level stepping.

#![allow(clippy::cast_possible_truncation)] // Intentional truncation for low byte extraction.
#![allow(clippy::cast_possible_wrap)] // Intentional i8 casts for displacements.
#![allow(clippy::cast_sign_loss)] // Displacement sign extension back to u16.

use zx_core::Bus;

use crate::clock::TactClock;
use crate::flags::{CF, PF, SF, ZF};
use crate::registers::Registers;

/// INT signal line (maskable interrupt request).
const SIG_INT: u8 = 0x01;
/// NMI signal line (latched until accepted).
const SIG_NMI: u8 = 0x02;
/// RESET signal line (latched until serviced).
const SIG_RESET: u8 = 0x04;

/// The active opcode prefix.
///
/// The decoder is a small state machine over this enumeration: `None` is the
/// base table, `Ed`/`Cb` are terminal sub-tables, `Dd`/`Fd` select the index
/// register tables, and `DdCb`/`FdCb` are the displacement-first bit tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Prefix {
    #[default]
    None,
    Ed,
    Cb,
    Dd,
    Fd,
    DdCb,
    FdCb,
}

/// The Z80 CPU.
///
/// The CPU does not own the bus; every `step()` borrows it. One call to
/// `step()` executes exactly one whole instruction (all prefix bytes
/// included), or one interrupt acknowledgment, or one halted NOP. The tact
/// clock advances through the bus hook in documented per-access increments.
pub struct Z80 {
    /// Main register set.
    pub regs: Registers,
    /// T-state clock; sole mutator of the tact counter.
    clock: TactClock,
    /// Active opcode prefix.
    prefix: Prefix,
    /// Signal lines (INT/NMI/RESET).
    signals: u8,
    /// EI executed: interrupt acceptance is deferred past the next instruction.
    ei_pending: bool,
    /// The current instruction explicitly updated F bits 5/3.
    f53_updated: bool,
    /// The previous instruction explicitly updated F bits 5/3.
    /// Drives the undocumented SCF/CCF bit-5/3 rule.
    prev_f53_updated: bool,
}

impl Z80 {
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers { sp: 0xFFFF, a: 0xFF, f: 0xFF, ..Registers::default() },
            clock: TactClock::new(),
            prefix: Prefix::None,
            signals: 0,
            ei_pending: false,
            f53_updated: false,
            prev_f53_updated: false,
        }
    }

    /// Total T-states elapsed since creation or hard reset.
    #[must_use]
    pub const fn tacts(&self) -> u64 {
        self.clock.tacts()
    }

    /// Current program counter.
    #[must_use]
    pub const fn pc(&self) -> u16 {
        self.regs.pc
    }

    /// True while the HALT latch is set.
    #[must_use]
    pub const fn is_halted(&self) -> bool {
        self.regs.halted
    }

    /// Drive the INT line. Level-sensitive: the line is sampled at each
    /// instruction boundary.
    pub fn set_int(&mut self, active: bool) {
        if active {
            self.signals |= SIG_INT;
        } else {
            self.signals &= !SIG_INT;
        }
    }

    /// Latch an NMI request. Accepted at the next instruction boundary.
    pub fn raise_nmi(&mut self) {
        self.signals |= SIG_NMI;
    }

    /// Latch a RESET request. Serviced at the next instruction boundary.
    pub fn raise_reset(&mut self) {
        self.signals |= SIG_RESET;
    }

    /// Soft reset: PC to 0, interrupts disabled, IM 0, HALT released.
    /// Register contents otherwise survive.
    pub fn reset(&mut self) {
        self.regs.pc = 0;
        self.regs.iff1 = false;
        self.regs.iff2 = false;
        self.regs.im = 0;
        self.regs.halted = false;
        self.prefix = Prefix::None;
        self.signals = 0;
        self.ei_pending = false;
        self.f53_updated = false;
        self.prev_f53_updated = false;
    }

    /// Hard reset: the power-on register state (AF and SP at 0xFFFF,
    /// everything else zeroed) and a fresh tact counter.
    pub fn hard_reset(&mut self) {
        self.regs = Registers { sp: 0xFFFF, a: 0xFF, f: 0xFF, ..Registers::default() };
        self.clock.reset();
        self.prefix = Prefix::None;
        self.signals = 0;
        self.ei_pending = false;
        self.f53_updated = false;
        self.prev_f53_updated = false;
    }

    /// Execute one whole instruction, interrupt acknowledgment, or halted NOP.
    pub fn step<B: Bus>(&mut self, bus: &mut B) {
        if self.signals & SIG_RESET != 0 {
            self.signals &= !SIG_RESET;
            self.reset();
            return;
        }
        if self.signals & SIG_NMI != 0 {
            self.signals &= !SIG_NMI;
            self.accept_nmi(bus);
            return;
        }
        if self.signals & SIG_INT != 0 && self.regs.iff1 && !self.ei_pending {
            self.accept_int(bus);
            return;
        }
        self.ei_pending = false;

        // Roll the F53 latch once per whole instruction.
        self.prev_f53_updated = self.f53_updated;
        self.f53_updated = false;

        if self.regs.halted {
            // A halted CPU keeps fetching NOPs: PC stays put, refresh continues.
            self.clock.advance(bus, 4);
            self.regs.inc_r(1);
            return;
        }

        self.prefix = Prefix::None;
        loop {
            let opcode = self.read_code(bus);
            let fetch_again = match self.prefix {
                Prefix::None => self.standard(bus, opcode),
                Prefix::Ed => self.extended(bus, opcode),
                Prefix::Cb => self.bit(bus, opcode),
                Prefix::Dd | Prefix::Fd => self.indexed(bus, opcode),
                // Displacement-first tables are entered from `indexed`,
                // never through an M1 fetch.
                Prefix::DdCb | Prefix::FdCb => unreachable!(),
            };
            if !fetch_again {
                break;
            }
        }
        self.prefix = Prefix::None;
    }

    // =========================================================================
    // Bus access with documented T-state costs
    // =========================================================================

    /// M1 opcode fetch: 4 tacts, refresh increment, PC advance.
    fn read_code<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let opcode = bus.read(self.regs.pc);
        self.clock.advance(bus, 4);
        self.regs.inc_r(1);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        opcode
    }

    /// Immediate byte read at PC: 3 tacts, PC advance.
    fn read_imm8<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let value = bus.read(self.regs.pc);
        self.clock.advance(bus, 3);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        value
    }

    /// Immediate word read at PC: 6 tacts, low byte first.
    fn read_imm16<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.read_imm8(bus);
        let hi = self.read_imm8(bus);
        u16::from(lo) | (u16::from(hi) << 8)
    }

    /// Memory read: 3 tacts.
    fn read_mem<B: Bus>(&mut self, bus: &mut B, addr: u16) -> u8 {
        let value = bus.read(addr);
        self.clock.advance(bus, 3);
        value
    }

    /// Memory write: 3 tacts.
    fn write_mem<B: Bus>(&mut self, bus: &mut B, addr: u16, value: u8) {
        bus.write(addr, value);
        self.clock.advance(bus, 3);
    }

    /// Port read: 4 tacts, access after the address has settled.
    fn read_port<B: Bus>(&mut self, bus: &mut B, port: u16) -> u8 {
        self.clock.advance(bus, 1);
        let value = bus.port_read(port);
        self.clock.advance(bus, 3);
        value
    }

    /// Port write: 4 tacts.
    fn write_port<B: Bus>(&mut self, bus: &mut B, port: u16, value: u8) {
        self.clock.advance(bus, 1);
        bus.port_write(port, value);
        self.clock.advance(bus, 3);
    }

    /// Internal cycles: clock advance only, no bus activity.
    fn internal<B: Bus>(&mut self, bus: &mut B, count: u32) {
        self.clock.advance(bus, count);
    }

    /// Push a word (high byte first): 6 tacts.
    fn push16<B: Bus>(&mut self, bus: &mut B, value: u16) {
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write_mem(bus, self.regs.sp, (value >> 8) as u8);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write_mem(bus, self.regs.sp, value as u8);
    }

    /// Pop a word (low byte first): 6 tacts.
    fn pop16<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.read_mem(bus, self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(1);
        let hi = self.read_mem(bus, self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(1);
        u16::from(lo) | (u16::from(hi) << 8)
    }

    // =========================================================================
    // Register helpers
    // =========================================================================

    /// Write the flag register, marking bits 5/3 as explicitly updated.
    pub(crate) fn set_f(&mut self, value: u8) {
        self.regs.f = value;
        self.f53_updated = true;
    }

    /// True when the previous instruction explicitly updated F bits 5/3.
    pub(crate) const fn prev_f53_updated(&self) -> bool {
        self.prev_f53_updated
    }

    /// The effective HL-class register for the active prefix.
    pub(crate) fn index_reg(&self) -> u16 {
        match self.prefix {
            Prefix::Dd | Prefix::DdCb => self.regs.ix,
            Prefix::Fd | Prefix::FdCb => self.regs.iy,
            _ => self.regs.hl(),
        }
    }

    pub(crate) fn set_index_reg(&mut self, value: u16) {
        match self.prefix {
            Prefix::Dd | Prefix::DdCb => self.regs.ix = value,
            Prefix::Fd | Prefix::FdCb => self.regs.iy = value,
            _ => self.regs.set_hl(value),
        }
    }

    pub(crate) fn set_prefix(&mut self, prefix: Prefix) {
        self.prefix = prefix;
    }

    pub(crate) fn prefix(&self) -> Prefix {
        self.prefix
    }

    /// Get register by 3-bit encoding (bits 5-3 or 2-0).
    pub(crate) fn get_reg8(&self, r: u8) -> u8 {
        match r & 7 {
            0 => self.regs.b,
            1 => self.regs.c,
            2 => self.regs.d,
            3 => self.regs.e,
            4 => self.regs.h,
            5 => self.regs.l,
            6 => unreachable!("(HL) is handled by the caller"),
            7 => self.regs.a,
            _ => unreachable!(),
        }
    }

    /// Set register by 3-bit encoding.
    pub(crate) fn set_reg8(&mut self, r: u8, value: u8) {
        match r & 7 {
            0 => self.regs.b = value,
            1 => self.regs.c = value,
            2 => self.regs.d = value,
            3 => self.regs.e = value,
            4 => self.regs.h = value,
            5 => self.regs.l = value,
            6 => unreachable!("(HL) is handled by the caller"),
            7 => self.regs.a = value,
            _ => unreachable!(),
        }
    }

    /// Get register by 3-bit encoding with the undocumented IXH/IXL/IYH/IYL
    /// substitution for H and L.
    pub(crate) fn get_reg8_indexed(&self, r: u8) -> u8 {
        match (r & 7, self.prefix) {
            (4, Prefix::Dd | Prefix::DdCb) => self.regs.xh(),
            (5, Prefix::Dd | Prefix::DdCb) => self.regs.xl(),
            (4, Prefix::Fd | Prefix::FdCb) => self.regs.yh(),
            (5, Prefix::Fd | Prefix::FdCb) => self.regs.yl(),
            _ => self.get_reg8(r),
        }
    }

    /// Set register by 3-bit encoding with IXH/IXL/IYH/IYL substitution.
    pub(crate) fn set_reg8_indexed(&mut self, r: u8, value: u8) {
        match (r & 7, self.prefix) {
            (4, Prefix::Dd | Prefix::DdCb) => self.regs.set_xh(value),
            (5, Prefix::Dd | Prefix::DdCb) => self.regs.set_xl(value),
            (4, Prefix::Fd | Prefix::FdCb) => self.regs.set_yh(value),
            (5, Prefix::Fd | Prefix::FdCb) => self.regs.set_yl(value),
            _ => self.set_reg8(r, value),
        }
    }

    /// Get register pair by 2-bit encoding. Slot 2 follows the active prefix
    /// (HL, IX, or IY).
    pub(crate) fn get_reg16(&self, rp: u8) -> u16 {
        match rp & 3 {
            0 => self.regs.bc(),
            1 => self.regs.de(),
            2 => self.index_reg(),
            3 => self.regs.sp,
            _ => unreachable!(),
        }
    }

    /// Set register pair by 2-bit encoding.
    pub(crate) fn set_reg16(&mut self, rp: u8, value: u16) {
        match rp & 3 {
            0 => self.regs.set_bc(value),
            1 => self.regs.set_de(value),
            2 => self.set_index_reg(value),
            3 => self.regs.sp = value,
            _ => unreachable!(),
        }
    }

    /// Get register pair for PUSH/POP (AF instead of SP).
    pub(crate) fn get_reg16_af(&self, rp: u8) -> u16 {
        match rp & 3 {
            0 => self.regs.bc(),
            1 => self.regs.de(),
            2 => self.index_reg(),
            3 => self.regs.af(),
            _ => unreachable!(),
        }
    }

    /// Set register pair for PUSH/POP.
    pub(crate) fn set_reg16_af(&mut self, rp: u8, value: u16) {
        match rp & 3 {
            0 => self.regs.set_bc(value),
            1 => self.regs.set_de(value),
            2 => self.set_index_reg(value),
            3 => self.regs.set_af(value),
            _ => unreachable!(),
        }
    }

    /// Evaluate condition code (bits 5-3 of the opcode).
    pub(crate) fn condition(&self, cc: u8) -> bool {
        match cc & 7 {
            0 => self.regs.f & ZF == 0, // NZ
            1 => self.regs.f & ZF != 0, // Z
            2 => self.regs.f & CF == 0, // NC
            3 => self.regs.f & CF != 0, // C
            4 => self.regs.f & PF == 0, // PO
            5 => self.regs.f & PF != 0, // PE
            6 => self.regs.f & SF == 0, // P
            7 => self.regs.f & SF != 0, // M
            _ => unreachable!(),
        }
    }

    // =========================================================================
    // Interrupt acceptance
    // =========================================================================

    /// Acknowledge a maskable interrupt.
    ///
    /// IM 0/1: 13 tacts ending at 0x0038 (the data bus holds 0xFF on the
    /// Spectrum, making IM 0 behave as RST 38). IM 2: 19 tacts, vectoring
    /// through `I:0xFF`.
    fn accept_int<B: Bus>(&mut self, bus: &mut B) {
        self.regs.halted = false;
        self.regs.iff1 = false;
        self.regs.iff2 = false;
        self.regs.inc_r(1);

        self.internal(bus, 7);
        let pc = self.regs.pc;
        self.push16(bus, pc);

        if self.regs.im == 2 {
            let vector = (u16::from(self.regs.i) << 8) | 0x00FF;
            let lo = self.read_mem(bus, vector);
            let hi = self.read_mem(bus, vector.wrapping_add(1));
            let target = u16::from(lo) | (u16::from(hi) << 8);
            self.regs.pc = target;
            self.regs.wz = target;
        } else {
            self.regs.pc = 0x0038;
            self.regs.wz = 0x0038;
        }
    }

    /// Acknowledge a non-maskable interrupt: 11 tacts to 0x0066.
    /// IFF1 is saved into IFF2 so RETN can restore it.
    fn accept_nmi<B: Bus>(&mut self, bus: &mut B) {
        self.regs.halted = false;
        self.regs.iff2 = self.regs.iff1;
        self.regs.iff1 = false;
        self.regs.inc_r(1);

        self.internal(bus, 5);
        let pc = self.regs.pc;
        self.push16(bus, pc);
        self.regs.pc = 0x0066;
        self.regs.wz = 0x0066;
    }

    /// Arm the EI one-instruction interrupt delay.
    pub(crate) fn set_ei_pending(&mut self) {
        self.ei_pending = true;
    }
}

impl Default for Z80 {
    fn default() -> Self {
        Self::new()
    }
}

// Instruction tables, grouped the way the silicon groups them.
mod bit;
mod extended;
mod indexed;
mod indexed_bit;
mod standard;
