//! CB-prefixed instruction table (rotates, shifts, bit operations).

use zx_core::Bus;

use crate::alu;
use crate::flags::{CF, HF, PF, SF, XF, YF, ZF};

use super::Z80;

impl Z80 {
    /// Execute a CB-prefixed instruction. Terminal table.
    pub(super) fn bit<B: Bus>(&mut self, bus: &mut B, op: u8) -> bool {
        let r = op & 7;

        if r == 6 {
            // (HL) form
            let addr = self.regs.hl();
            let value = self.read_mem(bus, addr);
            self.internal(bus, 1);
            // For BIT n,(HL) the undocumented bits 5/3 come from WZ high.
            let flag_source = (self.regs.wz >> 8) as u8;
            if let Some(result) = self.bit_op(op, value, flag_source) {
                self.write_mem(bus, addr, result);
            }
            return false;
        }

        let value = self.get_reg8(r);
        if let Some(result) = self.bit_op(op, value, value) {
            self.set_reg8(r, result);
        }
        false
    }

    /// Execute one CB operation on `value`. Returns `Some(result)` for
    /// operations that write back, `None` for BIT.
    pub(super) fn bit_op(&mut self, op: u8, value: u8, flag_source: u8) -> Option<u8> {
        match op >> 6 {
            0 => {
                // Rotate/shift group selected by bits 5-3
                let result = match (op >> 3) & 7 {
                    0 => alu::rlc8(value),
                    1 => alu::rrc8(value),
                    2 => alu::rl8(value, self.regs.f & CF != 0),
                    3 => alu::rr8(value, self.regs.f & CF != 0),
                    4 => alu::sla8(value),
                    5 => alu::sra8(value),
                    6 => alu::sll8(value),
                    7 => alu::srl8(value),
                    _ => unreachable!(),
                };
                self.set_f(result.flags);
                Some(result.value)
            }
            1 => {
                // BIT n
                let bit = (op >> 3) & 7;
                let is_zero = value & (1 << bit) == 0;

                let mut flags = (self.regs.f & CF) | HF;
                if is_zero {
                    flags |= ZF | PF;
                }
                if bit == 7 && !is_zero {
                    flags |= SF;
                }
                flags |= flag_source & (XF | YF);
                self.set_f(flags);
                None
            }
            2 => {
                // RES n
                let bit = (op >> 3) & 7;
                Some(value & !(1 << bit))
            }
            3 => {
                // SET n
                let bit = (op >> 3) & 7;
                Some(value | (1 << bit))
            }
            _ => unreachable!(),
        }
    }
}
