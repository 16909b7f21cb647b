//! DD/FD-prefixed instruction table (IX/IY substitution).

#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

use zx_core::Bus;

use crate::alu;
use crate::flags::{CF, DEC_FLAGS, INC_FLAGS, PF, SF, ZF};

use super::{Prefix, Z80};

impl Z80 {
    /// Execute a DD/FD-prefixed instruction. Returns true when the opcode
    /// re-latched a prefix and the instruction continues with another fetch.
    pub(super) fn indexed<B: Bus>(&mut self, bus: &mut B, op: u8) -> bool {
        match op {
            // ADD IX/IY, rr (09=BC, 19=DE, 29=IX/IY, 39=SP)
            0x09 | 0x19 | 0x29 | 0x39 => {
                self.internal(bus, 7);
                let idx = self.index_reg();
                self.regs.wz = idx.wrapping_add(1);
                let rr = self.get_reg16((op >> 4) & 3);
                let (result, flags) = alu::add16(idx, rr);
                self.set_index_reg(result);
                self.set_f((self.regs.f & (SF | ZF | PF)) | flags);
            }

            // LD IX/IY, nn
            0x21 => {
                let value = self.read_imm16(bus);
                self.set_index_reg(value);
            }

            // LD (nn), IX/IY
            0x22 => {
                let addr = self.read_imm16(bus);
                self.regs.wz = addr.wrapping_add(1);
                let idx = self.index_reg();
                self.write_mem(bus, addr, idx as u8);
                self.write_mem(bus, addr.wrapping_add(1), (idx >> 8) as u8);
            }

            // INC IX/IY
            0x23 => {
                self.internal(bus, 2);
                let value = self.index_reg().wrapping_add(1);
                self.set_index_reg(value);
            }

            // INC IXH/IYH (undocumented)
            0x24 => {
                let value = self.get_reg8_indexed(4);
                self.set_reg8_indexed(4, value.wrapping_add(1));
                self.set_f((self.regs.f & CF) | INC_FLAGS[value as usize]);
            }

            // DEC IXH/IYH (undocumented)
            0x25 => {
                let value = self.get_reg8_indexed(4);
                self.set_reg8_indexed(4, value.wrapping_sub(1));
                self.set_f((self.regs.f & CF) | DEC_FLAGS[value as usize]);
            }

            // LD IXH/IYH, n (undocumented)
            0x26 => {
                let value = self.read_imm8(bus);
                self.set_reg8_indexed(4, value);
            }

            // LD IX/IY, (nn)
            0x2A => {
                let addr = self.read_imm16(bus);
                self.regs.wz = addr.wrapping_add(1);
                let lo = self.read_mem(bus, addr);
                let hi = self.read_mem(bus, addr.wrapping_add(1));
                self.set_index_reg(u16::from(lo) | (u16::from(hi) << 8));
            }

            // DEC IX/IY
            0x2B => {
                self.internal(bus, 2);
                let value = self.index_reg().wrapping_sub(1);
                self.set_index_reg(value);
            }

            // INC IXL/IYL (undocumented)
            0x2C => {
                let value = self.get_reg8_indexed(5);
                self.set_reg8_indexed(5, value.wrapping_add(1));
                self.set_f((self.regs.f & CF) | INC_FLAGS[value as usize]);
            }

            // DEC IXL/IYL (undocumented)
            0x2D => {
                let value = self.get_reg8_indexed(5);
                self.set_reg8_indexed(5, value.wrapping_sub(1));
                self.set_f((self.regs.f & CF) | DEC_FLAGS[value as usize]);
            }

            // LD IXL/IYL, n (undocumented)
            0x2E => {
                let value = self.read_imm8(bus);
                self.set_reg8_indexed(5, value);
            }

            // INC (IX+d)/(IY+d)
            0x34 => {
                let addr = self.indexed_addr(bus);
                self.internal(bus, 5);
                let value = self.read_mem(bus, addr);
                self.internal(bus, 1);
                self.write_mem(bus, addr, value.wrapping_add(1));
                self.set_f((self.regs.f & CF) | INC_FLAGS[value as usize]);
            }

            // DEC (IX+d)/(IY+d)
            0x35 => {
                let addr = self.indexed_addr(bus);
                self.internal(bus, 5);
                let value = self.read_mem(bus, addr);
                self.internal(bus, 1);
                self.write_mem(bus, addr, value.wrapping_sub(1));
                self.set_f((self.regs.f & CF) | DEC_FLAGS[value as usize]);
            }

            // LD (IX+d)/(IY+d), n
            0x36 => {
                let addr = self.indexed_addr(bus);
                let value = self.read_imm8(bus);
                self.internal(bus, 2);
                self.write_mem(bus, addr, value);
            }

            // LD r, (IX+d)/(IY+d)
            0x46 | 0x4E | 0x56 | 0x5E | 0x66 | 0x6E | 0x7E => {
                let addr = self.indexed_addr(bus);
                self.internal(bus, 5);
                let value = self.read_mem(bus, addr);
                // Destination is the real register, never IXH/IXL.
                self.set_reg8((op >> 3) & 7, value);
            }

            // LD (IX+d)/(IY+d), r
            0x70 | 0x71 | 0x72 | 0x73 | 0x74 | 0x75 | 0x77 => {
                let addr = self.indexed_addr(bus);
                self.internal(bus, 5);
                let value = self.get_reg8(op & 7);
                self.write_mem(bus, addr, value);
            }

            // ALU A, (IX+d)/(IY+d)
            0x86 | 0x8E | 0x96 | 0x9E | 0xA6 | 0xAE | 0xB6 | 0xBE => {
                let addr = self.indexed_addr(bus);
                self.internal(bus, 5);
                let value = self.read_mem(bus, addr);
                self.alu_a(op, value);
            }

            // HALT is unaffected by the prefix
            0x76 => self.regs.halted = true,

            // LD r, r' with IXH/IXL/IYH/IYL substitution (undocumented)
            0x40..=0x7F => {
                let value = self.get_reg8_indexed(op & 7);
                self.set_reg8_indexed((op >> 3) & 7, value);
            }

            // INC/DEC IXH/IXL handled above; remaining ALU forms use the
            // index register halves (undocumented)
            0x80..=0xBF => {
                let value = self.get_reg8_indexed(op & 7);
                self.alu_a(op, value);
            }

            // DDCB/FDCB: displacement-first bit table
            0xCB => {
                let next = if self.prefix() == Prefix::Dd {
                    Prefix::DdCb
                } else {
                    Prefix::FdCb
                };
                self.set_prefix(next);
                self.indexed_bit(bus);
            }

            // POP IX/IY
            0xE1 => {
                let value = self.pop16(bus);
                self.set_index_reg(value);
            }

            // EX (SP), IX/IY
            0xE3 => {
                let sp = self.regs.sp;
                let lo = self.read_mem(bus, sp);
                let hi = self.read_mem(bus, sp.wrapping_add(1));
                self.internal(bus, 1);
                let idx = self.index_reg();
                self.write_mem(bus, sp.wrapping_add(1), (idx >> 8) as u8);
                self.write_mem(bus, sp, idx as u8);
                self.internal(bus, 2);
                let new_val = u16::from(lo) | (u16::from(hi) << 8);
                self.set_index_reg(new_val);
                self.regs.wz = new_val;
            }

            // PUSH IX/IY
            0xE5 => {
                self.internal(bus, 1);
                let idx = self.index_reg();
                self.push16(bus, idx);
            }

            // JP (IX)/(IY)
            0xE9 => self.regs.pc = self.index_reg(),

            // LD SP, IX/IY
            0xF9 => {
                self.internal(bus, 2);
                self.regs.sp = self.index_reg();
            }

            // Prefix chains re-latch (DD DD, DD FD, DD ED, ...)
            0xDD => {
                self.set_prefix(Prefix::Dd);
                return true;
            }
            0xFD => {
                self.set_prefix(Prefix::Fd);
                return true;
            }
            0xED => {
                self.set_prefix(Prefix::Ed);
                return true;
            }

            // Everything else ignores the prefix and executes unprefixed
            _ => {
                self.set_prefix(Prefix::None);
                return self.standard(bus, op);
            }
        }
        false
    }

    /// Read the displacement byte and form the effective IX/IY address,
    /// updating WZ. Costs 3 tacts; callers add their documented internal
    /// cycles separately.
    fn indexed_addr<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let d = self.read_imm8(bus) as i8;
        let addr = self.index_reg().wrapping_add(d as i16 as u16);
        self.regs.wz = addr;
        addr
    }
}
