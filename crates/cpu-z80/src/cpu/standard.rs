//! Unprefixed instruction table.

#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

use zx_core::Bus;

use crate::alu;
use crate::flags::{CF, DEC_FLAGS, HF, INC_FLAGS, NF, PF, SF, SZ53P, XF, YF, ZF};

use super::{Prefix, Z80};

impl Z80 {
    /// Execute an unprefixed instruction. Returns true when the opcode was a
    /// prefix introducer and the instruction continues with another fetch.
    pub(super) fn standard<B: Bus>(&mut self, bus: &mut B, op: u8) -> bool {
        match op {
            // NOP
            0x00 => {}

            // LD rr, nn (01=BC, 11=DE, 21=HL, 31=SP)
            0x01 | 0x11 | 0x21 | 0x31 => {
                let value = self.read_imm16(bus);
                self.set_reg16((op >> 4) & 3, value);
            }

            // LD (BC), A
            0x02 => {
                let addr = self.regs.bc();
                self.regs.wz =
                    ((self.regs.a as u16) << 8) | (addr.wrapping_add(1) & 0xFF);
                let a = self.regs.a;
                self.write_mem(bus, addr, a);
            }

            // INC rr (03=BC, 13=DE, 23=HL, 33=SP)
            0x03 | 0x13 | 0x23 | 0x33 => {
                self.internal(bus, 2);
                let rp = (op >> 4) & 3;
                let value = self.get_reg16(rp).wrapping_add(1);
                self.set_reg16(rp, value);
            }

            // INC r (04=B, 0C=C, 14=D, 1C=E, 24=H, 2C=L, 3C=A)
            0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x3C => {
                let r = (op >> 3) & 7;
                let value = self.get_reg8(r);
                self.set_reg8(r, value.wrapping_add(1));
                self.set_f((self.regs.f & CF) | INC_FLAGS[value as usize]);
            }

            // DEC r (05=B, 0D=C, 15=D, 1D=E, 25=H, 2D=L, 3D=A)
            0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x3D => {
                let r = (op >> 3) & 7;
                let value = self.get_reg8(r);
                self.set_reg8(r, value.wrapping_sub(1));
                self.set_f((self.regs.f & CF) | DEC_FLAGS[value as usize]);
            }

            // LD r, n (06=B, 0E=C, 16=D, 1E=E, 26=H, 2E=L, 3E=A)
            0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x3E => {
                let value = self.read_imm8(bus);
                self.set_reg8((op >> 3) & 7, value);
            }

            // RLCA
            0x07 => {
                let carry = self.regs.a >> 7;
                self.regs.a = (self.regs.a << 1) | carry;
                self.set_f(
                    (self.regs.f & (SF | ZF | PF))
                        | (self.regs.a & (YF | XF))
                        | if carry != 0 { CF } else { 0 },
                );
            }

            // EX AF, AF'
            0x08 => self.regs.exchange_af(),

            // ADD HL, rr (09=BC, 19=DE, 29=HL, 39=SP)
            0x09 | 0x19 | 0x29 | 0x39 => {
                self.internal(bus, 7);
                let hl = self.regs.hl();
                let rr = self.get_reg16((op >> 4) & 3);
                self.regs.wz = hl.wrapping_add(1);
                let (result, flags) = alu::add16(hl, rr);
                self.regs.set_hl(result);
                self.set_f((self.regs.f & (SF | ZF | PF)) | flags);
            }

            // LD A, (BC)
            0x0A => {
                let addr = self.regs.bc();
                self.regs.a = self.read_mem(bus, addr);
                self.regs.wz = addr.wrapping_add(1);
            }

            // DEC rr (0B=BC, 1B=DE, 2B=HL, 3B=SP)
            0x0B | 0x1B | 0x2B | 0x3B => {
                self.internal(bus, 2);
                let rp = (op >> 4) & 3;
                let value = self.get_reg16(rp).wrapping_sub(1);
                self.set_reg16(rp, value);
            }

            // RRCA
            0x0F => {
                let carry = self.regs.a & 1;
                self.regs.a = (self.regs.a >> 1) | (carry << 7);
                self.set_f(
                    (self.regs.f & (SF | ZF | PF))
                        | (self.regs.a & (YF | XF))
                        | if carry != 0 { CF } else { 0 },
                );
            }

            // DJNZ e
            0x10 => {
                self.internal(bus, 1);
                let e = self.read_imm8(bus) as i8;
                self.regs.b = self.regs.b.wrapping_sub(1);
                if self.regs.b != 0 {
                    self.internal(bus, 5);
                    self.regs.pc = self.regs.pc.wrapping_add(e as i16 as u16);
                    self.regs.wz = self.regs.pc;
                }
            }

            // LD (DE), A
            0x12 => {
                let addr = self.regs.de();
                self.regs.wz =
                    ((self.regs.a as u16) << 8) | (addr.wrapping_add(1) & 0xFF);
                let a = self.regs.a;
                self.write_mem(bus, addr, a);
            }

            // RLA
            0x17 => {
                let old_carry = u8::from(self.regs.f & CF != 0);
                let new_carry = self.regs.a >> 7;
                self.regs.a = (self.regs.a << 1) | old_carry;
                self.set_f(
                    (self.regs.f & (SF | ZF | PF))
                        | (self.regs.a & (YF | XF))
                        | if new_carry != 0 { CF } else { 0 },
                );
            }

            // JR e
            0x18 => {
                let e = self.read_imm8(bus) as i8;
                self.internal(bus, 5);
                self.regs.pc = self.regs.pc.wrapping_add(e as i16 as u16);
                self.regs.wz = self.regs.pc;
            }

            // LD A, (DE)
            0x1A => {
                let addr = self.regs.de();
                self.regs.a = self.read_mem(bus, addr);
                self.regs.wz = addr.wrapping_add(1);
            }

            // RRA
            0x1F => {
                let old_carry = if self.regs.f & CF != 0 { 0x80 } else { 0 };
                let new_carry = self.regs.a & 1;
                self.regs.a = (self.regs.a >> 1) | old_carry;
                self.set_f(
                    (self.regs.f & (SF | ZF | PF))
                        | (self.regs.a & (YF | XF))
                        | if new_carry != 0 { CF } else { 0 },
                );
            }

            // JR cc, e (20=NZ, 28=Z, 30=NC, 38=C)
            0x20 | 0x28 | 0x30 | 0x38 => {
                let e = self.read_imm8(bus) as i8;
                let taken = match (op >> 3) & 3 {
                    0 => self.regs.f & ZF == 0, // NZ
                    1 => self.regs.f & ZF != 0, // Z
                    2 => self.regs.f & CF == 0, // NC
                    3 => self.regs.f & CF != 0, // C
                    _ => unreachable!(),
                };
                if taken {
                    self.internal(bus, 5);
                    self.regs.pc = self.regs.pc.wrapping_add(e as i16 as u16);
                    self.regs.wz = self.regs.pc;
                }
            }

            // LD (nn), HL
            0x22 => {
                let addr = self.read_imm16(bus);
                self.regs.wz = addr.wrapping_add(1);
                let l = self.regs.l;
                let h = self.regs.h;
                self.write_mem(bus, addr, l);
                self.write_mem(bus, addr.wrapping_add(1), h);
            }

            // DAA
            0x27 => self.daa(),

            // LD HL, (nn)
            0x2A => {
                let addr = self.read_imm16(bus);
                self.regs.wz = addr.wrapping_add(1);
                self.regs.l = self.read_mem(bus, addr);
                self.regs.h = self.read_mem(bus, addr.wrapping_add(1));
            }

            // CPL
            0x2F => {
                self.regs.a = !self.regs.a;
                self.set_f(
                    (self.regs.f & (SF | ZF | PF | CF))
                        | HF
                        | NF
                        | (self.regs.a & (YF | XF)),
                );
            }

            // LD (nn), A
            0x32 => {
                let addr = self.read_imm16(bus);
                self.regs.wz =
                    ((self.regs.a as u16) << 8) | (addr.wrapping_add(1) & 0xFF);
                let a = self.regs.a;
                self.write_mem(bus, addr, a);
            }

            // INC (HL)
            0x34 => {
                let addr = self.regs.hl();
                let value = self.read_mem(bus, addr);
                self.internal(bus, 1);
                self.write_mem(bus, addr, value.wrapping_add(1));
                self.set_f((self.regs.f & CF) | INC_FLAGS[value as usize]);
            }

            // DEC (HL)
            0x35 => {
                let addr = self.regs.hl();
                let value = self.read_mem(bus, addr);
                self.internal(bus, 1);
                self.write_mem(bus, addr, value.wrapping_sub(1));
                self.set_f((self.regs.f & CF) | DEC_FLAGS[value as usize]);
            }

            // LD (HL), n
            0x36 => {
                let value = self.read_imm8(bus);
                let addr = self.regs.hl();
                self.write_mem(bus, addr, value);
            }

            // SCF
            0x37 => {
                let mut r53 = self.regs.a & (YF | XF);
                if self.prev_f53_updated() {
                    r53 |= self.regs.f & (YF | XF);
                }
                self.set_f((self.regs.f & (SF | ZF | PF)) | CF | r53);
            }

            // LD A, (nn)
            0x3A => {
                let addr = self.read_imm16(bus);
                self.regs.wz = addr.wrapping_add(1);
                self.regs.a = self.read_mem(bus, addr);
            }

            // CCF
            0x3F => {
                let old_carry = self.regs.f & CF;
                let mut r53 = self.regs.a & (YF | XF);
                if self.prev_f53_updated() {
                    r53 |= self.regs.f & (YF | XF);
                }
                self.set_f(
                    (self.regs.f & (SF | ZF | PF))
                        | r53
                        | if old_carry != 0 { HF } else { CF },
                );
            }

            // HALT
            0x76 => self.regs.halted = true,

            // LD r, r' (40-7F except 76)
            0x40..=0x7F => {
                let src = op & 7;
                let dst = (op >> 3) & 7;
                if src == 6 {
                    // LD r, (HL)
                    let addr = self.regs.hl();
                    let value = self.read_mem(bus, addr);
                    self.set_reg8(dst, value);
                } else if dst == 6 {
                    // LD (HL), r
                    let addr = self.regs.hl();
                    let value = self.get_reg8(src);
                    self.write_mem(bus, addr, value);
                } else {
                    let value = self.get_reg8(src);
                    self.set_reg8(dst, value);
                }
            }

            // ALU A, r / (HL) (80-BF)
            0x80..=0xBF => {
                let r = op & 7;
                let value = if r == 6 {
                    let addr = self.regs.hl();
                    self.read_mem(bus, addr)
                } else {
                    self.get_reg8(r)
                };
                self.alu_a(op, value);
            }

            // RET cc (C0=NZ, C8=Z, D0=NC, D8=C, E0=PO, E8=PE, F0=P, F8=M)
            0xC0 | 0xC8 | 0xD0 | 0xD8 | 0xE0 | 0xE8 | 0xF0 | 0xF8 => {
                self.internal(bus, 1);
                if self.condition((op >> 3) & 7) {
                    let addr = self.pop16(bus);
                    self.regs.wz = addr;
                    self.regs.pc = addr;
                }
            }

            // POP rr (C1=BC, D1=DE, E1=HL, F1=AF)
            0xC1 | 0xD1 | 0xE1 | 0xF1 => {
                let value = self.pop16(bus);
                self.set_reg16_af((op >> 4) & 3, value);
            }

            // JP cc, nn
            0xC2 | 0xCA | 0xD2 | 0xDA | 0xE2 | 0xEA | 0xF2 | 0xFA => {
                let addr = self.read_imm16(bus);
                self.regs.wz = addr;
                if self.condition((op >> 3) & 7) {
                    self.regs.pc = addr;
                }
            }

            // JP nn
            0xC3 => {
                let addr = self.read_imm16(bus);
                self.regs.wz = addr;
                self.regs.pc = addr;
            }

            // CALL cc, nn
            0xC4 | 0xCC | 0xD4 | 0xDC | 0xE4 | 0xEC | 0xF4 | 0xFC => {
                let target = self.read_imm16(bus);
                self.regs.wz = target;
                if self.condition((op >> 3) & 7) {
                    self.internal(bus, 1);
                    let ret_addr = self.regs.pc;
                    self.push16(bus, ret_addr);
                    self.regs.pc = target;
                }
            }

            // PUSH rr (C5=BC, D5=DE, E5=HL, F5=AF)
            0xC5 | 0xD5 | 0xE5 | 0xF5 => {
                self.internal(bus, 1);
                let value = self.get_reg16_af((op >> 4) & 3);
                self.push16(bus, value);
            }

            // ALU A, n (C6=ADD, CE=ADC, D6=SUB, DE=SBC, E6=AND, EE=XOR, F6=OR, FE=CP)
            0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => {
                let value = self.read_imm8(bus);
                self.alu_a(op, value);
            }

            // RST n (C7=00, CF=08, D7=10, DF=18, E7=20, EF=28, F7=30, FF=38)
            0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
                self.internal(bus, 1);
                let target = u16::from(op & 0x38);
                self.regs.wz = target;
                let ret_addr = self.regs.pc;
                self.push16(bus, ret_addr);
                self.regs.pc = target;
            }

            // RET
            0xC9 => {
                let addr = self.pop16(bus);
                self.regs.wz = addr;
                self.regs.pc = addr;
            }

            // CALL nn
            0xCD => {
                let target = self.read_imm16(bus);
                self.regs.wz = target;
                self.internal(bus, 1);
                let ret_addr = self.regs.pc;
                self.push16(bus, ret_addr);
                self.regs.pc = target;
            }

            // OUT (n), A
            0xD3 => {
                let n = self.read_imm8(bus);
                let port = (u16::from(self.regs.a) << 8) | u16::from(n);
                self.regs.wz =
                    ((self.regs.a as u16) << 8) | u16::from(n.wrapping_add(1));
                let a = self.regs.a;
                self.write_port(bus, port, a);
            }

            // EXX
            0xD9 => self.regs.exchange_main_banks(),

            // IN A, (n)
            0xDB => {
                let n = self.read_imm8(bus);
                let port = (u16::from(self.regs.a) << 8) | u16::from(n);
                self.regs.wz = port.wrapping_add(1);
                self.regs.a = self.read_port(bus, port);
            }

            // EX (SP), HL
            0xE3 => {
                let sp = self.regs.sp;
                let lo = self.read_mem(bus, sp);
                let hi = self.read_mem(bus, sp.wrapping_add(1));
                self.internal(bus, 1);
                let h = self.regs.h;
                let l = self.regs.l;
                self.write_mem(bus, sp.wrapping_add(1), h);
                self.write_mem(bus, sp, l);
                self.internal(bus, 2);
                self.regs.l = lo;
                self.regs.h = hi;
                self.regs.wz = self.regs.hl();
            }

            // JP (HL)
            0xE9 => self.regs.pc = self.regs.hl(),

            // EX DE, HL
            0xEB => {
                let de = self.regs.de();
                let hl = self.regs.hl();
                self.regs.set_de(hl);
                self.regs.set_hl(de);
            }

            // DI
            0xF3 => {
                self.regs.iff1 = false;
                self.regs.iff2 = false;
            }

            // LD SP, HL
            0xF9 => {
                self.internal(bus, 2);
                self.regs.sp = self.regs.hl();
            }

            // EI
            0xFB => {
                self.regs.iff1 = true;
                self.regs.iff2 = true;
                self.set_ei_pending();
            }

            // Prefix introducers: latch and fetch again
            0xCB => {
                self.set_prefix(Prefix::Cb);
                return true;
            }
            0xDD => {
                self.set_prefix(Prefix::Dd);
                return true;
            }
            0xED => {
                self.set_prefix(Prefix::Ed);
                return true;
            }
            0xFD => {
                self.set_prefix(Prefix::Fd);
                return true;
            }
        }
        false
    }

    /// Perform the ALU operation selected by bits 5-3 on A and `value`.
    pub(super) fn alu_a(&mut self, op: u8, value: u8) {
        match (op >> 3) & 7 {
            0 => {
                // ADD
                let result = alu::add8(self.regs.a, value, false);
                self.regs.a = result.value;
                self.set_f(result.flags);
            }
            1 => {
                // ADC
                let carry = self.regs.f & CF != 0;
                let result = alu::add8(self.regs.a, value, carry);
                self.regs.a = result.value;
                self.set_f(result.flags);
            }
            2 => {
                // SUB
                let result = alu::sub8(self.regs.a, value, false);
                self.regs.a = result.value;
                self.set_f(result.flags);
            }
            3 => {
                // SBC
                let carry = self.regs.f & CF != 0;
                let result = alu::sub8(self.regs.a, value, carry);
                self.regs.a = result.value;
                self.set_f(result.flags);
            }
            4 => {
                // AND
                self.regs.a &= value;
                self.set_f(SZ53P[self.regs.a as usize] | HF);
            }
            5 => {
                // XOR
                self.regs.a ^= value;
                self.set_f(SZ53P[self.regs.a as usize]);
            }
            6 => {
                // OR
                self.regs.a |= value;
                self.set_f(SZ53P[self.regs.a as usize]);
            }
            7 => {
                // CP: undocumented bits 5/3 come from the operand, not the result
                let result = alu::sub8(self.regs.a, value, false);
                self.set_f((result.flags & !(YF | XF)) | (value & (YF | XF)));
            }
            _ => unreachable!(),
        }
    }

    /// Decimal adjust A after BCD arithmetic.
    fn daa(&mut self) {
        let a = self.regs.a;
        let nf = self.regs.f & NF != 0;
        let cf = self.regs.f & CF != 0;
        let hf = self.regs.f & HF != 0;

        let mut correction: u8 = 0;
        let mut new_cf = cf;

        if hf || (a & 0x0F) > 9 {
            correction |= 0x06;
        }
        if cf || a > 0x99 {
            correction |= 0x60;
            new_cf = true;
        }

        let result = if nf {
            a.wrapping_sub(correction)
        } else {
            a.wrapping_add(correction)
        };

        let new_hf = if nf {
            hf && (a & 0x0F) < 6
        } else {
            (a & 0x0F) > 9
        };

        self.regs.a = result;
        self.set_f(
            SZ53P[result as usize]
                | if nf { NF } else { 0 }
                | if new_cf { CF } else { 0 }
                | if new_hf { HF } else { 0 },
        );
    }
}
