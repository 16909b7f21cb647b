//! ED-prefixed instruction table.

#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]

use zx_core::Bus;

use crate::alu;
use crate::flags::{CF, HF, NF, PF, SF, SZ53P, XF, YF, ZF};

use super::Z80;

impl Z80 {
    /// Execute an ED-prefixed instruction. The table is terminal, so this
    /// never requests another fetch.
    pub(super) fn extended<B: Bus>(&mut self, bus: &mut B, op: u8) -> bool {
        match op {
            // IN r, (C) (40=B, 48=C, 50=D, 58=E, 60=H, 68=L, 78=A)
            // 70 = IN (C): flags only, result discarded
            0x40 | 0x48 | 0x50 | 0x58 | 0x60 | 0x68 | 0x70 | 0x78 => {
                let port = self.regs.bc();
                self.regs.wz = port.wrapping_add(1);
                let value = self.read_port(bus, port);
                let r = (op >> 3) & 7;
                if r != 6 {
                    self.set_reg8(r, value);
                }
                self.set_f(SZ53P[value as usize] | (self.regs.f & CF));
            }

            // OUT (C), r (41=B, 49=C, 51=D, 59=E, 61=H, 69=L, 79=A)
            // 71 = OUT (C), 0
            0x41 | 0x49 | 0x51 | 0x59 | 0x61 | 0x69 | 0x71 | 0x79 => {
                let port = self.regs.bc();
                self.regs.wz = port.wrapping_add(1);
                let r = (op >> 3) & 7;
                let value = if r == 6 { 0 } else { self.get_reg8(r) };
                self.write_port(bus, port, value);
            }

            // SBC HL, rr (42=BC, 52=DE, 62=HL, 72=SP)
            0x42 | 0x52 | 0x62 | 0x72 => {
                self.internal(bus, 7);
                let hl = self.regs.hl();
                self.regs.wz = hl.wrapping_add(1);
                let rr = self.get_reg16((op >> 4) & 3);
                let (result, flags) = alu::sbc16(hl, rr, self.regs.f & CF != 0);
                self.regs.set_hl(result);
                self.set_f(flags);
            }

            // LD (nn), rr (43=BC, 53=DE, 63=HL, 73=SP)
            0x43 | 0x53 | 0x63 | 0x73 => {
                let addr = self.read_imm16(bus);
                self.regs.wz = addr.wrapping_add(1);
                let value = self.get_reg16((op >> 4) & 3);
                self.write_mem(bus, addr, value as u8);
                self.write_mem(bus, addr.wrapping_add(1), (value >> 8) as u8);
            }

            // NEG (and undocumented mirrors)
            0x44 | 0x4C | 0x54 | 0x5C | 0x64 | 0x6C | 0x74 | 0x7C => {
                let result = alu::sub8(0, self.regs.a, false);
                self.regs.a = result.value;
                self.set_f(result.flags);
            }

            // RETN (45, and mirrors) / RETI (4D, and mirrors): both restore
            // IFF1 from IFF2 and return.
            0x45 | 0x55 | 0x65 | 0x75 | 0x4D | 0x5D | 0x6D | 0x7D => {
                self.regs.iff1 = self.regs.iff2;
                let addr = self.pop16(bus);
                self.regs.wz = addr;
                self.regs.pc = addr;
            }

            // IM 0 (and mirrors)
            0x46 | 0x4E | 0x66 | 0x6E => self.regs.im = 0,

            // IM 1 (and mirror)
            0x56 | 0x76 => self.regs.im = 1,

            // IM 2 (and mirror)
            0x5E | 0x7E => self.regs.im = 2,

            // LD I, A
            0x47 => {
                self.internal(bus, 1);
                self.regs.i = self.regs.a;
            }

            // ADC HL, rr (4A=BC, 5A=DE, 6A=HL, 7A=SP)
            0x4A | 0x5A | 0x6A | 0x7A => {
                self.internal(bus, 7);
                let hl = self.regs.hl();
                self.regs.wz = hl.wrapping_add(1);
                let rr = self.get_reg16((op >> 4) & 3);
                let (result, flags) = alu::adc16(hl, rr, self.regs.f & CF != 0);
                self.regs.set_hl(result);
                self.set_f(flags);
            }

            // LD rr, (nn) (4B=BC, 5B=DE, 6B=HL, 7B=SP)
            0x4B | 0x5B | 0x6B | 0x7B => {
                let addr = self.read_imm16(bus);
                self.regs.wz = addr.wrapping_add(1);
                let lo = self.read_mem(bus, addr);
                let hi = self.read_mem(bus, addr.wrapping_add(1));
                self.set_reg16((op >> 4) & 3, u16::from(lo) | (u16::from(hi) << 8));
            }

            // LD R, A
            0x4F => {
                self.internal(bus, 1);
                self.regs.r = self.regs.a;
            }

            // LD A, I
            0x57 => {
                self.internal(bus, 1);
                self.regs.a = self.regs.i;
                self.ld_a_ir_flags();
            }

            // LD A, R
            0x5F => {
                self.internal(bus, 1);
                self.regs.a = self.regs.r;
                self.ld_a_ir_flags();
            }

            // RRD
            0x67 => {
                let addr = self.regs.hl();
                let mem = self.read_mem(bus, addr);
                self.internal(bus, 4);
                self.regs.wz = addr.wrapping_add(1);
                let new_a = (self.regs.a & 0xF0) | (mem & 0x0F);
                let new_mem = ((self.regs.a & 0x0F) << 4) | (mem >> 4);
                self.regs.a = new_a;
                self.write_mem(bus, addr, new_mem);
                self.set_f(SZ53P[self.regs.a as usize] | (self.regs.f & CF));
            }

            // RLD
            0x6F => {
                let addr = self.regs.hl();
                let mem = self.read_mem(bus, addr);
                self.internal(bus, 4);
                self.regs.wz = addr.wrapping_add(1);
                let new_a = (self.regs.a & 0xF0) | (mem >> 4);
                let new_mem = ((mem & 0x0F) << 4) | (self.regs.a & 0x0F);
                self.regs.a = new_a;
                self.write_mem(bus, addr, new_mem);
                self.set_f(SZ53P[self.regs.a as usize] | (self.regs.f & CF));
            }

            // Block transfer/search/IO
            0xA0 => self.ldi_ldd(bus, false, false),
            0xA8 => self.ldi_ldd(bus, true, false),
            0xB0 => self.ldi_ldd(bus, false, true),
            0xB8 => self.ldi_ldd(bus, true, true),

            0xA1 => self.cpi_cpd(bus, false, false),
            0xA9 => self.cpi_cpd(bus, true, false),
            0xB1 => self.cpi_cpd(bus, false, true),
            0xB9 => self.cpi_cpd(bus, true, true),

            0xA2 => self.ini_ind(bus, false, false),
            0xAA => self.ini_ind(bus, true, false),
            0xB2 => self.ini_ind(bus, false, true),
            0xBA => self.ini_ind(bus, true, true),

            0xA3 => self.outi_outd(bus, false, false),
            0xAB => self.outi_outd(bus, true, false),
            0xB3 => self.outi_outd(bus, false, true),
            0xBB => self.outi_outd(bus, true, true),

            // All other ED opcodes are 8-tact no-ops
            _ => {}
        }
        false
    }

    /// Flags shared by LD A,I and LD A,R: P/V reflects IFF2.
    fn ld_a_ir_flags(&mut self) {
        self.set_f(
            (self.regs.f & CF)
                | (SZ53P[self.regs.a as usize] & !PF)
                | if self.regs.iff2 { PF } else { 0 },
        );
    }

    /// LDI/LDD/LDIR/LDDR.
    fn ldi_ldd<B: Bus>(&mut self, bus: &mut B, decrement: bool, repeat: bool) {
        let value = self.read_mem(bus, self.regs.hl());
        let de = self.regs.de();
        self.write_mem(bus, de, value);
        self.internal(bus, 2);

        if decrement {
            self.regs.set_hl(self.regs.hl().wrapping_sub(1));
            self.regs.set_de(de.wrapping_sub(1));
        } else {
            self.regs.set_hl(self.regs.hl().wrapping_add(1));
            self.regs.set_de(de.wrapping_add(1));
        }
        self.regs.set_bc(self.regs.bc().wrapping_sub(1));

        let n = value.wrapping_add(self.regs.a);
        if repeat && self.regs.bc() != 0 {
            // Repeat variant: bits 5/3 come from PC high after the decrement.
            self.internal(bus, 5);
            self.regs.pc = self.regs.pc.wrapping_sub(2);
            self.regs.wz = self.regs.pc.wrapping_add(1);
            let pch = (self.regs.pc >> 8) as u8;
            self.set_f((self.regs.f & (SF | ZF | CF)) | PF | (pch & (XF | YF)));
        } else {
            self.set_f(
                (self.regs.f & (SF | ZF | CF))
                    | (n & XF)
                    | if n & 0x02 != 0 { YF } else { 0 }
                    | if self.regs.bc() != 0 { PF } else { 0 },
            );
        }
    }

    /// CPI/CPD/CPIR/CPDR.
    fn cpi_cpd<B: Bus>(&mut self, bus: &mut B, decrement: bool, repeat: bool) {
        let value = self.read_mem(bus, self.regs.hl());
        self.internal(bus, 5);

        if decrement {
            self.regs.wz = self.regs.wz.wrapping_sub(1);
            self.regs.set_hl(self.regs.hl().wrapping_sub(1));
        } else {
            self.regs.wz = self.regs.wz.wrapping_add(1);
            self.regs.set_hl(self.regs.hl().wrapping_add(1));
        }
        self.regs.set_bc(self.regs.bc().wrapping_sub(1));

        let result = self.regs.a.wrapping_sub(value);
        let hf = (self.regs.a & 0x0F) < (value & 0x0F);
        let n = result.wrapping_sub(u8::from(hf));
        let base = (self.regs.f & CF)
            | NF
            | if result == 0 { ZF } else { 0 }
            | if result & 0x80 != 0 { SF } else { 0 }
            | if hf { HF } else { 0 }
            | if self.regs.bc() != 0 { PF } else { 0 };

        if repeat && self.regs.bc() != 0 && result != 0 {
            // Repeat variant: bits 5/3 come from PC high.
            self.internal(bus, 5);
            self.regs.pc = self.regs.pc.wrapping_sub(2);
            self.regs.wz = self.regs.pc.wrapping_add(1);
            let pch = (self.regs.pc >> 8) as u8;
            self.set_f(base | (pch & (XF | YF)));
        } else {
            self.set_f(base | (n & XF) | if n & 0x02 != 0 { YF } else { 0 });
        }
    }

    /// INI/IND/INIR/INDR.
    fn ini_ind<B: Bus>(&mut self, bus: &mut B, decrement: bool, repeat: bool) {
        self.internal(bus, 1);
        let port = self.regs.bc();
        self.regs.wz = if decrement {
            port.wrapping_sub(1)
        } else {
            port.wrapping_add(1)
        };
        let value = self.read_port(bus, port);
        let hl = self.regs.hl();
        self.write_mem(bus, hl, value);

        self.regs.b = self.regs.b.wrapping_sub(1);
        let c_adjusted = if decrement {
            self.regs.c.wrapping_sub(1)
        } else {
            self.regs.c.wrapping_add(1)
        };
        if decrement {
            self.regs.set_hl(hl.wrapping_sub(1));
        } else {
            self.regs.set_hl(hl.wrapping_add(1));
        }

        let k = u16::from(value) + u16::from(c_adjusted);
        self.block_io_flags(bus, value, k, repeat);
    }

    /// OUTI/OUTD/OTIR/OTDR.
    fn outi_outd<B: Bus>(&mut self, bus: &mut B, decrement: bool, repeat: bool) {
        self.internal(bus, 1);
        let hl = self.regs.hl();
        let value = self.read_mem(bus, hl);
        self.regs.b = self.regs.b.wrapping_sub(1);
        let port = self.regs.bc();
        self.regs.wz = if decrement {
            port.wrapping_sub(1)
        } else {
            port.wrapping_add(1)
        };
        self.write_port(bus, port, value);

        if decrement {
            self.regs.set_hl(hl.wrapping_sub(1));
        } else {
            self.regs.set_hl(hl.wrapping_add(1));
        }

        let k = u16::from(value) + u16::from(self.regs.l);
        self.block_io_flags(bus, value, k, repeat);
    }

    /// Shared flag computation for the block I/O family.
    ///
    /// `k` is the documented internal sum whose carry feeds H/C and whose low
    /// bits feed parity. The repeating variants recompute H and parity from
    /// B's neighbourhood and take bits 5/3 from PC high.
    fn block_io_flags<B: Bus>(&mut self, bus: &mut B, value: u8, k: u16, repeat: bool) {
        let b = self.regs.b;
        let hcf = k > 255;
        let nf = value & 0x80 != 0;
        let p = (k as u8 & 7) ^ b;

        if repeat && b != 0 {
            self.internal(bus, 5);
            self.regs.pc = self.regs.pc.wrapping_sub(2);
            self.regs.wz = self.regs.pc.wrapping_add(1);
            let pch = (self.regs.pc >> 8) as u8;
            let (hf, pf) = if hcf {
                if nf {
                    (
                        if b & 0x0F == 0x00 { HF } else { 0 },
                        SZ53P[(p ^ (b.wrapping_sub(1) & 7)) as usize] & PF,
                    )
                } else {
                    (
                        if b & 0x0F == 0x0F { HF } else { 0 },
                        SZ53P[(p ^ (b.wrapping_add(1) & 7)) as usize] & PF,
                    )
                }
            } else {
                (0, SZ53P[(p ^ (b & 7)) as usize] & PF)
            };
            self.set_f(
                (b & SF)
                    | (pch & (XF | YF))
                    | if nf { NF } else { 0 }
                    | if hcf { CF } else { 0 }
                    | hf
                    | pf,
            );
        } else {
            self.set_f(
                if b == 0 { ZF } else { 0 }
                    | (b & (SF | YF | XF))
                    | if nf { NF } else { 0 }
                    | if hcf { HF | CF } else { 0 }
                    | (SZ53P[p as usize] & PF),
            );
        }
    }
}
