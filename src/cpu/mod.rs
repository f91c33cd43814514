// these modules are re-exported as a single module

pub use self::decoder::*;
mod decoder;

pub use self::flag::*;
mod flag;

pub use self::register::*;
mod register;

use crate::memory::{IoBus, MemoryBus};


/// prints diagnostics of stack usage (push / pop)
const DEBUG_STACK: bool = false;

/// cycles burned per step() while in the halted state
const HALT_IDLE_CYCLES: usize = 4;

/// extra cycles consumed by a taken conditional call or return
const BRANCH_TAKEN_PENALTY: usize = 6;

/// base cycle cost per encoding; conditional calls and returns store
/// the not-taken cost
static CYCLES: [usize; 256] = [
     4, 10,  7,  5,  5,  5,  7,  4,  4, 10,  7,  5,  5,  5,  7,  4,
     4, 10,  7,  5,  5,  5,  7,  4,  4, 10,  7,  5,  5,  5,  7,  4,
     4, 10, 16,  5,  5,  5,  7,  4,  4, 10, 16,  5,  5,  5,  7,  4,
     4, 10, 13,  5, 10, 10, 10,  4,  4, 10, 13,  5,  5,  5,  7,  4,
     5,  5,  5,  5,  5,  5,  7,  5,  5,  5,  5,  5,  5,  5,  7,  5,
     5,  5,  5,  5,  5,  5,  7,  5,  5,  5,  5,  5,  5,  5,  7,  5,
     5,  5,  5,  5,  5,  5,  7,  5,  5,  5,  5,  5,  5,  5,  7,  5,
     7,  7,  7,  7,  7,  7,  7,  7,  5,  5,  5,  5,  5,  5,  7,  5,
     4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4,
     4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4,
     4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4,
     4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4,
     5, 10, 10, 10, 11, 11,  7, 11,  5, 10, 10, 10, 11, 17,  7, 11,
     5, 10, 10, 10, 11, 11,  7, 11,  5, 10, 10, 10, 11, 17,  7, 11,
     5, 10, 10, 18, 11, 11,  7, 11,  5,  5, 10,  4, 11, 17,  7, 11,
     5, 10, 10,  4, 11, 11,  7, 11,  5,  5, 10,  4, 11, 17,  7, 11,
];

/// branch condition selector, opcode bits 5-3
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Cond {
    NZ, Z, NC, C, PO, PE, P, M
}

impl Cond {
    pub fn from_bits(bits: u8) -> Cond {
        match bits {
            0 => Cond::NZ,
            1 => Cond::Z,
            2 => Cond::NC,
            3 => Cond::C,
            4 => Cond::PO,
            5 => Cond::PE,
            6 => Cond::P,
            7 => Cond::M,
            _ => unreachable!(),
        }
    }
}

pub struct CPU {
    pub instruction_count: usize,
    pub cycle_count: usize,

    /// the eight 8-bit registers, pc, sp and the flags
    pub regs: RegisterState,

    /// set by HLT, cleared by an accepted interrupt
    pub halted: bool,

    /// interrupt acknowledgement gate, EI / DI
    pub int_enable: bool,

    /// opcode latched by interrupt(), executed on the next step while
    /// interrupts are enabled
    pending_interrupt: Option<u8>,

    pub clock_hz: usize,
}

impl CPU {
    pub fn default() -> Self {
        CPU {
            instruction_count: 0,
            cycle_count: 0,
            regs: RegisterState::default(),
            halted: false,
            int_enable: false,
            pending_interrupt: None,
            clock_hz: 2_000_000, // Intel 8080A in the invaders cabinet
        }
    }

    pub fn get_r8(&self, r: R) -> u8 {
        self.regs.get_r8(r)
    }

    pub fn set_r8(&mut self, r: R, val: u8) {
        self.regs.set_r8(r, val);
    }

    pub fn get_r16(&self, rp: RP) -> u16 {
        self.regs.get_r16(rp)
    }

    pub fn set_r16(&mut self, rp: RP, val: u16) {
        self.regs.set_r16(rp, val);
    }

    /// latches an interrupt request. the opcode is executed on the next
    /// step if interrupts are enabled; a newer request replaces an
    /// unaccepted one, and the latch survives while interrupts are
    /// disabled.
    pub fn interrupt(&mut self, opcode: u8) {
        self.pending_interrupt = Some(opcode);
    }

    pub fn pending_interrupt(&self) -> Option<u8> {
        self.pending_interrupt
    }

    /// Executes one instruction and returns the cycles it consumed.
    /// An accepted interrupt executes the latched opcode instead of
    /// fetching; a halted cpu burns idle cycles.
    pub fn step(&mut self, mmu: &mut dyn MemoryBus, io: &mut dyn IoBus) -> usize {
        if self.int_enable {
            if let Some(opcode) = self.pending_interrupt.take() {
                self.int_enable = false;
                self.halted = false;
                return self.execute(mmu, io, opcode);
            }
        }
        if self.halted {
            self.cycle_count += HALT_IDLE_CYCLES;
            return HALT_IDLE_CYCLES;
        }
        let opcode = self.fetch_u8(mmu);
        self.execute(mmu, io, opcode)
    }

    fn fetch_u8(&mut self, mmu: &dyn MemoryBus) -> u8 {
        let b = mmu.read_u8(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        b
    }

    fn fetch_u16(&mut self, mmu: &dyn MemoryBus) -> u16 {
        let lo = self.fetch_u8(mmu);
        let hi = self.fetch_u8(mmu);
        u16::from(hi) << 8 | u16::from(lo)
    }

    pub fn push16(&mut self, mmu: &mut dyn MemoryBus, data: u16) {
        let sp = self.regs.sp.wrapping_sub(2);
        self.regs.sp = sp;
        if DEBUG_STACK {
            println!("[{:04X}] push16 {:04X} to {:04X}", self.regs.pc, data, sp);
        }
        mmu.write_u16(sp, data);
    }

    pub fn pop16(&mut self, mmu: &mut dyn MemoryBus) -> u16 {
        let data = mmu.read_u16(self.regs.sp);
        if DEBUG_STACK {
            println!("[{:04X}] pop16 {:04X} from {:04X}", self.regs.pc, data, self.regs.sp);
        }
        self.regs.sp = self.regs.sp.wrapping_add(2);
        data
    }

    /// reads the operand selected by three opcode bits, 110 = M
    fn read_operand(&self, mmu: &dyn MemoryBus, bits: u8) -> u8 {
        match R::from_bits(bits) {
            Some(r) => self.get_r8(r),
            None => mmu.read_u8(self.get_r16(RP::HL)),
        }
    }

    fn write_operand(&mut self, mmu: &mut dyn MemoryBus, bits: u8, data: u8) {
        match R::from_bits(bits) {
            Some(r) => self.set_r8(r, data),
            None => mmu.write_u8(self.get_r16(RP::HL), data),
        }
    }

    fn condition(&self, cond: Cond) -> bool {
        let flags = &self.regs.flags;
        match cond {
            Cond::NZ => !flags.zero,
            Cond::Z => flags.zero,
            Cond::NC => !flags.carry,
            Cond::C => flags.carry,
            Cond::PO => !flags.parity,
            Cond::PE => flags.parity,
            Cond::P => !flags.sign,
            Cond::M => flags.sign,
        }
    }

    /// A <- A + value (+ carry-in), all flags from the addition
    fn add8(&mut self, value: u8, carry_in: bool) {
        let a = self.get_r8(R::A) as usize;
        let v = value as usize;
        let res = a + v + carry_in as usize;
        self.regs.flags.set_carry(res);
        self.regs.flags.set_adjust(res, a, v);
        self.regs.flags.set_szp(res);
        self.set_r8(R::A, res as u8);
    }

    /// A - value - borrow-in in two's complement form. The carry flag
    /// records the borrow; the adjust flag comes from the addition
    /// form. Returns the result so CMP can discard it.
    fn sub8(&mut self, value: u8, borrow_in: bool) -> u8 {
        let a = self.get_r8(R::A) as usize;
        let v = !value as usize;
        let res = a + v + !borrow_in as usize;
        self.regs.flags.carry = res & 0x100 == 0;
        self.regs.flags.set_adjust(res, a, v);
        self.regs.flags.set_szp(res);
        res as u8
    }

    fn and8(&mut self, value: u8) {
        let a = self.get_r8(R::A);
        let res = a & value;
        self.regs.flags.carry = false;
        // ANA reports the OR of bit 3 of the operands in the aux carry
        self.regs.flags.adjust = (a | value) & 0x08 != 0;
        self.regs.flags.set_szp(res as usize);
        self.set_r8(R::A, res);
    }

    fn xor8(&mut self, value: u8) {
        let res = self.get_r8(R::A) ^ value;
        self.regs.flags.carry = false;
        self.regs.flags.adjust = false;
        self.regs.flags.set_szp(res as usize);
        self.set_r8(R::A, res);
    }

    fn or8(&mut self, value: u8) {
        let res = self.get_r8(R::A) | value;
        self.regs.flags.carry = false;
        self.regs.flags.adjust = false;
        self.regs.flags.set_szp(res as usize);
        self.set_r8(R::A, res);
    }

    /// value + 1, carry flag untouched
    fn inr8(&mut self, value: u8) -> u8 {
        let v = value as usize;
        let res = v + 1;
        self.regs.flags.set_adjust(res, v, 1);
        self.regs.flags.set_szp(res);
        res as u8
    }

    /// value - 1 in addition form, carry flag untouched
    fn dcr8(&mut self, value: u8) -> u8 {
        let v = value as usize;
        let res = v + 0xFE + 1;
        self.regs.flags.set_adjust(res, v, 0xFE);
        self.regs.flags.set_szp(res);
        res as u8
    }

    /// HL <- HL + value, carry out of bit 15, other flags untouched
    fn dad(&mut self, value: u16) {
        let res = self.get_r16(RP::HL) as usize + value as usize;
        self.regs.flags.carry = res & 0x1_0000 != 0;
        self.set_r16(RP::HL, res as u16);
    }

    fn rlc(&mut self) {
        let a = self.get_r8(R::A);
        self.regs.flags.carry = a & 0x80 != 0;
        self.set_r8(R::A, a.rotate_left(1));
    }

    fn rrc(&mut self) {
        let a = self.get_r8(R::A);
        self.regs.flags.carry = a & 0x01 != 0;
        self.set_r8(R::A, a.rotate_right(1));
    }

    fn ral(&mut self) {
        let a = self.get_r8(R::A);
        let carry_in = self.regs.flags.carry_val() as u8;
        self.regs.flags.carry = a & 0x80 != 0;
        self.set_r8(R::A, a << 1 | carry_in);
    }

    fn rar(&mut self) {
        let a = self.get_r8(R::A);
        let carry_in = self.regs.flags.carry_val() as u8;
        self.regs.flags.carry = a & 0x01 != 0;
        self.set_r8(R::A, carry_in << 7 | a >> 1);
    }

    /// bcd adjust after an addition: fix the low nibble first, then the
    /// high nibble of the already-adjusted accumulator
    fn daa(&mut self) {
        let a = self.get_r8(R::A) as usize;
        let adjusted = if a & 0x0F > 9 || self.regs.flags.adjust {
            let res = a + 0x06;
            self.regs.flags.set_adjust(res, a, 0x06);
            res & 0xFF
        } else {
            self.regs.flags.adjust = false;
            a
        };
        let result = if adjusted >> 4 > 9 || self.regs.flags.carry {
            self.regs.flags.carry = true;
            (adjusted + 0x60) & 0xFF
        } else {
            adjusted
        };
        self.regs.flags.set_szp(result);
        self.set_r8(R::A, result as u8);
    }

    fn execute(&mut self, mmu: &mut dyn MemoryBus, io: &mut dyn IoBus, opcode: u8) -> usize {
        self.instruction_count += 1;
        let mut cycles = CYCLES[opcode as usize];
        match opcode {
            // nop, including the unused encodings the 8080 executes as nop
            0x00 | 0x08 | 0x10 | 0x18 | 0x20 | 0x28 | 0x30 | 0x38 => {}

            // lxi rp,d16
            0x01 | 0x11 | 0x21 | 0x31 => {
                let data = self.fetch_u16(mmu);
                self.set_r16(RP::from_bits(opcode >> 4 & 3), data);
            }

            // stax b/d
            0x02 | 0x12 => {
                let addr = self.get_r16(RP::from_bits(opcode >> 4 & 3));
                mmu.write_u8(addr, self.get_r8(R::A));
            }

            // inx rp
            0x03 | 0x13 | 0x23 | 0x33 => {
                let rp = RP::from_bits(opcode >> 4 & 3);
                let val = self.get_r16(rp).wrapping_add(1);
                self.set_r16(rp, val);
            }

            // inr r/m
            0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x34 | 0x3C => {
                let sel = opcode >> 3 & 7;
                let val = self.read_operand(mmu, sel);
                let res = self.inr8(val);
                self.write_operand(mmu, sel, res);
            }

            // dcr r/m
            0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x35 | 0x3D => {
                let sel = opcode >> 3 & 7;
                let val = self.read_operand(mmu, sel);
                let res = self.dcr8(val);
                self.write_operand(mmu, sel, res);
            }

            // mvi r/m,d8
            0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x36 | 0x3E => {
                let data = self.fetch_u8(mmu);
                self.write_operand(mmu, opcode >> 3 & 7, data);
            }

            0x07 => self.rlc(),

            // dad rp
            0x09 | 0x19 | 0x29 | 0x39 => {
                let val = self.get_r16(RP::from_bits(opcode >> 4 & 3));
                self.dad(val);
            }

            // ldax b/d
            0x0A | 0x1A => {
                let addr = self.get_r16(RP::from_bits(opcode >> 4 & 3));
                let data = mmu.read_u8(addr);
                self.set_r8(R::A, data);
            }

            // dcx rp
            0x0B | 0x1B | 0x2B | 0x3B => {
                let rp = RP::from_bits(opcode >> 4 & 3);
                let val = self.get_r16(rp).wrapping_sub(1);
                self.set_r16(rp, val);
            }

            0x0F => self.rrc(),
            0x17 => self.ral(),
            0x1F => self.rar(),

            // shld a16
            0x22 => {
                let addr = self.fetch_u16(mmu);
                mmu.write_u16(addr, self.get_r16(RP::HL));
            }

            0x27 => self.daa(),

            // lhld a16
            0x2A => {
                let addr = self.fetch_u16(mmu);
                let data = mmu.read_u16(addr);
                self.set_r16(RP::HL, data);
            }

            // cma
            0x2F => {
                let a = self.get_r8(R::A);
                self.set_r8(R::A, !a);
            }

            // sta a16
            0x32 => {
                let addr = self.fetch_u16(mmu);
                mmu.write_u8(addr, self.get_r8(R::A));
            }

            0x37 => self.regs.flags.carry = true,

            // lda a16
            0x3A => {
                let addr = self.fetch_u16(mmu);
                let data = mmu.read_u8(addr);
                self.set_r8(R::A, data);
            }

            0x3F => self.regs.flags.carry = !self.regs.flags.carry,

            0x76 => self.halted = true,

            // mov r/m,r/m
            0x40..=0x7F => {
                let data = self.read_operand(mmu, opcode & 7);
                self.write_operand(mmu, opcode >> 3 & 7, data);
            }

            // add/adc r/m
            0x80..=0x87 => {
                let val = self.read_operand(mmu, opcode & 7);
                self.add8(val, false);
            }
            0x88..=0x8F => {
                let val = self.read_operand(mmu, opcode & 7);
                let carry = self.regs.flags.carry;
                self.add8(val, carry);
            }

            // sub/sbb r/m
            0x90..=0x97 => {
                let val = self.read_operand(mmu, opcode & 7);
                let res = self.sub8(val, false);
                self.set_r8(R::A, res);
            }
            0x98..=0x9F => {
                let val = self.read_operand(mmu, opcode & 7);
                let borrow = self.regs.flags.carry;
                let res = self.sub8(val, borrow);
                self.set_r8(R::A, res);
            }

            // ana/xra/ora r/m
            0xA0..=0xA7 => {
                let val = self.read_operand(mmu, opcode & 7);
                self.and8(val);
            }
            0xA8..=0xAF => {
                let val = self.read_operand(mmu, opcode & 7);
                self.xor8(val);
            }
            0xB0..=0xB7 => {
                let val = self.read_operand(mmu, opcode & 7);
                self.or8(val);
            }

            // cmp r/m
            0xB8..=0xBF => {
                let val = self.read_operand(mmu, opcode & 7);
                self.sub8(val, false);
            }

            // rcond
            0xC0 | 0xC8 | 0xD0 | 0xD8 | 0xE0 | 0xE8 | 0xF0 | 0xF8 => {
                if self.condition(Cond::from_bits(opcode >> 3 & 7)) {
                    self.regs.pc = self.pop16(mmu);
                    cycles += BRANCH_TAKEN_PENALTY;
                }
            }

            // pop rp
            0xC1 | 0xD1 | 0xE1 => {
                let data = self.pop16(mmu);
                self.set_r16(RP::from_bits(opcode >> 4 & 3), data);
            }

            // pop psw
            0xF1 => {
                let data = self.pop16(mmu);
                self.regs.set_psw(data);
            }

            // jcond a16
            0xC2 | 0xCA | 0xD2 | 0xDA | 0xE2 | 0xEA | 0xF2 | 0xFA => {
                let addr = self.fetch_u16(mmu);
                if self.condition(Cond::from_bits(opcode >> 3 & 7)) {
                    self.regs.pc = addr;
                }
            }

            // jmp a16, 0xCB is the undocumented alias
            0xC3 | 0xCB => {
                let addr = self.fetch_u16(mmu);
                self.regs.pc = addr;
            }

            // ccond a16
            0xC4 | 0xCC | 0xD4 | 0xDC | 0xE4 | 0xEC | 0xF4 | 0xFC => {
                let addr = self.fetch_u16(mmu);
                if self.condition(Cond::from_bits(opcode >> 3 & 7)) {
                    let pc = self.regs.pc;
                    self.push16(mmu, pc);
                    self.regs.pc = addr;
                    cycles += BRANCH_TAKEN_PENALTY;
                }
            }

            // push rp
            0xC5 | 0xD5 | 0xE5 => {
                let data = self.get_r16(RP::from_bits(opcode >> 4 & 3));
                self.push16(mmu, data);
            }

            // push psw
            0xF5 => {
                let data = self.regs.get_psw();
                self.push16(mmu, data);
            }

            // adi/aci d8
            0xC6 => {
                let val = self.fetch_u8(mmu);
                self.add8(val, false);
            }
            0xCE => {
                let val = self.fetch_u8(mmu);
                let carry = self.regs.flags.carry;
                self.add8(val, carry);
            }

            // rst n
            0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
                let pc = self.regs.pc;
                self.push16(mmu, pc);
                self.regs.pc = u16::from(opcode & 0x38);
            }

            // ret, 0xD9 is the undocumented alias
            0xC9 | 0xD9 => self.regs.pc = self.pop16(mmu),

            // call a16, 0xDD/0xED/0xFD are the undocumented aliases
            0xCD | 0xDD | 0xED | 0xFD => {
                let addr = self.fetch_u16(mmu);
                let pc = self.regs.pc;
                self.push16(mmu, pc);
                self.regs.pc = addr;
            }

            // out d8
            0xD3 => {
                let port = self.fetch_u8(mmu);
                io.out_u8(port, self.get_r8(R::A));
            }

            // sui/sbi d8
            0xD6 => {
                let val = self.fetch_u8(mmu);
                let res = self.sub8(val, false);
                self.set_r8(R::A, res);
            }
            0xDE => {
                let val = self.fetch_u8(mmu);
                let borrow = self.regs.flags.carry;
                let res = self.sub8(val, borrow);
                self.set_r8(R::A, res);
            }

            // in d8
            0xDB => {
                let port = self.fetch_u8(mmu);
                let data = io.in_u8(port);
                self.set_r8(R::A, data);
            }

            // xthl: swap HL with the word at SP
            0xE3 => {
                let hl = self.get_r16(RP::HL);
                let stack = mmu.read_u16(self.regs.sp);
                mmu.write_u16(self.regs.sp, hl);
                self.set_r16(RP::HL, stack);
            }

            // ani d8
            0xE6 => {
                let val = self.fetch_u8(mmu);
                self.and8(val);
            }

            // pchl
            0xE9 => self.regs.pc = self.get_r16(RP::HL),

            // xchg: swap DE and HL
            0xEB => {
                let de = self.get_r16(RP::DE);
                let hl = self.get_r16(RP::HL);
                self.set_r16(RP::DE, hl);
                self.set_r16(RP::HL, de);
            }

            // xri d8
            0xEE => {
                let val = self.fetch_u8(mmu);
                self.xor8(val);
            }

            0xF3 => self.int_enable = false,

            // ori d8
            0xF6 => {
                let val = self.fetch_u8(mmu);
                self.or8(val);
            }

            // sphl
            0xF9 => self.regs.sp = self.get_r16(RP::HL),

            0xFB => self.int_enable = true,

            // cpi d8
            0xFE => {
                let val = self.fetch_u8(mmu);
                self.sub8(val, false);
            }
        }
        self.cycle_count += cycles;
        cycles
    }
}
