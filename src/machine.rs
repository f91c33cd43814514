use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::controls::Controls;
use crate::cpm;
use crate::cpu::{Decoder, RegisterState, CPU, R, RP};
use crate::hex::hex_bytes;
use crate::memory::{IoBus, MemoryBus, MMU};
use crate::shifter::Shifter;
use crate::sound::Sound;
use crate::string::right_pad;
use crate::tools::read_binary;

#[cfg(test)]
#[path = "./machine_test.rs"]
mod machine_test;

/// prints each instruction & reg values as they are executed
const DEBUG_EXEC: bool = false;

/// prints access to I/O ports
const DEBUG_IO: bool = false;

/// the cabinet rom comes as four 2K chips
const INVADERS_ROMS: [(&str, u16); 4] = [
    ("INVADERS.H", 0x0000),
    ("INVADERS.G", 0x0800),
    ("INVADERS.F", 0x1000),
    ("INVADERS.E", 0x1800),
];

quick_error! {
    #[derive(Debug)]
    pub enum MachineError {
        Io(err: std::io::Error) {
            from()
            display("i/o error: {}", err)
        }
        RomTooBig(addr: u16, size: usize) {
            display("rom of {} bytes does not fit at {:04X}", size, addr)
        }
    }
}

pub enum MachineComponent {
    Shifter(Shifter),
    Controls(Controls),
    Sound(Sound),
}

pub trait Component {
    /// returns Some<u8> if read was handled
    fn in_u8(&mut self, _port: u8) -> Option<u8> {
        None
    }

    /// returns true if write was handled
    fn out_u8(&mut self, _port: u8, _data: u8) -> bool {
        false
    }
}

/// routes IN and OUT to the registered port devices
pub struct IoDispatcher {
    components: Vec<MachineComponent>,
}

impl IoBus for IoDispatcher {
    fn in_u8(&mut self, port: u8) -> u8 {
        if DEBUG_IO {
            println!("in_u8: read from {:02X}", port);
        }

        for component in &mut self.components {
            let handled = match component {
                MachineComponent::Shifter(c) => c.in_u8(port),
                MachineComponent::Controls(c) => c.in_u8(port),
                MachineComponent::Sound(c) => c.in_u8(port),
            };
            if let Some(v) = handled {
                return v;
            }
        }

        println!("in_u8: unhandled port {:02X}", port);
        0
    }

    fn out_u8(&mut self, port: u8, data: u8) {
        if DEBUG_IO {
            println!("out_u8: write to {:02X} = {:02X}", port, data);
        }

        for component in &mut self.components {
            let handled = match component {
                MachineComponent::Shifter(c) => c.out_u8(port, data),
                MachineComponent::Controls(c) => c.out_u8(port, data),
                MachineComponent::Sound(c) => c.out_u8(port, data),
            };
            if handled {
                return;
            }
        }

        println!("out_u8: unhandled port {:02X} = {:02X}", port, data);
    }
}

impl IoDispatcher {
    pub fn new() -> Self {
        IoDispatcher {
            components: Vec::new(),
        }
    }
}

pub struct Machine {
    pub cpu: CPU,
    pub mmu: MMU,

    /// handlers for the i/o ports
    pub io: IoDispatcher,

    pub decoder: Decoder,

    /// services cp/m console calls, used to run the cpu test roms
    cpm_services: bool,

    /// console output collected from the cp/m services
    pub console: String,

    /// set when the running program has terminated
    pub stopped: bool,

    /// if set, writes opcode trace to `trace_file`
    trace_file: Option<File>,

    /// if set, limits the execution to `trace_count` instructions
    trace_count: Option<usize>,
}

impl Machine {
    /// a Space Invaders cabinet: arcade memory map plus the shift
    /// register, input and sound devices
    pub fn default() -> Self {
        let mut m = Machine {
            cpu: CPU::default(),
            mmu: MMU::invaders(),
            io: IoDispatcher::new(),
            decoder: Decoder::default(),
            cpm_services: false,
            console: String::new(),
            stopped: false,
            trace_file: None,
            trace_count: None,
        };
        m.register_components();
        m
    }

    /// flat 64K of ram with cp/m console services and no port devices,
    /// used to run the cpu test roms
    pub fn cpm() -> Self {
        Machine {
            cpu: CPU::default(),
            mmu: MMU::default(),
            io: IoDispatcher::new(),
            decoder: Decoder::default(),
            cpm_services: true,
            console: String::new(),
            stopped: false,
            trace_file: None,
            trace_count: None,
        }
    }

    fn register_components(&mut self) {
        self.io.components.push(MachineComponent::Shifter(Shifter::default()));
        self.io.components.push(MachineComponent::Controls(Controls::default()));
        self.io.components.push(MachineComponent::Sound(Sound::default()));
    }

    /// returns a mutable reference to the Controls component
    pub fn controls_mut(&mut self) -> &mut Controls {
        for component in &mut self.io.components {
            if let MachineComponent::Controls(c) = component {
                return c;
            }
        }
        unreachable!();
    }

    /// returns a reference to the Sound component
    pub fn sound(&self) -> &Sound {
        for component in &self.io.components {
            if let MachineComponent::Sound(c) = component {
                return c;
            }
        }
        unreachable!();
    }

    /// Enables writing of opcode trace to file.
    pub fn write_trace_to(&mut self, filename: &str) -> Result<(), MachineError> {
        let trace_path = Path::new(filename);
        self.trace_file = Some(File::create(&trace_path)?);
        Ok(())
    }

    /// Limits the instruction trace to `count` instructions
    pub fn set_trace_count(&mut self, count: usize) {
        self.trace_count = Some(count);
    }

    /// places a rom image in memory
    pub fn load_rom(&mut self, data: &[u8], addr: u16) -> Result<(), MachineError> {
        if addr as usize + data.len() > 0x1_0000 {
            return Err(MachineError::RomTooBig(addr, data.len()));
        }
        self.mmu.write(addr, data);
        Ok(())
    }

    /// loads a rom image from a file
    pub fn load_rom_file(&mut self, filename: &str, addr: u16) -> Result<(), MachineError> {
        let data = read_binary(filename)?;
        self.load_rom(&data, addr)
    }

    /// loads the four invaders rom chips from a directory
    pub fn load_invaders_roms(&mut self, dir: &str) -> Result<(), MachineError> {
        for (name, addr) in &INVADERS_ROMS {
            self.load_rom_file(&format!("{}/{}", dir, name), *addr)?;
        }
        Ok(())
    }

    /// loads a cp/m .com program at 0100 and points the cpu at it
    pub fn load_com(&mut self, data: &[u8]) {
        self.mmu.write(0x0100, data);
        // a plain ret at the bdos entry, for programs stepped without
        // the services
        self.mmu.write_u8(0x0005, 0xC9);
        self.cpu.regs.pc = 0x0100;
    }

    /// returns a copy of register values at a given time
    pub fn register_snapshot(&self) -> RegisterState {
        self.cpu.regs.clone()
    }

    /// executes the next CPU instruction
    pub fn execute_instruction(&mut self) {
        if self.cpm_services && cpm::service(self) {
            self.stopped = true;
            return;
        }

        if let Some(max) = self.trace_count {
            if self.cpu.instruction_count >= max {
                self.stopped = true;
                println!("[{:04X}] ending execution trace after {} instructions",
                         self.cpu.regs.pc, self.cpu.instruction_count);
                return;
            }
        }

        if self.trace_file.is_some() {
            if let Err(why) = self.write_trace() {
                println!("trace error: {}, tracing disabled", why);
                self.trace_file = None;
            }
        }

        if DEBUG_EXEC {
            let op = self.decoder.instruction_info(&self.mmu, self.cpu.regs.pc);
            println!("[{:04X}] {:<14} {}", op.offset, op.text, self.trace_regs());
        }

        self.cpu.step(&mut self.mmu, &mut self.io);
    }

    /// executes n instructions of the cpu
    /// returns true if the program terminated
    pub fn execute_instructions(&mut self, count: usize) -> bool {
        for _ in 0..count {
            self.execute_instruction();
            if self.stopped {
                return true;
            }
        }
        false
    }

    /// Executes enough instructions for one video frame, delivering the
    /// mid-frame and vertical blank interrupts the cabinet generates.
    pub fn execute_frame(&mut self) {
        let fps = 60;
        let half_frame = self.cpu.clock_hz / fps / 2;

        for opcode in &[0xCF, 0xD7] { // RST 1, RST 2
            let start = self.cpu.cycle_count;
            while self.cpu.cycle_count < start + half_frame && !self.stopped {
                self.execute_instruction();
            }
            self.cpu.interrupt(*opcode);
        }
    }

    /// drives a loaded .com program to termination and returns the
    /// console output
    pub fn run_com(&mut self, max_instructions: usize) -> String {
        while !self.stopped && self.cpu.instruction_count < max_instructions {
            self.execute_instruction();
        }
        self.console.clone()
    }

    fn trace_regs(&self) -> String {
        format!("A:{:02X} BC:{:04X} DE:{:04X} HL:{:04X} SP:{:04X} S{} Z{} A{} P{} C{}",
            self.cpu.get_r8(R::A),
            self.cpu.get_r16(RP::BC),
            self.cpu.get_r16(RP::DE),
            self.cpu.get_r16(RP::HL),
            self.cpu.regs.sp,
            self.cpu.regs.flags.sign_numeric(),
            self.cpu.regs.flags.zero_numeric(),
            self.cpu.regs.flags.adjust_numeric(),
            self.cpu.regs.flags.parity_numeric(),
            self.cpu.regs.flags.carry_numeric())
    }

    fn write_trace(&mut self) -> Result<(), MachineError> {
        let op = self.decoder.instruction_info(&self.mmu, self.cpu.regs.pc);
        let regs = self.trace_regs();

        if let Some(file) = &self.trace_file {
            let mut writer = BufWriter::new(file);
            writeln!(&mut writer, "{:04X}  {} {} {}",
                op.offset,
                right_pad(&hex_bytes(&op.bytes), 7),
                right_pad(&op.text, 14),
                regs)?;
            writer.flush()?;
        }
        Ok(())
    }
}
