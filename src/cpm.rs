use crate::cpu::{R, RP};
use crate::machine::Machine;

// Console services for programs written against the cp/m BDOS, which is
// how the cpu test roms report their verdict: C selects the function,
// CALL 5 invokes it. Returns true when the program performed a warm
// boot, i.e. terminated.
pub fn service(machine: &mut Machine) -> bool {
    match machine.cpu.regs.pc {
        // warm boot entry
        0x0000 => true,
        // bdos entry
        0x0005 => {
            match machine.cpu.get_r8(R::C) {
                0x02 => {
                    // CONSOLE OUTPUT
                    // E = character to write
                    let e = machine.cpu.get_r8(R::E);
                    print!("{}", e as char);
                    machine.console.push(e as char);
                }
                0x09 => {
                    // PRINT STRING
                    // DE -> '$'-terminated string
                    let addr = machine.cpu.get_r16(RP::DE);
                    let s = machine.mmu.read_asciid(addr);
                    print!("{}", s);
                    machine.console.push_str(&s);
                }
                other => {
                    println!("cpm error: unhandled bdos function {:02X}", other);
                }
            }
            // return to the caller
            let pc = machine.cpu.pop16(&mut machine.mmu);
            machine.cpu.regs.pc = pc;
            false
        }
        _ => false,
    }
}
