use tempdir::TempDir;

use crate::controls::Button;
use crate::machine::{Machine, MachineError};
use crate::memory::IoBus;

#[test]
fn shift_register_window() {
    let mut machine = Machine::default();
    machine.io.out_u8(4, 0xAA);
    machine.io.out_u8(4, 0xFF);
    assert_eq!(0xFF, machine.io.in_u8(3)); // offset 0 reads the high byte

    machine.io.out_u8(2, 2);
    assert_eq!(0xFE, machine.io.in_u8(3));
}

#[test]
fn control_ports_report_buttons_and_dips() {
    let mut machine = Machine::default();
    assert_eq!(0x0E, machine.io.in_u8(0));
    assert_eq!(0x08, machine.io.in_u8(1)); // bit 3 tied high

    machine.controls_mut().press(Button::Coin);
    machine.controls_mut().press(Button::P1Fire);
    assert_eq!(0x19, machine.io.in_u8(1));

    machine.controls_mut().release(Button::Coin);
    assert_eq!(0x18, machine.io.in_u8(1));

    machine.controls_mut().set_dips(0x03); // two extra ships
    machine.controls_mut().press(Button::P2Left);
    assert_eq!(0x23, machine.io.in_u8(2));
}

#[test]
fn sound_ports_latch_command_bits() {
    let mut machine = Machine::default();
    machine.io.out_u8(3, 0x15);
    machine.io.out_u8(5, 0x02);
    machine.io.out_u8(6, 0x44); // watchdog, absorbed
    assert_eq!(0x15, machine.sound().bank1);
    assert_eq!(0x02, machine.sound().bank2);
}

#[test]
fn frame_delivers_both_cabinet_interrupts() {
    let mut machine = Machine::default();
    let rom: Vec<u8> = vec![
        0xFB,             // 0000: ei
        0xC3, 0x01, 0x00, // 0001: jmp 0x0001
        0x00, 0x00, 0x00, 0x00,
        0xFB,             // 0008: ei       (rst 1 handler)
        0xC9,             // 0009: ret
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0xFB,             // 0010: ei       (rst 2 handler)
        0xC9,             // 0011: ret
    ];
    machine.load_rom(&rom, 0).unwrap();
    machine.cpu.regs.sp = 0x2400;

    machine.execute_frame();
    let half_frame = machine.cpu.clock_hz / 60 / 2;
    assert!(machine.cpu.cycle_count >= half_frame * 2);

    // the mid-frame interrupt was accepted, the vblank one is latched
    assert_eq!(Some(0xD7), machine.cpu.pending_interrupt());
    machine.execute_instruction();
    assert_eq!(0x0010, machine.cpu.regs.pc);
    assert_eq!(None, machine.cpu.pending_interrupt());
}

#[test]
fn cpm_services_print_to_console() {
    let mut machine = Machine::cpm();
    let code: Vec<u8> = vec![
        0x0E, 0x09,       // 0100: mvi c,0x09
        0x11, 0x12, 0x01, // 0102: lxi d,0x0112
        0xCD, 0x05, 0x00, // 0105: call 0x0005
        0x0E, 0x02,       // 0108: mvi c,0x02
        0x1E, 0x21,       // 010a: mvi e,'!'
        0xCD, 0x05, 0x00, // 010c: call 0x0005
        0xC3, 0x00, 0x00, // 010f: jmp 0x0000
        b'H', b'E', b'L', b'L', b'O', b'$', // 0112: message
    ];
    machine.load_com(&code);

    let output = machine.run_com(1000);
    assert_eq!("HELLO!", output);
    assert_eq!(true, machine.stopped);
}

#[test]
fn trace_file_records_executed_instructions() {
    let tmp_dir = TempDir::new("invaders").unwrap();
    let trace_path = tmp_dir.path().join("trace.log");

    let mut machine = Machine::cpm();
    machine.load_com(&[
        0x3E, 0x13, // mvi a,0x13
        0x76,       // hlt
    ]);
    machine.write_trace_to(trace_path.to_str().unwrap()).unwrap();
    machine.execute_instructions(2);

    let trace = std::fs::read_to_string(&trace_path).unwrap();
    let mut lines = trace.lines();
    assert_eq!("0100  3E13    mvi a,0x13     A:00 BC:0000 DE:0000 HL:0000 SP:0000 S0 Z0 A0 P0 C0",
               lines.next().unwrap());
    assert_eq!("0102  76      hlt            A:13 BC:0000 DE:0000 HL:0000 SP:0000 S0 Z0 A0 P0 C0",
               lines.next().unwrap());
}

#[test]
fn oversized_rom_is_rejected() {
    let mut machine = Machine::default();
    match machine.load_rom(&[0x00, 0x00], 0xFFFF) {
        Err(MachineError::RomTooBig(0xFFFF, 2)) => {}
        other => panic!("expected RomTooBig, got {:?}", other),
    }
}

#[test]
fn missing_rom_file_reports_io_error() {
    let mut machine = Machine::default();
    match machine.load_invaders_roms("/nonexistent") {
        Err(MachineError::Io(_)) => {}
        other => panic!("expected Io error, got {:?}", other),
    }
}
