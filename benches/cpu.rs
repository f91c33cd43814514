#[macro_use]
extern crate criterion;

extern crate invaders;

use criterion::Criterion;

use invaders::machine::Machine;

fn exec_simple_loop(c: &mut Criterion) {
    let mut machine = Machine::cpm();
    let code: Vec<u8> = vec![
        0x06, 0xFF,       // mvi b,0xff
        0x05,             // dcr b
        0xC2, 0x02, 0x01, // jnz 0x0102
        0xC3, 0x00, 0x01, // jmp 0x0100
    ];
    machine.load_com(&code);

    c.bench_function("execute dcr/jnz loop", |b| b.iter(|| machine.execute_instruction()));
}

fn disasm_small_prog(c: &mut Criterion) {
    let mut machine = Machine::cpm();
    let code: Vec<u8> = vec![
        0x3E, 0x00,       // mvi a,0x00
        0xFE, 0x09,       // cpi 0x09
        0xC6, 0x01,       // adi 0x01
        0x27,             // daa
        0xC2, 0x02, 0x01, // jnz 0x0102
        0x76,             // hlt
    ];
    machine.load_com(&code);

    c.bench_function("disasm small prog", |b| {
        b.iter(|| machine.decoder.disassemble_block_to_str(&machine.mmu, 0x0100, 6))
    });
}

criterion_group!(benches, exec_simple_loop, disasm_small_prog);
criterion_main!(benches);
