use crate::cpu::register::{RegisterState, R, RP};

#[test]
fn can_access_register_pairs() {
    let mut regs = RegisterState::default();
    regs.set_r16(RP::BC, 0x1234);
    assert_eq!(0x12, regs.get_r8(R::B));
    assert_eq!(0x34, regs.get_r8(R::C));
    assert_eq!(0x1234, regs.get_r16(RP::BC));

    regs.set_r8(R::H, 0xA1);
    regs.set_r8(R::L, 0x7B);
    assert_eq!(0xA17B, regs.get_r16(RP::HL));

    regs.set_r16(RP::SP, 0x2400);
    assert_eq!(0x2400, regs.sp);
}

#[test]
fn psw_packs_accumulator_and_flags() {
    let mut regs = RegisterState::default();
    regs.set_r8(R::A, 0x55);
    regs.flags.carry = true;
    regs.flags.zero = true;
    assert_eq!(0x5543, regs.get_psw());

    // the constant bits win on restore
    regs.set_psw(0xAAFF);
    assert_eq!(0xAA, regs.get_r8(R::A));
    assert_eq!(0xD7, regs.flags.u8());
}

#[test]
fn operand_selector_maps_opcode_bits() {
    assert_eq!(Some(R::B), R::from_bits(0));
    assert_eq!(Some(R::L), R::from_bits(5));
    assert_eq!(None, R::from_bits(6)); // M
    assert_eq!(Some(R::A), R::from_bits(7));
    assert_eq!(RP::BC, RP::from_bits(0));
    assert_eq!(RP::SP, RP::from_bits(3));
}
