use crate::string::{bytes_to_ascii, right_pad};

#[test]
fn can_right_pad() {
    assert_eq!("ab  ", right_pad("ab", 4));
    assert_eq!("abcd", right_pad("abcd", 2));
}

#[test]
fn can_map_bytes_to_ascii() {
    assert_eq!("HELLO.", bytes_to_ascii(b"HELLO\x00"));
    assert_eq!(".A.", bytes_to_ascii(&[0x1E, 0x41, 0xFF]));
}
