#[cfg(test)]
#[path = "./string_test.rs"]
mod string_test;

pub fn right_pad(s: &str, len: usize) -> String {
    let mut res = String::new();
    res.push_str(s);
    if s.len() < len {
        let padding_len = len - s.len();
        for _ in 0..padding_len {
            res.push_str(" ");
        }
    }
    res
}

pub fn bytes_to_ascii(data: &[u8]) -> String {
    data.iter().map(|b| if *b < 128 && *b > 30 {
        *b as char
    } else {
        '.'
    }).collect()
}
