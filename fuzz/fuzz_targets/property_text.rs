#![no_main]

use libfuzzer_sys::fuzz_target;
use scantrace::format::{escape_attr, format_hex_msb_first};

fuzz_target!(|data: &[u8]| {
    let hex = format_hex_msb_first(data);
    assert_eq!(hex.len(), 2 + data.len() * 2);

    let text = String::from_utf8_lossy(data);
    let escaped = escape_attr(&text);
    assert!(!escaped.contains('<') && !escaped.contains('"'));
});
