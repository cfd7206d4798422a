#![no_main]

use hop_core::{tokenize, LineScanner, ScanResult};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = tokenize(data);

    let mut scanner = LineScanner::new(4096);
    let mut input = data;
    loop {
        match scanner.consume(input) {
            ScanResult::Line { content, consumed } => {
                let _ = tokenize(&content);
                input = &input[consumed..];
            }
            ScanResult::Incomplete | ScanResult::TooLong => break,
        }
    }
});
