use super::{LineScanner, ScanResult};

#[test]
fn crlf_line_is_returned_without_terminator() {
    let mut scanner = LineScanner::new(4096);
    let result = scanner.consume(b"CONNECT example.com:443 HTTP/1.1\r\nleftover");
    assert_eq!(
        result,
        ScanResult::Line {
            content: b"CONNECT example.com:443 HTTP/1.1".to_vec(),
            consumed: 34,
        }
    );
}

#[test]
fn bare_lf_terminates_a_line() {
    let mut scanner = LineScanner::new(4096);
    let result = scanner.consume(b"GET / HTTP/1.0\nx");
    assert_eq!(
        result,
        ScanResult::Line {
            content: b"GET / HTTP/1.0".to_vec(),
            consumed: 15,
        }
    );
}

#[test]
fn partial_line_survives_across_reads() {
    let mut scanner = LineScanner::new(4096);
    assert_eq!(scanner.consume(b"GET http://x"), ScanResult::Incomplete);
    assert_eq!(scanner.buffered_len(), 12);
    let result = scanner.consume(b".com/ HTTP/1.1\r\n");
    assert_eq!(
        result,
        ScanResult::Line {
            content: b"GET http://x.com/ HTTP/1.1".to_vec(),
            consumed: 16,
        }
    );
}

#[test]
fn empty_line_yields_empty_content() {
    let mut scanner = LineScanner::new(4096);
    let result = scanner.consume(b"\r\n");
    assert_eq!(
        result,
        ScanResult::Line {
            content: Vec::new(),
            consumed: 2,
        }
    );
}

#[test]
fn line_of_exactly_the_limit_without_terminator_is_too_long() {
    let mut scanner = LineScanner::new(8);
    assert_eq!(scanner.consume(b"12345678"), ScanResult::TooLong);
}

#[test]
fn one_byte_under_the_limit_with_terminator_succeeds() {
    let mut scanner = LineScanner::new(8);
    let result = scanner.consume(b"1234567\n");
    assert_eq!(
        result,
        ScanResult::Line {
            content: b"1234567".to_vec(),
            consumed: 8,
        }
    );
}

#[test]
fn limit_applies_across_multiple_reads() {
    let mut scanner = LineScanner::new(8);
    assert_eq!(scanner.consume(b"12345"), ScanResult::Incomplete);
    assert_eq!(scanner.consume(b"6789"), ScanResult::TooLong);
}

#[test]
fn consumed_count_leaves_trailing_bytes_for_the_caller() {
    let mut scanner = LineScanner::new(4096);
    let input = b"a\nb\n";
    match scanner.consume(input) {
        ScanResult::Line { content, consumed } => {
            assert_eq!(content, b"a".to_vec());
            assert_eq!(&input[consumed..], b"b\n");
        }
        other => panic!("expected a line, got {other:?}"),
    }
}
