use super::{tokenize, DispatchError};

#[test]
fn splits_connect_line_into_three_tokens() {
    let line = tokenize(b"CONNECT example.com:443 HTTP/1.1").expect("must tokenize");
    assert_eq!(line.method, "CONNECT");
    assert_eq!(line.target, "example.com:443");
    assert_eq!(line.version, "HTTP/1.1");
}

#[test]
fn leading_lenient_spaces_are_skipped() {
    let line = tokenize(b"  \tGET http://x.com/ HTTP/1.1").expect("must tokenize");
    assert_eq!(line.method, "GET");
    assert_eq!(line.target, "http://x.com/");
}

#[test]
fn any_lenient_space_separates_fields() {
    // HT between method and target, VT between target and version
    let line = tokenize(b"GET\thttp://x.com/\x0bHTTP/1.1").expect("must tokenize");
    assert_eq!(line.method, "GET");
    assert_eq!(line.target, "http://x.com/");
    assert_eq!(line.version, "HTTP/1.1");
}

#[test]
fn missing_version_token_yields_empty_version() {
    let line = tokenize(b"GET http://x.com/ ").expect("must tokenize");
    assert_eq!(line.method, "GET");
    assert_eq!(line.target, "http://x.com/");
    assert_eq!(line.version, "");
}

#[test]
fn non_lenient_whitespace_at_target_start_is_malformed() {
    let error = tokenize(b"GET \x1chttp://x.com/ HTTP/1.1").expect_err("must fail");
    assert_eq!(error, DispatchError::MalformedRequestLine);
}

#[test]
fn non_lenient_whitespace_before_method_is_malformed() {
    let error = tokenize(b"\x1dGET http://x.com/ HTTP/1.1").expect_err("must fail");
    assert_eq!(error, DispatchError::MalformedRequestLine);
}

#[test]
fn trailing_broad_whitespace_is_trimmed_from_version() {
    let line = tokenize(b"GET http://x.com/ HTTP/1.1 \r\x1c").expect("must tokenize");
    assert_eq!(line.version, "HTTP/1.1");
}

#[test]
fn empty_line_tokenizes_to_empty_fields() {
    let line = tokenize(b"").expect("must tokenize");
    assert_eq!(line.method, "");
    assert_eq!(line.target, "");
    assert_eq!(line.version, "");
}
