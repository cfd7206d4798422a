use super::{parse_absolute_uri, parse_authority, HostPort, DEFAULT_HTTP_PORT};

#[test]
fn authority_with_domain_and_port() {
    let parsed = parse_authority("example.com:443").expect("must parse");
    assert_eq!(
        parsed,
        HostPort {
            host: "example.com".to_string(),
            port: 443,
        }
    );
}

#[test]
fn authority_with_bracketed_ipv6() {
    let parsed = parse_authority("[2001:db8::1]:8443").expect("must parse");
    assert_eq!(parsed.host, "2001:db8::1");
    assert_eq!(parsed.port, 8443);
}

#[test]
fn authority_without_port_is_rejected() {
    let error = parse_authority("example.com").expect_err("must fail");
    assert_eq!(error, DispatchError::InvalidAuthority);
}

#[test]
fn authority_with_empty_port_is_rejected() {
    let error = parse_authority("example.com:").expect_err("must fail");
    assert_eq!(error, DispatchError::InvalidAuthority);
}

#[test]
fn authority_with_port_zero_is_rejected() {
    let error = parse_authority("example.com:0").expect_err("must fail");
    assert_eq!(error, DispatchError::InvalidAuthority);
}

#[test]
fn unbracketed_ipv6_authority_is_rejected() {
    let error = parse_authority("2001:db8::1:443").expect_err("must fail");
    assert_eq!(error, DispatchError::InvalidAuthority);
}

#[test]
fn absolute_uri_with_explicit_port() {
    let parsed = parse_absolute_uri("http://example.com:8080/path").expect("must parse");
    assert_eq!(parsed.host, "example.com");
    assert_eq!(parsed.port, 8080);
}

#[test]
fn absolute_uri_defaults_to_port_80() {
    let parsed = parse_absolute_uri("http://example.com/path").expect("must parse");
    assert_eq!(parsed.host, "example.com");
    assert_eq!(parsed.port, DEFAULT_HTTP_PORT);
}

#[test]
fn absolute_uri_without_path_still_parses() {
    let parsed = parse_absolute_uri("http://example.com").expect("must parse");
    assert_eq!(parsed.host, "example.com");
    assert_eq!(parsed.port, DEFAULT_HTTP_PORT);
}

#[test]
fn absolute_uri_default_port_ignores_scheme() {
    // an unspecified port defaults to 80 regardless of scheme
    let parsed = parse_absolute_uri("https://example.com/").expect("must parse");
    assert_eq!(parsed.port, DEFAULT_HTTP_PORT);
}

#[test]
fn absolute_uri_with_bracketed_ipv6_host() {
    let parsed = parse_absolute_uri("http://[2001:db8::1]:8080/").expect("must parse");
    assert_eq!(parsed.host, "2001:db8::1");
    assert_eq!(parsed.port, 8080);
}

#[test]
fn target_without_scheme_is_rejected() {
    let error = parse_absolute_uri("example.com/path").expect_err("must fail");
    assert_eq!(error, DispatchError::InvalidUri);
}

#[test]
fn uri_with_empty_authority_is_rejected() {
    let error = parse_absolute_uri("http:///path").expect_err("must fail");
    assert_eq!(error, DispatchError::InvalidUri);
}

#[test]
fn uri_with_explicit_empty_port_is_rejected() {
    let error = parse_absolute_uri("http://example.com:/").expect_err("must fail");
    assert_eq!(error, DispatchError::InvalidUri);
}
