use super::{Connection, DispatchAction, DispatchConfig, Phase};

fn connection() -> Connection {
    Connection::new(&DispatchConfig::default())
}

#[test]
fn connect_dispatch_opens_target_and_withholds_the_line() {
    let mut conn = connection();
    let actions = conn
        .handle(b"CONNECT example.com:443 HTTP/1.1\r\n")
        .expect("must dispatch");
    assert_eq!(
        actions,
        vec![DispatchAction::OpenDownstream(HostPort {
            host: "example.com".to_string(),
            port: 443,
        })]
    );
    assert_eq!(conn.phase(), Phase::Establishing);
    assert!(conn.is_tunnel());

    // nothing but MarkTunnel: the CONNECT line never reaches downstream
    let opened = conn.downstream_opened();
    assert_eq!(opened, vec![DispatchAction::MarkTunnel]);
    assert_eq!(conn.phase(), Phase::Tunneling);
}

#[test]
fn connect_remainder_flushes_after_open() {
    let mut conn = connection();
    conn.handle(b"CONNECT example.com:443 HTTP/1.1\r\nHost: example.com\r\n\r\n")
        .expect("must dispatch");
    let opened = conn.downstream_opened();
    assert_eq!(
        opened,
        vec![
            DispatchAction::MarkTunnel,
            DispatchAction::WriteDownstream(b"Host: example.com\r\n\r\n".to_vec()),
        ]
    );
}

#[test]
fn forward_dispatch_replays_the_head_verbatim() {
    let mut conn = connection();
    let raw = b"GET http://example.com/path HTTP/1.1\r\nHost: example.com\r\n";
    let actions = conn.handle(raw).expect("must dispatch");
    assert_eq!(
        actions,
        vec![DispatchAction::OpenDownstream(HostPort {
            host: "example.com".to_string(),
            port: 80,
        })]
    );
    assert!(!conn.is_tunnel());

    let opened = conn.downstream_opened();
    assert_eq!(opened, vec![DispatchAction::WriteDownstream(raw.to_vec())]);
    assert_eq!(conn.phase(), Phase::Forwarding);
}

#[test]
fn forward_head_split_across_reads_is_replayed_in_full() {
    let mut conn = connection();
    assert_eq!(conn.handle(b"GET http://exa").expect("buffering"), vec![]);
    assert_eq!(conn.phase(), Phase::AwaitingLine);
    let actions = conn
        .handle(b"mple.com/ HTTP/1.1\r\nHost: example.com\r\n")
        .expect("must dispatch");
    assert_eq!(
        actions,
        vec![DispatchAction::OpenDownstream(HostPort {
            host: "example.com".to_string(),
            port: 80,
        })]
    );
    let opened = conn.downstream_opened();
    assert_eq!(
        opened,
        vec![DispatchAction::WriteDownstream(
            b"GET http://example.com/ HTTP/1.1\r\nHost: example.com\r\n".to_vec()
        )]
    );
}

#[test]
fn connect_line_split_across_reads_still_dispatches() {
    let mut conn = connection();
    assert_eq!(conn.handle(b"CONNECT exam").expect("buffering"), vec![]);
    let actions = conn
        .handle(b"ple.com:443 HTTP/1.1\r\n")
        .expect("must dispatch");
    assert_eq!(
        actions,
        vec![DispatchAction::OpenDownstream(HostPort {
            host: "example.com".to_string(),
            port: 443,
        })]
    );
}

#[test]
fn bytes_during_establishing_are_buffered_in_order() {
    let mut conn = connection();
    conn.handle(b"CONNECT example.com:443 HTTP/1.1\r\n")
        .expect("must dispatch");
    assert_eq!(conn.handle(b"hello").expect("buffering"), vec![]);
    assert_eq!(conn.handle(b" world").expect("buffering"), vec![]);
    let opened = conn.downstream_opened();
    assert_eq!(
        opened,
        vec![
            DispatchAction::MarkTunnel,
            DispatchAction::WriteDownstream(b"hello world".to_vec()),
        ]
    );
}

#[test]
fn establishing_backlog_is_bounded() {
    let config = DispatchConfig {
        max_establishing_buffer_bytes: 4,
        ..DispatchConfig::default()
    };
    let mut conn = Connection::new(&config);
    conn.handle(b"CONNECT example.com:443 HTTP/1.1\r\n")
        .expect("must dispatch");
    let error = conn.handle(b"12345").expect_err("must overflow");
    assert_eq!(error, DispatchError::EstablishingBacklogExceeded);
}

#[test]
fn terminal_phase_never_parses_again() {
    let mut conn = connection();
    conn.handle(b"CONNECT example.com:443 HTTP/1.1\r\n")
        .expect("must dispatch");
    conn.downstream_opened();
    assert_eq!(conn.phase(), Phase::Tunneling);

    // would be a malformed request line if it were ever tokenized
    let garbage = b"\x1c\x1d not a request line\r\n\r\n";
    let actions = conn.handle(garbage).expect("must relay verbatim");
    assert_eq!(
        actions,
        vec![DispatchAction::WriteDownstream(garbage.to_vec())]
    );
}

#[test]
fn malformed_request_line_is_fatal() {
    let mut conn = connection();
    let error = conn
        .handle(b"GET \x1chttp://x.com/ HTTP/1.1\r\n")
        .expect_err("must fail");
    assert_eq!(error, DispatchError::MalformedRequestLine);
}

#[test]
fn connect_without_port_is_invalid_authority() {
    let mut conn = connection();
    let error = conn
        .handle(b"CONNECT example.com HTTP/1.1\r\n")
        .expect_err("must fail");
    assert_eq!(error, DispatchError::InvalidAuthority);
}

#[test]
fn forward_target_without_scheme_is_invalid_uri() {
    let mut conn = connection();
    let error = conn
        .handle(b"GET example.com/path HTTP/1.1\r\n")
        .expect_err("must fail");
    assert_eq!(error, DispatchError::InvalidUri);
}

#[test]
fn overlong_request_line_is_fatal() {
    let config = DispatchConfig {
        max_line_bytes: 16,
        ..DispatchConfig::default()
    };
    let mut conn = Connection::new(&config);
    let error = conn
        .handle(b"GET http://example.com/really-long HTTP/1.1\r\n")
        .expect_err("must fail");
    assert_eq!(error, DispatchError::LineTooLong);
}

#[test]
fn downstream_open_failure_is_terminal_and_drops_pending() {
    let mut conn = connection();
    conn.handle(b"CONNECT example.com:443 HTTP/1.1\r\n")
        .expect("must dispatch");
    conn.handle(b"buffered").expect("buffering");
    let error = conn.downstream_open_failed();
    assert_eq!(error, DispatchError::DownstreamConnectFailure);
}

#[test]
fn client_disconnect_during_establish_releases_buffered_bytes() {
    let mut conn = connection();
    conn.handle(b"CONNECT example.com:443 HTTP/1.1\r\n")
        .expect("must dispatch");
    conn.handle(b"early bytes").expect("buffering");
    conn.client_closed();

    // a connect that completes after the client left must receive nothing
    let opened = conn.downstream_opened();
    assert_eq!(opened, vec![DispatchAction::MarkTunnel]);
}

#[test]
fn target_is_exposed_after_dispatch() {
    let mut conn = connection();
    assert!(conn.target().is_none());
    conn.handle(b"CONNECT example.com:443 HTTP/1.1\r\n")
        .expect("must dispatch");
    let target = conn.target().expect("target must be set");
    assert_eq!(target.host, "example.com");
    assert_eq!(target.port, 443);
}
