use std::time::Duration;

use hop_observe::{DispatchMode, Event, EventType, VecEventSink};
use hop_sidecar::{SidecarConfig, SidecarServer};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream};

async fn start_sidecar(sink: VecEventSink) -> std::net::SocketAddr {
    let config = SidecarConfig {
        listen_addr: "127.0.0.1".to_string(),
        listen_port: 0,
        ..SidecarConfig::default()
    };
    start_sidecar_with_config(sink, config).await
}

async fn start_sidecar_with_config(
    sink: VecEventSink,
    config: SidecarConfig,
) -> std::net::SocketAddr {
    let server = SidecarServer::new(config, sink).expect("build sidecar");
    let listener = server.bind_listener().await.expect("bind sidecar");
    let addr = listener.local_addr().expect("listener local addr");
    tokio::spawn(server.run_with_listener(listener));
    addr
}

/// A target whose accept queue is saturated: backlog of one, never
/// accepted, queue held by filler connections, so further connect attempts
/// stay pending. The listener and fillers must be kept alive by the caller.
async fn start_unresponsive_target() -> (std::net::SocketAddr, TcpListener, Vec<TcpStream>) {
    let socket = TcpSocket::new_v4().expect("create target socket");
    socket
        .bind("127.0.0.1:0".parse().expect("loopback addr"))
        .expect("bind target");
    let listener = socket.listen(1).expect("listen with minimal backlog");
    let addr = listener.local_addr().expect("target addr");

    let mut fillers = Vec::new();
    for _ in 0..4 {
        match tokio::time::timeout(Duration::from_millis(200), TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => fillers.push(stream),
            _ => break,
        }
    }
    (addr, listener, fillers)
}

/// Echoes every received byte back and returns everything it saw.
async fn start_echo_upstream() -> (std::net::SocketAddr, tokio::task::JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind upstream");
    let addr = listener.local_addr().expect("upstream addr");
    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept upstream");
        let mut received = Vec::new();
        let mut buffer = [0_u8; 1024];
        loop {
            let read = stream.read(&mut buffer).await.expect("read upstream");
            if read == 0 {
                break;
            }
            received.extend_from_slice(&buffer[..read]);
            stream
                .write_all(&buffer[..read])
                .await
                .expect("echo upstream");
        }
        received
    });
    (addr, handle)
}

async fn read_response_head(stream: &mut TcpStream) -> String {
    let mut data = Vec::new();
    let mut buffer = [0_u8; 1024];
    while !data.windows(4).any(|window| window == b"\r\n\r\n") {
        let read = stream.read(&mut buffer).await.expect("read response head");
        if read == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..read]);
    }
    String::from_utf8_lossy(&data).to_string()
}

async fn wait_for_stream_closed(sink: &VecEventSink) -> Vec<Event> {
    for _ in 0..250 {
        let events = sink.snapshot();
        if events
            .iter()
            .any(|event| event.kind == EventType::StreamClosed)
        {
            return events;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("timed out waiting for a StreamClosed event");
}

#[tokio::test]
async fn connect_tunnel_relays_bytes_and_withholds_the_connect_line() {
    let sink = VecEventSink::default();
    let proxy_addr = start_sidecar(sink.clone()).await;
    let (upstream_addr, upstream) = start_echo_upstream().await;

    let mut client = TcpStream::connect(proxy_addr).await.expect("connect proxy");
    let request = format!("CONNECT {upstream_addr} HTTP/1.1\r\n");
    client
        .write_all(request.as_bytes())
        .await
        .expect("write connect");

    let head = read_response_head(&mut client).await;
    assert!(
        head.starts_with("HTTP/1.1 200 Connection Established"),
        "unexpected response head: {head:?}"
    );

    client.write_all(b"ping").await.expect("write tunnel bytes");
    let mut echoed = [0_u8; 4];
    client.read_exact(&mut echoed).await.expect("read echo");
    assert_eq!(&echoed, b"ping");

    drop(client);
    let received = upstream.await.expect("upstream task");
    // the CONNECT line itself never reached the upstream
    assert_eq!(received, b"ping");
}

#[tokio::test]
async fn forwarded_request_replays_the_original_bytes_verbatim() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind upstream");
    let upstream_addr = listener.local_addr().expect("upstream addr");
    let upstream = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept upstream");
        let mut head = Vec::new();
        let mut buffer = [0_u8; 1024];
        while !head.windows(4).any(|window| window == b"\r\n\r\n") {
            let read = stream.read(&mut buffer).await.expect("read request head");
            if read == 0 {
                break;
            }
            head.extend_from_slice(&buffer[..read]);
        }
        stream
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok")
            .await
            .expect("write response");
        head
    });

    let sink = VecEventSink::default();
    let proxy_addr = start_sidecar(sink.clone()).await;
    let mut client = TcpStream::connect(proxy_addr).await.expect("connect proxy");

    let request = format!(
        "GET http://{upstream_addr}/path HTTP/1.1\r\nHost: {upstream_addr}\r\nConnection: close\r\n\r\n"
    );
    client
        .write_all(request.as_bytes())
        .await
        .expect("write request");

    let mut response = Vec::new();
    client
        .read_to_end(&mut response)
        .await
        .expect("read response");
    let response = String::from_utf8_lossy(&response);
    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert!(response.ends_with("ok"));

    // request line included, byte for byte
    let received = upstream.await.expect("upstream task");
    assert_eq!(received, request.as_bytes());
}

#[tokio::test]
async fn request_line_split_across_writes_still_dispatches() {
    let sink = VecEventSink::default();
    let proxy_addr = start_sidecar(sink.clone()).await;
    let (upstream_addr, _upstream) = start_echo_upstream().await;

    let mut client = TcpStream::connect(proxy_addr).await.expect("connect proxy");
    let request = format!("CONNECT {upstream_addr} HTTP/1.1\r\n");
    let bytes = request.as_bytes();
    let split_at = bytes.len() / 2;

    client
        .write_all(&bytes[..split_at])
        .await
        .expect("write first fragment");
    tokio::time::sleep(Duration::from_millis(50)).await;
    client
        .write_all(&bytes[split_at..])
        .await
        .expect("write second fragment");

    let head = read_response_head(&mut client).await;
    assert!(
        head.starts_with("HTTP/1.1 200 Connection Established"),
        "unexpected response head: {head:?}"
    );
}

#[tokio::test]
async fn upstream_connect_failure_closes_the_client_without_a_response() {
    let sink = VecEventSink::default();
    let proxy_addr = start_sidecar(sink.clone()).await;

    // bind and drop to get a port with no listener
    let reserved = TcpListener::bind("127.0.0.1:0").await.expect("reserve port");
    let target = reserved.local_addr().expect("target addr");
    drop(reserved);

    let mut client = TcpStream::connect(proxy_addr).await.expect("connect proxy");
    client
        .write_all(format!("CONNECT {target} HTTP/1.1\r\n").as_bytes())
        .await
        .expect("write connect");

    let mut response = Vec::new();
    client
        .read_to_end(&mut response)
        .await
        .expect("read to eof");
    assert!(response.is_empty());

    let events = wait_for_stream_closed(&sink).await;
    let closed = events
        .iter()
        .find(|event| event.kind == EventType::StreamClosed)
        .expect("stream closed event");
    assert_eq!(
        closed.attributes.get("reason_code").map(String::as_str),
        Some("upstream_connect_failed")
    );
}

#[tokio::test]
async fn malformed_request_line_closes_the_client_without_a_response() {
    let sink = VecEventSink::default();
    let proxy_addr = start_sidecar(sink.clone()).await;

    let mut client = TcpStream::connect(proxy_addr).await.expect("connect proxy");
    client
        .write_all(b"GET \x1chttp://x.com/ HTTP/1.1\r\n")
        .await
        .expect("write malformed request");

    let mut response = Vec::new();
    client
        .read_to_end(&mut response)
        .await
        .expect("read to eof");
    assert!(response.is_empty());

    let events = wait_for_stream_closed(&sink).await;
    let failed = events
        .iter()
        .find(|event| event.kind == EventType::DispatchFailed)
        .expect("dispatch failed event");
    assert_eq!(
        failed.attributes.get("error_code").map(String::as_str),
        Some("malformed_request_line")
    );
}

#[tokio::test]
async fn tunnel_flow_emits_lifecycle_events_in_order() {
    let sink = VecEventSink::default();
    let proxy_addr = start_sidecar(sink.clone()).await;
    let (upstream_addr, upstream) = start_echo_upstream().await;

    let mut client = TcpStream::connect(proxy_addr).await.expect("connect proxy");
    client
        .write_all(format!("CONNECT {upstream_addr} HTTP/1.1\r\n").as_bytes())
        .await
        .expect("write connect");
    let head = read_response_head(&mut client).await;
    assert!(head.starts_with("HTTP/1.1 200 Connection Established"));

    client.write_all(b"ping").await.expect("write tunnel bytes");
    let mut echoed = [0_u8; 4];
    client.read_exact(&mut echoed).await.expect("read echo");

    drop(client);
    upstream.await.expect("upstream task");

    let events = wait_for_stream_closed(&sink).await;
    let kinds: Vec<EventType> = events.iter().map(|event| event.kind).collect();
    assert_eq!(
        kinds,
        vec![
            EventType::ConnectionAccepted,
            EventType::LineDispatched,
            EventType::TunnelEstablished,
            EventType::StreamClosed,
        ]
    );

    let dispatched = &events[1];
    assert_eq!(dispatched.context.mode, DispatchMode::Tunnel);
    assert_eq!(dispatched.context.server_host, upstream_addr.ip().to_string());
    assert_eq!(dispatched.context.server_port, upstream_addr.port());

    let closed = &events[3];
    assert_eq!(
        closed.attributes.get("reason_code").map(String::as_str),
        Some("relay_eof")
    );
    assert_eq!(
        closed.attributes.get("bytes_from_client").map(String::as_str),
        Some("4")
    );
    assert_eq!(
        closed.attributes.get("bytes_from_server").map(String::as_str),
        Some("4")
    );
}

#[tokio::test]
async fn client_disconnect_while_establishing_aborts_the_connect() {
    let sink = VecEventSink::default();
    let proxy_addr = start_sidecar(sink.clone()).await;
    let (target_addr, _target, _fillers) = start_unresponsive_target().await;

    let mut client = TcpStream::connect(proxy_addr).await.expect("connect proxy");
    client
        .write_all(format!("CONNECT {target_addr} HTTP/1.1\r\n").as_bytes())
        .await
        .expect("write connect");
    client
        .write_all(b"early bytes")
        .await
        .expect("write early bytes");
    tokio::time::sleep(Duration::from_millis(100)).await;
    drop(client);

    let events = wait_for_stream_closed(&sink).await;
    assert!(events
        .iter()
        .all(|event| event.kind != EventType::TunnelEstablished));
    let closed = events
        .iter()
        .find(|event| event.kind == EventType::StreamClosed)
        .expect("stream closed event");
    assert_eq!(
        closed.attributes.get("reason_code").map(String::as_str),
        Some("client_closed")
    );
}

#[tokio::test]
async fn abortive_client_close_before_dispatch_still_emits_stream_closed() {
    let sink = VecEventSink::default();
    let proxy_addr = start_sidecar(sink.clone()).await;

    let client = TcpStream::connect(proxy_addr).await.expect("connect proxy");
    client
        .set_linger(Some(Duration::from_secs(0)))
        .expect("set linger");
    tokio::time::sleep(Duration::from_millis(50)).await;
    drop(client);

    let events = wait_for_stream_closed(&sink).await;
    let closed = events
        .iter()
        .find(|event| event.kind == EventType::StreamClosed)
        .expect("stream closed event");
    assert_eq!(
        closed.attributes.get("reason_code").map(String::as_str),
        Some("client_closed")
    );
}

#[tokio::test]
async fn backlog_overflow_while_establishing_reports_dispatch_failed() {
    let sink = VecEventSink::default();
    let config = SidecarConfig {
        listen_addr: "127.0.0.1".to_string(),
        listen_port: 0,
        max_establishing_buffer_bytes: 16,
        ..SidecarConfig::default()
    };
    let proxy_addr = start_sidecar_with_config(sink.clone(), config).await;
    let (target_addr, _target, _fillers) = start_unresponsive_target().await;

    let mut client = TcpStream::connect(proxy_addr).await.expect("connect proxy");
    client
        .write_all(format!("CONNECT {target_addr} HTTP/1.1\r\n").as_bytes())
        .await
        .expect("write connect");
    tokio::time::sleep(Duration::from_millis(100)).await;
    client
        .write_all(&[0_u8; 64])
        .await
        .expect("write overflow bytes");

    let events = wait_for_stream_closed(&sink).await;
    let failed = events
        .iter()
        .find(|event| event.kind == EventType::DispatchFailed)
        .expect("dispatch failed event");
    assert_eq!(
        failed.attributes.get("error_code").map(String::as_str),
        Some("establishing_backlog_exceeded")
    );
    let closed = events
        .iter()
        .find(|event| event.kind == EventType::StreamClosed)
        .expect("stream closed event");
    assert_eq!(
        closed.attributes.get("reason_code").map(String::as_str),
        Some("dispatch_failed")
    );
}
