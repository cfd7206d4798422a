use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use hop_core::{Connection, DispatchAction, DispatchError, HostPort};
use hop_observe::{DispatchMode, Event, EventSink, EventType, FlowContext};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::{CloseReasonCode, SidecarConfig};

const IO_CHUNK_SIZE: usize = 8 * 1024;
const CONNECT_ESTABLISHED_RESPONSE: &[u8] = b"HTTP/1.1 200 Connection Established\r\n\r\n";

pub(crate) async fn drive_connection<S>(
    sink: Arc<S>,
    config: SidecarConfig,
    mut client: TcpStream,
    peer_addr: SocketAddr,
    flow_id: u64,
) -> io::Result<()>
where
    S: EventSink + 'static,
{
    let client_addr = peer_addr.to_string();
    sink.emit(Event::new(
        EventType::ConnectionAccepted,
        FlowContext::undecided(flow_id, client_addr.clone()),
    ));

    let mut conn = Connection::new(&config.dispatch_config());
    let mut chunk = [0_u8; IO_CHUNK_SIZE];

    // feed inbound chunks to the dispatcher until it picks a target
    let target = loop {
        let read = match client.read(&mut chunk).await {
            Ok(read) => read,
            Err(error) => {
                emit_stream_closed(
                    &sink,
                    FlowContext::undecided(flow_id, client_addr.clone()),
                    CloseReasonCode::ClientClosed,
                    Some(error.to_string()),
                    None,
                );
                return Err(error);
            }
        };
        if read == 0 {
            emit_stream_closed(
                &sink,
                FlowContext::undecided(flow_id, client_addr.clone()),
                CloseReasonCode::ClientClosed,
                None,
                None,
            );
            return Ok(());
        }
        match conn.handle(&chunk[..read]) {
            Ok(actions) => {
                if let Some(target) = opened_target(&actions) {
                    break target;
                }
            }
            Err(error) => {
                emit_dispatch_failed(
                    &sink,
                    FlowContext::undecided(flow_id, client_addr.clone()),
                    error,
                );
                return Ok(());
            }
        }
    };

    let mode = if conn.is_tunnel() {
        DispatchMode::Tunnel
    } else {
        DispatchMode::Forward
    };
    let context = FlowContext {
        flow_id,
        client_addr: client_addr.clone(),
        server_host: target.host.clone(),
        server_port: target.port,
        mode,
    };
    sink.emit(Event::new(EventType::LineDispatched, context.clone()));

    let mut upstream = match establish_upstream(&mut conn, &mut client, &target, &sink, &context)
        .await
    {
        Some(stream) => stream,
        None => return Ok(()),
    };

    for action in conn.downstream_opened() {
        match action {
            DispatchAction::MarkTunnel => {
                // collaborator-side decision; the core never assumes it
                client.write_all(CONNECT_ESTABLISHED_RESPONSE).await?;
            }
            DispatchAction::WriteDownstream(bytes) => upstream.write_all(&bytes).await?,
            DispatchAction::OpenDownstream(_) => {
                debug_assert!(false, "OpenDownstream after the link is established");
            }
        }
    }

    let established = match mode {
        DispatchMode::Tunnel => EventType::TunnelEstablished,
        _ => EventType::ForwardEstablished,
    };
    sink.emit(Event::new(established, context.clone()));

    match tokio::io::copy_bidirectional(&mut client, &mut upstream).await {
        Ok((from_client, from_server)) => {
            emit_stream_closed(
                &sink,
                context,
                CloseReasonCode::RelayEof,
                None,
                Some((from_client, from_server)),
            );
            Ok(())
        }
        Err(error) => {
            emit_stream_closed(
                &sink,
                context,
                CloseReasonCode::RelayError,
                Some(error.to_string()),
                None,
            );
            Err(error)
        }
    }
}

/// Opens the upstream connection without blocking the client side: bytes
/// arriving meanwhile keep flowing into the dispatcher's establishing
/// buffer. A client that goes away aborts the attempt by dropping the
/// connect future.
async fn establish_upstream<S>(
    conn: &mut Connection,
    client: &mut TcpStream,
    target: &HostPort,
    sink: &Arc<S>,
    context: &FlowContext,
) -> Option<TcpStream>
where
    S: EventSink + 'static,
{
    let connect = TcpStream::connect((target.host.as_str(), target.port));
    tokio::pin!(connect);
    let mut chunk = [0_u8; IO_CHUNK_SIZE];

    loop {
        tokio::select! {
            result = &mut connect => {
                return match result {
                    Ok(stream) => Some(stream),
                    Err(error) => {
                        let failure = conn.downstream_open_failed();
                        emit_stream_closed(
                            sink,
                            context.clone(),
                            CloseReasonCode::UpstreamConnectFailed,
                            Some(format!("{}: {error}", failure.code())),
                            None,
                        );
                        None
                    }
                };
            }
            read = client.read(&mut chunk) => {
                match read {
                    Ok(0) | Err(_) => {
                        conn.client_closed();
                        emit_stream_closed(
                            sink,
                            context.clone(),
                            CloseReasonCode::ClientClosed,
                            None,
                            None,
                        );
                        return None;
                    }
                    Ok(read) => {
                        if let Err(error) = conn.handle(&chunk[..read]) {
                            emit_dispatch_failed(sink, context.clone(), error);
                            return None;
                        }
                    }
                }
            }
        }
    }
}

fn opened_target(actions: &[DispatchAction]) -> Option<HostPort> {
    actions.iter().find_map(|action| match action {
        DispatchAction::OpenDownstream(target) => Some(target.clone()),
        _ => None,
    })
}

fn emit_dispatch_failed<S>(sink: &Arc<S>, context: FlowContext, error: DispatchError)
where
    S: EventSink + 'static,
{
    sink.emit(
        Event::new(EventType::DispatchFailed, context.clone())
            .with_attribute("error_code", error.code()),
    );
    emit_stream_closed(
        sink,
        context,
        CloseReasonCode::DispatchFailed,
        Some(error.code().to_string()),
        None,
    );
}

fn emit_stream_closed<S>(
    sink: &Arc<S>,
    context: FlowContext,
    reason: CloseReasonCode,
    detail: Option<String>,
    bytes_relayed: Option<(u64, u64)>,
) where
    S: EventSink + 'static,
{
    let mut event = Event::new(EventType::StreamClosed, context)
        .with_attribute("reason_code", reason.as_str());
    if let Some(detail) = detail {
        event = event.with_attribute("detail", detail);
    }
    if let Some((from_client, from_server)) = bytes_relayed {
        event = event
            .with_attribute("bytes_from_client", from_client.to_string())
            .with_attribute("bytes_from_server", from_server.to_string());
    }
    sink.emit(event);
}
