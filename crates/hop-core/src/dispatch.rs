use std::mem;

use crate::config::DispatchConfig;
use crate::error::DispatchError;
use crate::scan::{LineScanner, ScanResult};
use crate::target::{parse_absolute_uri, parse_authority, HostPort};
use crate::tokenize::tokenize;

pub const CONNECT_METHOD: &str = "CONNECT";

/// Connection phases. Transitions are monotonic:
/// `AwaitingLine -> Establishing -> (Tunneling | Forwarding)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingLine,
    Establishing,
    Tunneling,
    Forwarding,
}

/// Commands issued to the downstream connector. The dispatcher never touches
/// a socket itself; the runtime applies these in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchAction {
    /// Open an outbound connection to the target. Issued at most once.
    OpenDownstream(HostPort),
    /// Declare the link a raw byte tunnel with no further HTTP framing.
    MarkTunnel,
    /// Append bytes to the outbound stream, preserving call order.
    WriteDownstream(Vec<u8>),
}

/// Per-connection dispatch state. Created fresh for every accepted
/// connection and owned exclusively by it.
///
/// `handle` is the runtime-independent transition function: the runtime
/// feeds it each inbound chunk in arrival order and applies the returned
/// actions. `downstream_opened` / `downstream_open_failed` deliver the
/// asynchronous outcome of `OpenDownstream`. Every error is terminal for
/// the connection.
#[derive(Debug)]
pub struct Connection {
    phase: Phase,
    scanner: LineScanner,
    /// Raw bytes received while awaiting the request line, kept so a
    /// forwarded request replays exactly what the client sent.
    head_raw: Vec<u8>,
    /// Bytes owed to the downstream once it opens.
    pending: Vec<u8>,
    tunnel: bool,
    target: Option<HostPort>,
    max_establishing_buffer_bytes: usize,
}

impl Connection {
    pub fn new(config: &DispatchConfig) -> Self {
        Self {
            phase: Phase::AwaitingLine,
            scanner: LineScanner::new(config.max_line_bytes),
            head_raw: Vec::new(),
            pending: Vec::new(),
            tunnel: false,
            target: None,
            max_establishing_buffer_bytes: config.max_establishing_buffer_bytes,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The dispatch target, available once a request line has been consumed.
    pub fn target(&self) -> Option<&HostPort> {
        self.target.as_ref()
    }

    /// Whether the connection dispatched as a tunnel. Meaningful only after
    /// the phase has left `AwaitingLine`.
    pub fn is_tunnel(&self) -> bool {
        self.tunnel
    }

    pub fn handle(&mut self, input: &[u8]) -> Result<Vec<DispatchAction>, DispatchError> {
        match self.phase {
            Phase::AwaitingLine => {
                self.head_raw.extend_from_slice(input);
                match self.scanner.consume(input) {
                    ScanResult::Incomplete => Ok(Vec::new()),
                    ScanResult::TooLong => Err(DispatchError::LineTooLong),
                    ScanResult::Line { content, consumed } => {
                        self.dispatch_line(&content, &input[consumed..])
                    }
                }
            }
            Phase::Establishing => {
                if self.pending.len() + input.len() > self.max_establishing_buffer_bytes {
                    return Err(DispatchError::EstablishingBacklogExceeded);
                }
                self.pending.extend_from_slice(input);
                Ok(Vec::new())
            }
            Phase::Tunneling | Phase::Forwarding => {
                Ok(vec![DispatchAction::WriteDownstream(input.to_vec())])
            }
        }
    }

    fn dispatch_line(
        &mut self,
        line: &[u8],
        remainder: &[u8],
    ) -> Result<Vec<DispatchAction>, DispatchError> {
        let request = tokenize(line)?;
        let target = if request.method == CONNECT_METHOD {
            let target = parse_authority(&request.target)?;
            // the CONNECT line itself is never written downstream
            self.tunnel = true;
            self.pending = remainder.to_vec();
            self.head_raw = Vec::new();
            target
        } else {
            let target = parse_absolute_uri(&request.target)?;
            // replay the head exactly as received, remainder included
            self.tunnel = false;
            self.pending = mem::take(&mut self.head_raw);
            target
        };
        self.phase = Phase::Establishing;
        self.target = Some(target.clone());
        Ok(vec![DispatchAction::OpenDownstream(target)])
    }

    /// The downstream connection opened. Transitions to the terminal phase
    /// and flushes everything buffered while establishing.
    pub fn downstream_opened(&mut self) -> Vec<DispatchAction> {
        if self.phase != Phase::Establishing {
            debug_assert!(
                false,
                "downstream_opened outside Establishing: phase={:?}",
                self.phase
            );
            return Vec::new();
        }

        let mut actions = Vec::new();
        if self.tunnel {
            self.phase = Phase::Tunneling;
            actions.push(DispatchAction::MarkTunnel);
        } else {
            self.phase = Phase::Forwarding;
        }
        let pending = mem::take(&mut self.pending);
        if !pending.is_empty() {
            actions.push(DispatchAction::WriteDownstream(pending));
        }
        actions
    }

    /// The downstream open attempt failed. Terminal; buffered bytes are
    /// dropped so nothing reaches a half-established downstream.
    pub fn downstream_open_failed(&mut self) -> DispatchError {
        self.pending = Vec::new();
        DispatchError::DownstreamConnectFailure
    }

    /// The client went away. Releases buffered bytes; the runtime aborts
    /// any in-flight connect attempt.
    pub fn client_closed(&mut self) {
        self.pending = Vec::new();
    }
}
