use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use hop_core::{
    DispatchConfig, DispatchConfigError, DEFAULT_MAX_ESTABLISHING_BUFFER_BYTES,
    DEFAULT_MAX_LINE_BYTES,
};
use hop_observe::EventSink;
use tokio::net::TcpListener;

mod driver;
mod event_log;

pub use event_log::JsonLineSink;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidecarConfig {
    pub listen_addr: String,
    pub listen_port: u16,
    pub max_line_bytes: usize,
    pub max_establishing_buffer_bytes: usize,
}

impl Default for SidecarConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1".to_string(),
            listen_port: 8080,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            max_establishing_buffer_bytes: DEFAULT_MAX_ESTABLISHING_BUFFER_BYTES,
        }
    }
}

impl SidecarConfig {
    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            max_line_bytes: self.max_line_bytes,
            max_establishing_buffer_bytes: self.max_establishing_buffer_bytes,
        }
    }
}

/// Accepts client connections and drives each one through the dispatch core
/// on its own task. One flow id per connection, allocated from an atomic
/// counter.
pub struct SidecarServer<S>
where
    S: EventSink + 'static,
{
    config: SidecarConfig,
    sink: Arc<S>,
    next_flow_id: AtomicU64,
}

impl<S> SidecarServer<S>
where
    S: EventSink + 'static,
{
    pub fn new(config: SidecarConfig, sink: S) -> Result<Self, DispatchConfigError> {
        config.dispatch_config().validate()?;
        Ok(Self {
            config,
            sink: Arc::new(sink),
            next_flow_id: AtomicU64::new(1),
        })
    }

    pub async fn bind_listener(&self) -> io::Result<TcpListener> {
        TcpListener::bind((self.config.listen_addr.as_str(), self.config.listen_port)).await
    }

    pub async fn run(self) -> io::Result<()> {
        let listener = self.bind_listener().await?;
        self.run_with_listener(listener).await
    }

    pub async fn run_with_listener(self, listener: TcpListener) -> io::Result<()> {
        loop {
            let (stream, peer_addr) = listener.accept().await?;
            let flow_id = self.next_flow_id.fetch_add(1, Ordering::Relaxed);
            let sink = Arc::clone(&self.sink);
            let config = self.config.clone();
            tokio::spawn(async move {
                let _ = driver::drive_connection(sink, config, stream, peer_addr, flow_id).await;
            });
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CloseReasonCode {
    DispatchFailed,
    UpstreamConnectFailed,
    ClientClosed,
    RelayEof,
    RelayError,
}

impl CloseReasonCode {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::DispatchFailed => "dispatch_failed",
            Self::UpstreamConnectFailed => "upstream_connect_failed",
            Self::ClientClosed => "client_closed",
            Self::RelayEof => "relay_eof",
            Self::RelayError => "relay_error",
        }
    }
}
