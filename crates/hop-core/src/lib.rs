//! Inbound protocol dispatch for a single-hop forward proxy: scan the first
//! request line of an accepted connection, decide between a CONNECT tunnel
//! and a forwarded absolute-URI request, then hand the connection to a raw
//! byte relay. This crate is runtime-independent and performs no I/O.

mod config;
mod dispatch;
mod error;
mod scan;
mod target;
mod tokenize;

pub use config::{
    DispatchConfig, DispatchConfigError, DEFAULT_MAX_ESTABLISHING_BUFFER_BYTES,
    DEFAULT_MAX_LINE_BYTES,
};
pub use dispatch::{Connection, DispatchAction, Phase, CONNECT_METHOD};
pub use error::DispatchError;
pub use scan::{LineScanner, ScanResult};
pub use target::{parse_absolute_uri, parse_authority, HostPort, DEFAULT_HTTP_PORT};
pub use tokenize::{tokenize, RequestLine};
