use thiserror::Error;

/// Everything that can end a connection during dispatch. All of these are
/// terminal: the connection is closed, nothing is retried, and no HTTP error
/// response is synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("request line exceeded the configured length limit")]
    LineTooLong,
    #[error("request line contains an invalid separator")]
    MalformedRequestLine,
    #[error("CONNECT target is not a valid host:port authority")]
    InvalidAuthority,
    #[error("request target is not a valid absolute URI")]
    InvalidUri,
    #[error("downstream connection could not be established")]
    DownstreamConnectFailure,
    #[error("client bytes buffered during establishment exceeded the configured limit")]
    EstablishingBacklogExceeded,
}

impl DispatchError {
    pub fn code(self) -> &'static str {
        match self {
            Self::LineTooLong => "line_too_long",
            Self::MalformedRequestLine => "malformed_request_line",
            Self::InvalidAuthority => "invalid_authority",
            Self::InvalidUri => "invalid_uri",
            Self::DownstreamConnectFailure => "downstream_connect_failure",
            Self::EstablishingBacklogExceeded => "establishing_backlog_exceeded",
        }
    }
}
