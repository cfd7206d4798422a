use crate::error::DispatchError;

pub const DEFAULT_HTTP_PORT: u16 = 80;

/// A resolved dispatch target. `host` is non-empty and `port` is in 1–65535.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPort {
    pub host: String,
    pub port: u16,
}

/// Parses an authority-form CONNECT target, `host:port` or `[v6]:port`.
/// Both parts are mandatory; there is no default port for tunnels.
pub fn parse_authority(target: &str) -> Result<HostPort, DispatchError> {
    if let Some(rest) = target.strip_prefix('[') {
        let (host, suffix) = rest
            .split_once(']')
            .ok_or(DispatchError::InvalidAuthority)?;
        if host.is_empty() {
            return Err(DispatchError::InvalidAuthority);
        }
        let port_text = suffix
            .strip_prefix(':')
            .ok_or(DispatchError::InvalidAuthority)?;
        return host_port(host, port_text, DispatchError::InvalidAuthority);
    }

    let (host, port_text) = target
        .rsplit_once(':')
        .ok_or(DispatchError::InvalidAuthority)?;
    if host.is_empty() || host.contains(':') {
        // unbracketed IPv6 literals are ambiguous
        return Err(DispatchError::InvalidAuthority);
    }
    host_port(host, port_text, DispatchError::InvalidAuthority)
}

/// Parses an absolute-URI request target, `scheme://host[:port][/path]`.
/// A port that is absent defaults to 80; an explicit empty port does not.
pub fn parse_absolute_uri(target: &str) -> Result<HostPort, DispatchError> {
    let (scheme, rest) = target.split_once("://").ok_or(DispatchError::InvalidUri)?;
    if scheme.is_empty() {
        return Err(DispatchError::InvalidUri);
    }

    let authority_end = rest
        .find(|c| matches!(c, '/' | '?' | '#'))
        .unwrap_or(rest.len());
    let authority = &rest[..authority_end];
    if authority.is_empty() {
        return Err(DispatchError::InvalidUri);
    }

    if let Some(v6) = authority.strip_prefix('[') {
        let (host, suffix) = v6.split_once(']').ok_or(DispatchError::InvalidUri)?;
        if host.is_empty() {
            return Err(DispatchError::InvalidUri);
        }
        return match suffix.strip_prefix(':') {
            Some(port_text) => host_port(host, port_text, DispatchError::InvalidUri),
            None if suffix.is_empty() => Ok(HostPort {
                host: host.to_string(),
                port: DEFAULT_HTTP_PORT,
            }),
            None => Err(DispatchError::InvalidUri),
        };
    }

    match authority.rsplit_once(':') {
        Some((host, port_text)) => {
            if host.is_empty() || host.contains(':') {
                return Err(DispatchError::InvalidUri);
            }
            host_port(host, port_text, DispatchError::InvalidUri)
        }
        None => Ok(HostPort {
            host: authority.to_string(),
            port: DEFAULT_HTTP_PORT,
        }),
    }
}

fn host_port(host: &str, port_text: &str, error: DispatchError) -> Result<HostPort, DispatchError> {
    let port = port_text.parse::<u16>().map_err(|_| error)?;
    if port == 0 {
        return Err(error);
    }
    Ok(HostPort {
        host: host.to_string(),
        port,
    })
}
