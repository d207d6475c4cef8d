use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddrError {
    #[error("missing port in address")]
    MissingPort,

    #[error("too many colons in address")]
    TooManyColons,

    #[error("missing ']' in address")]
    UnclosedBracket,

    #[error("empty host in address")]
    EmptyHost,

    #[error("invalid port {0:?}")]
    InvalidPort(String),
}

/// Joins a host and port into `host:port`, bracketing IPv6 literals.
pub fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// Splits `host:port` or `[v6]:port` into its parts. The port must be in
/// 1..=65535.
pub fn split_host_port(addr: &str) -> Result<(String, u16), AddrError> {
    let (host, port) = if let Some(rest) = addr.strip_prefix('[') {
        let (host, after) = rest.split_once(']').ok_or(AddrError::UnclosedBracket)?;
        let port = after.strip_prefix(':').ok_or(AddrError::MissingPort)?;
        (host, port)
    } else {
        let (host, port) = addr.rsplit_once(':').ok_or(AddrError::MissingPort)?;
        if host.contains(':') {
            return Err(AddrError::TooManyColons);
        }
        (host, port)
    };

    if host.is_empty() {
        return Err(AddrError::EmptyHost);
    }

    let port = match port.parse::<u16>() {
        Ok(p) if p > 0 => p,
        _ => return Err(AddrError::InvalidPort(port.to_string())),
    };

    Ok((host.to_string(), port))
}
