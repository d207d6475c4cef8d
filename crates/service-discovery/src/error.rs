use thiserror::Error;

use crate::net::AddrError;

/// Failure of a single exchange with the discovery backend.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend responded with HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed backend response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("failed to register service {id}: {source}")]
    Registration {
        id: String,
        #[source]
        source: BackendError,
    },

    #[error("failed to query backend for service {service}: {source}")]
    BackendQuery {
        service: String,
        #[source]
        source: BackendError,
    },

    #[error("service ( {service} ) was not found")]
    ServiceNotFound { service: String },

    #[error("could not resolve host:port for service {service}")]
    ServiceUnresolvable { service: String },
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;

/// Errors of the convenience entry points in [`crate::bootstrap`], tagged
/// with the step that failed.
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("cannot split host:port in {address}: {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: AddrError,
    },

    #[error("failed to set up discovery client for {backend}: {source}")]
    Connect {
        backend: String,
        #[source]
        source: DiscoveryError,
    },

    #[error("failed to register service {service} at {address}: {source}")]
    Register {
        service: String,
        address: String,
        #[source]
        source: DiscoveryError,
    },

    #[error("failed to lookup service {service}: {source}")]
    Lookup {
        service: String,
        #[source]
        source: DiscoveryError,
    },
}

impl BootstrapError {
    /// The discovery error underneath, if the failure came from the client.
    pub fn discovery_error(&self) -> Option<&DiscoveryError> {
        match self {
            BootstrapError::InvalidAddress { .. } => None,
            BootstrapError::Connect { source, .. }
            | BootstrapError::Register { source, .. }
            | BootstrapError::Lookup { source, .. } => Some(source),
        }
    }
}
