use tracing::debug;

use crate::client::{Discovery, DiscoveryClient};
use crate::config::DiscoveryConfig;
use crate::error::BootstrapError;
use crate::net::split_host_port;
use crate::service::ServiceEndpoint;

/// Name [`register_self`] advertises the calling process under.
pub const SELF_SERVICE_NAME: &str = "exception-service";

/// Fire-and-forget registration of this process.
///
/// This function:
/// - Splits `external_address` (`host:port` or `[v6]:port`)
/// - Builds a client for the backend at `backend_address`
/// - Attaches a gRPC health check on the advertised endpoint
/// - Registers it as [`SELF_SERVICE_NAME`]
pub async fn register_self(
    backend_address: &str,
    external_address: &str,
) -> Result<(), BootstrapError> {
    register_service(
        &DiscoveryConfig::new(backend_address),
        SELF_SERVICE_NAME,
        external_address,
    )
    .await
}

/// Same as [`register_self`] for an explicit service name and full config.
pub async fn register_service(
    config: &DiscoveryConfig,
    service: &str,
    external_address: &str,
) -> Result<(), BootstrapError> {
    let (host, port) =
        split_host_port(external_address).map_err(|source| BootstrapError::InvalidAddress {
            address: external_address.to_string(),
            source,
        })?;

    let client = DiscoveryClient::from_config(config).map_err(|source| BootstrapError::Connect {
        backend: config.address.clone(),
        source,
    })?;

    let check = client.grpc_health_check(service, &host, port);

    debug!("Registering {} at {} with backend {}", service, external_address, config.address);

    client
        .register(service, &host, port, check)
        .await
        .map_err(|source| BootstrapError::Register {
            service: service.to_string(),
            address: external_address.to_string(),
            source,
        })
}

/// Resolve `service` to a healthy endpoint via the backend at
/// `backend_address`, accepting any tag.
pub async fn lookup_service(
    backend_address: &str,
    service: &str,
) -> Result<ServiceEndpoint, BootstrapError> {
    let client =
        DiscoveryClient::connect(backend_address).map_err(|source| BootstrapError::Connect {
            backend: backend_address.to_string(),
            source,
        })?;

    client
        .lookup(service, None)
        .await
        .map_err(|source| BootstrapError::Lookup {
            service: service.to_string(),
            source,
        })
}
