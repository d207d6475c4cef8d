use async_trait::async_trait;
use tracing::{debug, info};

use crate::backend::DiscoveryBackend;
use crate::config::{DiscoveryConfig, ProbeConfig};
use crate::consul::ConsulBackend;
use crate::error::{DiscoveryError, Result};
use crate::health::HealthCheck;
use crate::select::{FirstUsable, SelectionStrategy};
use crate::service::{ServiceEndpoint, ServiceInstance, ServiceRegistration};

/// Register-and-resolve capability an application component depends on.
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Advertise `address:port` under `service`, replacing any earlier
    /// registration of the same triple. Returns once the backend accepted
    /// it; the first probe runs later, on the backend's schedule.
    async fn register(
        &self,
        service: &str,
        address: &str,
        port: u16,
        check: HealthCheck,
    ) -> Result<()>;

    /// Resolve `service` to one instance currently passing its health
    /// checks. `None` or an empty tag matches any tag.
    async fn lookup(&self, service: &str, tag: Option<&str>) -> Result<ServiceEndpoint>;
}

/// [`Discovery`] on top of a [`DiscoveryBackend`].
///
/// Holds no per-call state, so a single client can be shared by reference
/// or behind an `Arc` across tasks.
#[derive(Debug)]
pub struct DiscoveryClient<B = ConsulBackend> {
    backend: B,
    strategy: Box<dyn SelectionStrategy>,
    probe: ProbeConfig,
}

impl DiscoveryClient<ConsulBackend> {
    /// Client for the Consul agent at `address`. No connection is made until
    /// the first call.
    pub fn connect(address: &str) -> Result<Self> {
        Self::from_config(&DiscoveryConfig::new(address))
    }

    pub fn from_config(config: &DiscoveryConfig) -> Result<Self> {
        let backend = ConsulBackend::from_config(config)?;
        Ok(Self::new(backend).with_probe(config.probe.clone()))
    }
}

impl<B: DiscoveryBackend> DiscoveryClient<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            strategy: Box::new(FirstUsable),
            probe: ProbeConfig::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: impl SelectionStrategy + 'static) -> Self {
        self.strategy = Box::new(strategy);
        self
    }

    pub fn with_probe(mut self, probe: ProbeConfig) -> Self {
        self.probe = probe;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// gRPC health check for an instance, using this client's probe settings.
    pub fn grpc_health_check(&self, service: &str, address: &str, port: u16) -> HealthCheck {
        HealthCheck::grpc_with(service, address, port, &self.probe)
    }
}

fn require(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DiscoveryError::Configuration(format!("{} must not be empty", what)));
    }
    Ok(())
}

#[async_trait]
impl<B: DiscoveryBackend> Discovery for DiscoveryClient<B> {
    async fn register(
        &self,
        service: &str,
        address: &str,
        port: u16,
        check: HealthCheck,
    ) -> Result<()> {
        require(service, "service name")?;
        require(address, "service address")?;
        if port == 0 {
            return Err(DiscoveryError::Configuration(format!(
                "port for service {} must be in 1..=65535",
                service
            )));
        }

        let registration = ServiceRegistration::new(service, address, port, check);

        self.backend
            .register_service(&registration)
            .await
            .map_err(|source| DiscoveryError::Registration {
                id: registration.id.clone(),
                source,
            })?;

        info!("Service {} registered as {}", service, registration.id);

        Ok(())
    }

    async fn lookup(&self, service: &str, tag: Option<&str>) -> Result<ServiceEndpoint> {
        require(service, "service name")?;
        let tag = tag.filter(|t| !t.is_empty());

        let instances = self
            .backend
            .passing_instances(service, tag)
            .await
            .map_err(|source| DiscoveryError::BackendQuery {
                service: service.to_string(),
                source,
            })?;

        if instances.is_empty() {
            return Err(DiscoveryError::ServiceNotFound {
                service: service.to_string(),
            });
        }

        let usable: Vec<ServiceEndpoint> = instances
            .iter()
            .filter_map(ServiceInstance::endpoint)
            .collect();

        let endpoint = self.strategy.select(&usable).cloned().ok_or_else(|| {
            DiscoveryError::ServiceUnresolvable {
                service: service.to_string(),
            }
        })?;

        debug!(
            "Resolved {} to {} ({} of {} instances usable)",
            service,
            endpoint,
            usable.len(),
            instances.len()
        );

        Ok(endpoint)
    }
}
