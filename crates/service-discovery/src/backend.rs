use async_trait::async_trait;
use std::sync::Arc;

use crate::error::BackendError;
use crate::service::{ServiceInstance, ServiceRegistration};

/// Raw exchange with a discovery backend.
///
/// Implementations do no policy of their own: they submit what they are
/// given and return instances in the order the backend reports them.
#[async_trait]
pub trait DiscoveryBackend: Send + Sync {
    /// Upsert a registration keyed by its id.
    async fn register_service(&self, registration: &ServiceRegistration) -> Result<(), BackendError>;

    /// Instances of `service` whose health checks are all passing, optionally
    /// restricted to those carrying `tag`.
    async fn passing_instances(
        &self,
        service: &str,
        tag: Option<&str>,
    ) -> Result<Vec<ServiceInstance>, BackendError>;
}

#[async_trait]
impl<B> DiscoveryBackend for Arc<B>
where
    B: DiscoveryBackend + ?Sized,
{
    async fn register_service(&self, registration: &ServiceRegistration) -> Result<(), BackendError> {
        (**self).register_service(registration).await
    }

    async fn passing_instances(
        &self,
        service: &str,
        tag: Option<&str>,
    ) -> Result<Vec<ServiceInstance>, BackendError> {
        (**self).passing_instances(service, tag).await
    }
}
