//! Consul HTTP API backend.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::backend::DiscoveryBackend;
use crate::config::DiscoveryConfig;
use crate::error::{BackendError, DiscoveryError, Result};
use crate::service::{ServiceInstance, ServiceRegistration};

/// Talks to a Consul agent over HTTP.
///
/// Construction does no I/O; each call is an independent request on a pooled
/// `reqwest::Client`, so one handle can be shared across tasks.
#[derive(Debug, Clone)]
pub struct ConsulBackend {
    http: Client,
    base_url: Url,
}

impl ConsulBackend {
    /// `address` is `host:port` or an `http(s)://` URL.
    pub fn new(address: &str) -> Result<Self> {
        Self::from_config(&DiscoveryConfig::new(address))
    }

    pub fn from_config(config: &DiscoveryConfig) -> Result<Self> {
        let base_url = parse_base_url(&config.address)?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|e| {
            DiscoveryError::Configuration(format!("failed to build HTTP client: {}", e))
        })?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> std::result::Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                BackendError::Unavailable(format!("{} cannot be used as a base URL", self.base_url))
            })?
            .pop_if_empty()
            .push("v1")
            .extend(segments);
        Ok(url)
    }
}

fn parse_base_url(address: &str) -> Result<Url> {
    let address = address.trim();
    if address.is_empty() {
        return Err(DiscoveryError::Configuration(
            "backend address is empty".to_string(),
        ));
    }

    let raw = if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    };

    let url = Url::parse(&raw).map_err(|e| {
        DiscoveryError::Configuration(format!("invalid backend address {:?}: {}", address, e))
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(DiscoveryError::Configuration(format!(
            "unsupported scheme {:?} in backend address {:?}",
            url.scheme(),
            address
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(DiscoveryError::Configuration(format!(
            "backend address {:?} has no host",
            address
        )));
    }

    Ok(url)
}

async fn ensure_success(response: Response) -> std::result::Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(BackendError::Status {
        status: status.as_u16(),
        body,
    })
}

#[derive(Debug, Deserialize)]
struct HealthEntry {
    #[serde(rename = "Service")]
    service: AgentService,
}

#[derive(Debug, Deserialize)]
struct AgentService {
    #[serde(rename = "Address", default)]
    address: String,
    #[serde(rename = "Port", default)]
    port: i64,
    #[serde(rename = "Tags", default)]
    tags: Option<Vec<String>>,
}

impl From<HealthEntry> for ServiceInstance {
    fn from(entry: HealthEntry) -> Self {
        ServiceInstance {
            address: entry.service.address,
            port: entry.service.port,
            tags: entry.service.tags.unwrap_or_default(),
        }
    }
}

#[async_trait]
impl DiscoveryBackend for ConsulBackend {
    async fn register_service(
        &self,
        registration: &ServiceRegistration,
    ) -> std::result::Result<(), BackendError> {
        let url = self.endpoint(&["agent", "service", "register"])?;

        debug!("Registering service {} at {}", registration.id, url);

        let response = self.http.put(url).json(registration).send().await?;
        ensure_success(response).await?;

        Ok(())
    }

    async fn passing_instances(
        &self,
        service: &str,
        tag: Option<&str>,
    ) -> std::result::Result<Vec<ServiceInstance>, BackendError> {
        let url = self.endpoint(&["health", "service", service])?;

        debug!("Querying passing instances of {} (tag: {:?})", service, tag);

        let mut request = self.http.get(url).query(&[("passing", "true")]);
        if let Some(tag) = tag {
            request = request.query(&[("tag", tag)]);
        }

        let response = ensure_success(request.send().await?).await?;
        let body = response.bytes().await?;
        let entries: Vec<HealthEntry> = serde_json::from_slice(&body)?;

        debug!("Backend returned {} passing instances of {}", entries.len(), service);

        Ok(entries.into_iter().map(ServiceInstance::from).collect())
    }
}
