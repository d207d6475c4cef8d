use serde::{Deserialize, Serialize};
use std::fmt;

use crate::health::HealthCheck;
use crate::net::join_host_port;

/// Record submitted to the backend to advertise one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceRegistration {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "Port")]
    pub port: u16,
    #[serde(rename = "Check")]
    pub check: HealthCheck,
}

impl ServiceRegistration {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        port: u16,
        check: HealthCheck,
    ) -> Self {
        let name = name.into();
        let address = address.into();
        Self {
            id: registration_id(&name, &address, port),
            name,
            address,
            port,
            check,
        }
    }
}

/// Identifier for an instance: re-registering the same triple overwrites
/// the earlier entry instead of adding a second one.
pub fn registration_id(name: &str, address: &str, port: u16) -> String {
    format!("{}-{}:{}", name, address, port)
}

/// One row of a passing-only health query, in backend order.
///
/// The port is kept signed since the backend does not guarantee a valid one.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServiceInstance {
    pub address: String,
    pub port: i64,
    /// Tags as reported by the backend. Informational only: tag filtering
    /// is done by the backend query, not by endpoint selection.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ServiceInstance {
    pub fn new(address: impl Into<String>, port: i64) -> Self {
        Self {
            address: address.into(),
            port,
            tags: Vec::new(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// The endpoint this instance advertises, if it has a non-empty address
    /// and a port in 1..=65535.
    pub fn endpoint(&self) -> Option<ServiceEndpoint> {
        if self.address.is_empty() || self.port <= 0 {
            return None;
        }
        let port = u16::try_from(self.port).ok()?;
        Some(ServiceEndpoint {
            address: self.address.clone(),
            port,
        })
    }
}

/// Address of one instance believed healthy when it was looked up.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    pub address: String,
    pub port: u16,
}

impl ServiceEndpoint {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }
}

impl fmt::Display for ServiceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join_host_port(&self.address, self.port))
    }
}
