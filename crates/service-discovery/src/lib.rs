pub mod backend;
pub mod bootstrap;
pub mod client;
pub mod config;
pub mod consul;
pub mod error;
pub mod health;
pub mod net;
pub mod select;
pub mod service;

pub use backend::DiscoveryBackend;
pub use bootstrap::{lookup_service, register_self, register_service, SELF_SERVICE_NAME};
pub use client::{Discovery, DiscoveryClient};
pub use config::{DiscoveryConfig, ProbeConfig};
pub use consul::ConsulBackend;
pub use error::{BackendError, BootstrapError, DiscoveryError};
pub use health::HealthCheck;
pub use select::{FirstUsable, RoundRobin, SelectionStrategy};
pub use service::{ServiceEndpoint, ServiceInstance, ServiceRegistration};
