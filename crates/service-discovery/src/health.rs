use serde::{Serialize, Serializer};
use std::time::Duration;

use crate::config::ProbeConfig;
use crate::net::join_host_port;

/// Health check the backend runs against a registered instance.
///
/// The backend owns the probe schedule; this type only describes it. Built
/// once and never mutated, it travels inside a
/// [`ServiceRegistration`](crate::ServiceRegistration).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    #[serde(rename = "CheckID")]
    check_id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Interval", serialize_with = "backend_duration")]
    interval: Duration,
    #[serde(rename = "Timeout", serialize_with = "backend_duration")]
    timeout: Duration,
    #[serde(rename = "GRPC")]
    target: String,
    #[serde(rename = "GRPCUseTLS")]
    use_tls: bool,
    #[serde(rename = "TLSSkipVerify")]
    tls_skip_verify: bool,
}

impl HealthCheck {
    /// gRPC reachability probe with the stock policy: every 5s, 1s timeout,
    /// plaintext, certificate validation skipped.
    pub fn grpc(service: &str, address: &str, port: u16) -> Self {
        Self::grpc_with(service, address, port, &ProbeConfig::default())
    }

    pub fn grpc_with(service: &str, address: &str, port: u16, probe: &ProbeConfig) -> Self {
        Self {
            check_id: format!("healthcheck-{}-{}:{}", service, address, port),
            name: format!("probe-{}", service),
            interval: probe.interval,
            timeout: probe.timeout,
            target: join_host_port(address, port),
            use_tls: false,
            tls_skip_verify: probe.tls_skip_verify,
        }
    }

    /// Replace the check id. It must stay unique per registration or the
    /// backend will overwrite another instance's check.
    pub fn with_check_id(mut self, check_id: impl Into<String>) -> Self {
        self.check_id = check_id.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Probe the target over TLS instead of plaintext.
    pub fn with_use_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    pub fn check_id(&self) -> &str {
        &self.check_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `host:port` the backend probes.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn use_tls(&self) -> bool {
        self.use_tls
    }

    pub fn tls_skip_verify(&self) -> bool {
        self.tls_skip_verify
    }
}

/// Renders a duration the way the backend parses them: `5s`, `1500ms`.
fn format_duration(d: Duration) -> String {
    let nanos = d.subsec_nanos();
    if nanos == 0 {
        format!("{}s", d.as_secs())
    } else if nanos % 1_000_000 == 0 {
        format!("{}ms", d.as_millis())
    } else if nanos % 1_000 == 0 {
        format!("{}us", d.as_micros())
    } else {
        format!("{}ns", d.as_nanos())
    }
}

fn backend_duration<S>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_duration(*d))
}
