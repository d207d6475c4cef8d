use async_trait::async_trait;
use service_discovery::{
    BackendError, Discovery, DiscoveryBackend, DiscoveryClient, DiscoveryError, HealthCheck,
    RoundRobin, ServiceEndpoint, ServiceInstance, ServiceRegistration,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

/// In-memory stand-in for the discovery backend.
#[derive(Debug, Default)]
struct FakeBackend {
    registrations: Mutex<HashMap<String, ServiceRegistration>>,
    instances: Mutex<Vec<ServiceInstance>>,
    queries: Mutex<Vec<(String, Option<String>)>>,
    down: Option<String>,
}

impl FakeBackend {
    fn with_instances(instances: Vec<ServiceInstance>) -> Self {
        Self {
            instances: Mutex::new(instances),
            ..Self::default()
        }
    }

    fn unreachable(reason: &str) -> Self {
        Self {
            down: Some(reason.to_string()),
            ..Self::default()
        }
    }

    fn registration(&self, id: &str) -> Option<ServiceRegistration> {
        self.registrations.lock().unwrap().get(id).cloned()
    }

    fn registration_count(&self) -> usize {
        self.registrations.lock().unwrap().len()
    }

    fn queries(&self) -> Vec<(String, Option<String>)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl DiscoveryBackend for FakeBackend {
    async fn register_service(&self, registration: &ServiceRegistration) -> Result<(), BackendError> {
        if let Some(reason) = &self.down {
            return Err(BackendError::Unavailable(reason.clone()));
        }
        self.registrations
            .lock()
            .unwrap()
            .insert(registration.id.clone(), registration.clone());
        Ok(())
    }

    async fn passing_instances(
        &self,
        service: &str,
        tag: Option<&str>,
    ) -> Result<Vec<ServiceInstance>, BackendError> {
        self.queries
            .lock()
            .unwrap()
            .push((service.to_string(), tag.map(str::to_string)));
        if let Some(reason) = &self.down {
            return Err(BackendError::Unavailable(reason.clone()));
        }
        Ok(self.instances.lock().unwrap().clone())
    }
}

fn client(backend: FakeBackend) -> (Arc<FakeBackend>, DiscoveryClient<Arc<FakeBackend>>) {
    let backend = Arc::new(backend);
    (backend.clone(), DiscoveryClient::new(backend))
}

#[tokio::test]
async fn test_register_stores_derived_ids_and_check() {
    let (backend, client) = client(FakeBackend::default());
    let check = HealthCheck::grpc("orders", "10.0.0.5", 9090);

    assert_ok!(client.register("orders", "10.0.0.5", 9090, check.clone()).await);

    let stored = backend.registration("orders-10.0.0.5:9090").expect("registration stored");
    assert_eq!(stored.name, "orders");
    assert_eq!(stored.address, "10.0.0.5");
    assert_eq!(stored.port, 9090);
    assert_eq!(stored.check, check);
    assert_eq!(stored.check.check_id(), "healthcheck-orders-10.0.0.5:9090");
    assert_eq!(stored.check.interval(), Duration::from_secs(5));
    assert_eq!(stored.check.timeout(), Duration::from_secs(1));
}

#[tokio::test]
async fn test_reregistering_same_instance_is_idempotent() {
    let (backend, client) = client(FakeBackend::default());

    for _ in 0..2 {
        let check = HealthCheck::grpc("orders", "10.0.0.5", 9090);
        assert_ok!(client.register("orders", "10.0.0.5", 9090, check).await);
    }
    assert_eq!(backend.registration_count(), 1);

    let check = HealthCheck::grpc("orders", "10.0.0.5", 9091);
    assert_ok!(client.register("orders", "10.0.0.5", 9091, check).await);
    assert_eq!(backend.registration_count(), 2);
}

#[tokio::test]
async fn test_register_rejects_invalid_input_before_io() {
    let (backend, client) = client(FakeBackend::default());

    let err = assert_err!(
        client
            .register("", "10.0.0.5", 9090, HealthCheck::grpc("", "10.0.0.5", 9090))
            .await
    );
    assert!(matches!(err, DiscoveryError::Configuration(_)));

    let err = assert_err!(
        client
            .register("orders", "", 9090, HealthCheck::grpc("orders", "", 9090))
            .await
    );
    assert!(matches!(err, DiscoveryError::Configuration(_)));

    let err = assert_err!(
        client
            .register("orders", "10.0.0.5", 0, HealthCheck::grpc("orders", "10.0.0.5", 0))
            .await
    );
    assert!(matches!(err, DiscoveryError::Configuration(_)));

    assert_eq!(backend.registration_count(), 0);
}

#[tokio::test]
async fn test_register_failure_names_the_registration() {
    let (_, client) = client(FakeBackend::unreachable("connection refused"));

    let err = assert_err!(
        client
            .register("orders", "10.0.0.5", 9090, HealthCheck::grpc("orders", "10.0.0.5", 9090))
            .await
    );

    match err {
        DiscoveryError::Registration { id, source } => {
            assert_eq!(id, "orders-10.0.0.5:9090");
            assert!(matches!(source, BackendError::Unavailable(_)));
        }
        other => panic!("expected registration error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_lookup_with_no_instances_is_not_found() {
    let (_, client) = client(FakeBackend::default());

    let err = assert_err!(client.lookup("orders", Some("v1")).await);
    assert!(matches!(err, DiscoveryError::ServiceNotFound { ref service } if service == "orders"));
}

#[tokio::test]
async fn test_lookup_with_only_blank_address_is_unresolvable() {
    let (_, client) = client(FakeBackend::with_instances(vec![ServiceInstance::new("", 9090)]));

    let err = assert_err!(client.lookup("orders", None).await);
    assert!(matches!(err, DiscoveryError::ServiceUnresolvable { ref service } if service == "orders"));
}

#[tokio::test]
async fn test_lookup_returns_first_usable_in_backend_order() {
    let (_, client) = client(FakeBackend::with_instances(vec![
        ServiceInstance::new("", 9090),
        ServiceInstance::new("10.0.0.6", 9091),
        ServiceInstance::new("10.0.0.7", 0),
    ]));

    let endpoint = assert_ok!(client.lookup("orders", None).await);
    assert_eq!(endpoint, ServiceEndpoint::new("10.0.0.6", 9091));
    assert_eq!(endpoint.to_string(), "10.0.0.6:9091");

    // Same response, same answer.
    let again = assert_ok!(client.lookup("orders", None).await);
    assert_eq!(again, endpoint);
}

#[tokio::test]
async fn test_lookup_backend_failure_is_not_reported_as_missing() {
    let (_, client) = client(FakeBackend::unreachable("connection reset"));

    let err = assert_err!(client.lookup("orders", None).await);
    match err {
        DiscoveryError::BackendQuery { service, source } => {
            assert_eq!(service, "orders");
            assert!(source.to_string().contains("connection reset"));
        }
        other => panic!("expected backend query error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_lookup_forwards_tag_and_treats_empty_as_any() {
    let (backend, client) = client(FakeBackend::with_instances(vec![ServiceInstance::new(
        "10.0.0.5", 9090,
    )]));

    assert_ok!(client.lookup("orders", Some("v2")).await);
    assert_ok!(client.lookup("orders", Some("")).await);
    assert_ok!(client.lookup("orders", None).await);

    assert_eq!(
        backend.queries(),
        vec![
            ("orders".to_string(), Some("v2".to_string())),
            ("orders".to_string(), None),
            ("orders".to_string(), None),
        ]
    );
}

#[tokio::test]
async fn test_lookup_rejects_empty_service_name() {
    let (backend, client) = client(FakeBackend::default());

    let err = assert_err!(client.lookup("  ", None).await);
    assert!(matches!(err, DiscoveryError::Configuration(_)));
    assert!(backend.queries().is_empty());
}

#[tokio::test]
async fn test_round_robin_skips_unusable_instances() {
    let backend = Arc::new(FakeBackend::with_instances(vec![
        ServiceInstance::new("10.0.0.5", 9090),
        ServiceInstance::new("", 9090),
        ServiceInstance::new("10.0.0.6", 9090),
    ]));
    let client = DiscoveryClient::new(backend).with_strategy(RoundRobin::new());

    let mut picked = Vec::new();
    for _ in 0..3 {
        picked.push(assert_ok!(client.lookup("orders", None).await).address);
    }
    assert_eq!(picked, ["10.0.0.5", "10.0.0.6", "10.0.0.5"]);
}

#[tokio::test]
async fn test_client_is_shared_across_tasks() {
    let backend = Arc::new(FakeBackend::with_instances(vec![ServiceInstance::new(
        "10.0.0.5", 9090,
    )]));
    let client = Arc::new(DiscoveryClient::new(backend.clone()));

    let mut handles = Vec::new();
    for i in 0..8u16 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            let port = 9000 + i;
            let check = HealthCheck::grpc("orders", "10.0.0.9", port);
            client.register("orders", "10.0.0.9", port, check).await?;
            Ok::<_, DiscoveryError>(client.lookup("orders", None).await?)
        }));
    }

    for handle in handles {
        let endpoint = assert_ok!(handle.await.unwrap());
        assert_eq!(endpoint.to_string(), "10.0.0.5:9090");
    }
    assert_eq!(backend.registration_count(), 8);
}

#[tokio::test]
async fn test_discovery_trait_object() {
    let client: Box<dyn Discovery> = Box::new(DiscoveryClient::new(FakeBackend::with_instances(
        vec![ServiceInstance::new("orders.svc", 443).with_tag("v1")],
    )));

    let endpoint = assert_ok!(client.lookup("orders", Some("v1")).await);
    assert_eq!(endpoint.to_string(), "orders.svc:443");
}

#[tokio::test]
async fn test_register_keeps_caller_built_check() {
    let (backend, client) = client(FakeBackend::default());
    let check = HealthCheck::grpc("orders", "orders.svc", 443)
        .with_check_id("orders-tls")
        .with_use_tls(true);

    assert_ok!(client.register("orders", "orders.svc", 443, check.clone()).await);

    let stored = backend.registration("orders-orders.svc:443").expect("registration stored");
    assert_eq!(stored.check, check);
    assert_eq!(stored.check.check_id(), "orders-tls");
    assert!(stored.check.use_tls());
}
