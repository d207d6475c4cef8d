use service_discovery::{Discovery, DiscoveryClient, DiscoveryConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Reads CONSUL_HTTP_ADDR (defaults to 127.0.0.1:8500)
    let config = DiscoveryConfig::from_env()?;
    let client = DiscoveryClient::from_config(&config)?;

    let check = client.grpc_health_check("example-service", "127.0.0.1", 50051);
    println!(
        "Registering example-service with check {} ({} every {:?})",
        check.check_id(),
        check.target(),
        check.interval()
    );
    client
        .register("example-service", "127.0.0.1", 50051, check)
        .await?;

    // Nothing answers the probe here, so the instance shows up once a real
    // gRPC health service listens on 127.0.0.1:50051.
    println!("\nLooking up example-service...");
    match client.lookup("example-service", None).await {
        Ok(endpoint) => println!("  healthy instance at {}", endpoint),
        Err(e) => println!("  {}", e),
    }

    Ok(())
}
