//! serviceB binary. Listens on `SERVICE_B_ADDR` (default `127.0.0.1:8082`).
use std::error::Error;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracelink::Context;
use two_services::config::DemoConfig;
use two_services::server;
use two_services::service_b::ServiceB;
use two_services::telemetry::Telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync + 'static>> {
    two_services::init_internal_logs();
    let config = DemoConfig::from_env();
    let telemetry = Telemetry::from_config("serviceB", &config);

    let listener = TcpListener::bind(config.service_b_addr).await?;
    telemetry
        .logger(&Context::new())
        .info()
        .attr("address", listener.local_addr()?.to_string())
        .msg("serviceB listening");

    let handler = Arc::new(ServiceB::new(telemetry.clone()));
    server::serve(listener, handler, server::ctrl_c()).await?;

    telemetry.shutdown()?;
    Ok(())
}
