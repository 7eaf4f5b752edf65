//! serviceA binary. Listens on `SERVICE_A_ADDR` (default `127.0.0.1:8081`)
//! and calls serviceB at `SERVICE_B_ADDR`.
use std::error::Error;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracelink::Context;
use tracelink_http::hyper::HyperClient;
use two_services::config::DemoConfig;
use two_services::server;
use two_services::service_a::ServiceA;
use two_services::telemetry::Telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync + 'static>> {
    two_services::init_internal_logs();
    let config = DemoConfig::from_env();
    let telemetry = Telemetry::from_config("serviceA", &config);

    let listener = TcpListener::bind(config.service_a_addr).await?;
    telemetry
        .logger(&Context::new())
        .info()
        .attr("address", listener.local_addr()?.to_string())
        .attr("downstream", config.service_b_addr.to_string())
        .msg("serviceA listening");

    let client = Arc::new(HyperClient::with_default_connector(config.downstream_timeout));
    let handler = Arc::new(ServiceA::new(
        telemetry.clone(),
        client,
        config.service_b_addr,
    ));
    server::serve(listener, handler, server::ctrl_c()).await?;

    telemetry.shutdown()?;
    Ok(())
}
