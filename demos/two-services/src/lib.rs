//! Two cooperating HTTP services that share one trace.
//!
//! `serviceA` answers `GET /serviceA` by calling `serviceB` with the active
//! trace context injected into the request headers. `serviceB` answers
//! `GET /serviceB` by running [`compute::add`] in a child span. Spans, log
//! records and counters of both services carry the same trace id.
//!
//! Everything a handler needs is bundled in a [`telemetry::Telemetry`] value
//! built at startup and handed to the service; nothing is registered
//! globally.
pub mod compute;
pub mod config;
pub mod error;
pub mod server;
pub mod service_a;
pub mod service_b;
pub mod telemetry;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Install a `tracing` subscriber printing internal diagnostics of the
/// telemetry crates and of the server loop.
///
/// The filter comes from `RUST_LOG` and defaults to `info`.
pub fn init_internal_logs() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_thread_names(true)
        .with_filter(filter);
    tracing_subscriber::registry().with(fmt_layer).init();
}
