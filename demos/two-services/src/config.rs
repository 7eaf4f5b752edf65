//! Settings read from the environment.
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Address serviceA listens on.
pub const SERVICE_A_ADDR: &str = "SERVICE_A_ADDR";
/// Default for [`SERVICE_A_ADDR`].
pub const SERVICE_A_ADDR_DEFAULT: &str = "127.0.0.1:8081";
/// Address serviceB listens on, and the one serviceA calls.
pub const SERVICE_B_ADDR: &str = "SERVICE_B_ADDR";
/// Default for [`SERVICE_B_ADDR`].
pub const SERVICE_B_ADDR_DEFAULT: &str = "127.0.0.1:8082";
/// Timeout in milliseconds for serviceA's call to serviceB.
pub const DOWNSTREAM_TIMEOUT_MS: &str = "DOWNSTREAM_TIMEOUT_MS";
/// Default for [`DOWNSTREAM_TIMEOUT_MS`].
pub const DOWNSTREAM_TIMEOUT_MS_DEFAULT: u64 = 5_000;
/// Which span pipeline to use: `stdout` or `batch-stdout`.
pub const TRACE_EXPORTER: &str = "TRACE_EXPORTER";

/// A setting that could not be parsed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid value {value:?} for {name}")]
pub struct ConfigError {
    name: &'static str,
    value: String,
}

/// How finished spans reach stdout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TraceExporterKind {
    /// Each span is printed when it ends.
    #[default]
    Stdout,
    /// Spans are queued and printed in batches by a background thread.
    BatchStdout,
}

impl FromStr for TraceExporterKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdout" => Ok(TraceExporterKind::Stdout),
            "batch-stdout" => Ok(TraceExporterKind::BatchStdout),
            _ => Err(ConfigError {
                name: TRACE_EXPORTER,
                value: s.to_string(),
            }),
        }
    }
}

/// Settings of both services.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DemoConfig {
    /// Where serviceA listens.
    pub service_a_addr: SocketAddr,
    /// Where serviceB listens.
    pub service_b_addr: SocketAddr,
    /// Upper bound on serviceA's call to serviceB.
    pub downstream_timeout: Duration,
    /// Span pipeline.
    pub trace_exporter: TraceExporterKind,
}

impl Default for DemoConfig {
    fn default() -> Self {
        DemoConfig {
            service_a_addr: SocketAddr::from(([127, 0, 0, 1], 8081)),
            service_b_addr: SocketAddr::from(([127, 0, 0, 1], 8082)),
            downstream_timeout: Duration::from_millis(DOWNSTREAM_TIMEOUT_MS_DEFAULT),
            trace_exporter: TraceExporterKind::default(),
        }
    }
}

impl DemoConfig {
    /// Read every setting from the environment. Unset variables take their
    /// default; unparsable ones are reported and take their default too.
    pub fn from_env() -> Self {
        let defaults = DemoConfig::default();
        DemoConfig {
            service_a_addr: read(SERVICE_A_ADDR, |v| v.parse().ok())
                .unwrap_or(defaults.service_a_addr),
            service_b_addr: read(SERVICE_B_ADDR, |v| v.parse().ok())
                .unwrap_or(defaults.service_b_addr),
            downstream_timeout: read(DOWNSTREAM_TIMEOUT_MS, |v| {
                v.parse::<u64>().ok().filter(|ms| *ms > 0)
            })
            .map(Duration::from_millis)
            .unwrap_or(defaults.downstream_timeout),
            trace_exporter: read(TRACE_EXPORTER, |v| v.parse().ok())
                .unwrap_or(defaults.trace_exporter),
        }
    }
}

fn read<T>(name: &'static str, parse: impl FnOnce(&str) -> Option<T>) -> Option<T> {
    let value = std::env::var(name).ok()?;
    let parsed = parse(&value);
    if parsed.is_none() {
        let err = ConfigError { name, value };
        tracing::warn!(error = %err, "ignoring setting, using the default");
    }
    parsed
}
