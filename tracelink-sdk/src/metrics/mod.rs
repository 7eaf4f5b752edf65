//! # Counters
//!
//! [`SdkMeterProvider`] is a registry of named monotonic [`Counter`]s.
//! Registration is idempotent: asking twice for the same name returns
//! handles to the same series.
//!
//! ```
//! use tracelink::{Context, KeyValue};
//! use tracelink_sdk::metrics::SdkMeterProvider;
//!
//! let provider = SdkMeterProvider::default();
//! let counter = provider.counter("requests", "inbound requests");
//! counter.add(&Context::new(), 1, &[KeyValue::new("handler_name", "serviceA")]);
//!
//! let again = provider.counter("requests", "");
//! assert_eq!(again.value(&[KeyValue::new("handler_name", "serviceA")]), 1);
//! ```
mod attribute_set;
mod counter;
mod data;
mod exporter;
mod in_memory_exporter;
mod meter_provider;

pub use counter::Counter;
pub use data::{CounterData, CounterDataPoint};
pub use exporter::MetricExporter;
pub use in_memory_exporter::InMemoryMetricExporter;
pub use meter_provider::{MeterProviderBuilder, SdkMeterProvider};
