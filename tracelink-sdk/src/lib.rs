//! # tracelink SDK
//!
//! Recording and delivery for the types defined in `tracelink`:
//!
//! * [`trace`]: tracer provider, sampling, spans and the span processor
//!   pipeline with its exporters.
//! * [`propagation`]: W3C `traceparent`/`tracestate` and `baggage`
//!   propagators.
//! * [`logs`]: loggers that stamp every record with the active trace
//!   identifiers.
//! * [`metrics`]: a registry of monotonic counters.
//! * [`Resource`]: the service attributes shared by all of the above.
//!
//! Every provider is an ordinary value. Build one at startup, pass it to the
//! code that needs it, and shut it down at teardown:
//!
//! ```
//! use tracelink::propagation::TextMapPropagator;
//! use tracelink::Context;
//! use tracelink_sdk::propagation::TraceContextPropagator;
//! use tracelink_sdk::trace::{InMemorySpanExporter, SdkTracerProvider};
//! use std::collections::HashMap;
//!
//! let exporter = InMemorySpanExporter::default();
//! let provider = SdkTracerProvider::builder()
//!     .with_simple_exporter(exporter.clone())
//!     .build();
//! let tracer = provider.tracer("example");
//!
//! let (cx, mut span) = tracer.start_span(&Context::new(), "outbound", vec![]);
//! let mut headers: HashMap<String, String> = HashMap::new();
//! TraceContextPropagator::new().inject(&cx, &mut headers);
//! span.end();
//!
//! assert!(headers.contains_key("traceparent"));
//! provider.shutdown().unwrap();
//! ```
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

pub mod error;
pub mod logs;
pub mod metrics;
pub mod propagation;
pub mod resource;
pub mod trace;

pub use resource::Resource;
