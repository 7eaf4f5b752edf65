//! Write spans, log records and counter snapshots to stdout in a
//! human-readable layout.
//!
//! # Examples
//!
//! ```no_run
//! use tracelink::Context;
//! use tracelink_sdk::logs::SdkLoggerProvider;
//! use tracelink_sdk::metrics::SdkMeterProvider;
//! use tracelink_sdk::trace::SdkTracerProvider;
//!
//! let tracer_provider = SdkTracerProvider::builder()
//!     .with_simple_exporter(tracelink_stdout::SpanExporter::default())
//!     .build();
//! let logger_provider = SdkLoggerProvider::builder()
//!     .with_exporter(tracelink_stdout::LogExporter::default())
//!     .build();
//! let meter_provider = SdkMeterProvider::builder()
//!     .with_exporter(tracelink_stdout::MetricExporter::default())
//!     .build();
//!
//! let cx = Context::new();
//! let mut span = tracer_provider.tracer("demo").start_with_context("work", &cx);
//! logger_provider.logger_for(&cx).info().msg("working");
//! meter_provider.counter("work_done", "").add(&cx, 1, &[]);
//! span.end();
//!
//! // Span #0
//! //   Name: "work"
//! //   TraceId: 5d3c...
//! meter_provider.shutdown().unwrap();
//! ```
#![warn(missing_debug_implementations, missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub(crate) mod common;

#[cfg(feature = "trace")]
mod trace;
#[cfg_attr(docsrs, doc(cfg(feature = "trace")))]
#[cfg(feature = "trace")]
pub use trace::*;

#[cfg(feature = "logs")]
mod logs;
#[cfg_attr(docsrs, doc(cfg(feature = "logs")))]
#[cfg(feature = "logs")]
pub use logs::*;

#[cfg(feature = "metrics")]
mod metrics;
#[cfg_attr(docsrs, doc(cfg(feature = "metrics")))]
#[cfg(feature = "metrics")]
pub use metrics::*;
