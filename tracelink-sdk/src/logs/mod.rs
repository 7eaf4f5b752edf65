//! # Correlated logging
//!
//! [`SdkLoggerProvider`] hands out [`Logger`]s bound to a [`Context`]. Every
//! record a logger emits carries the trace id, span id and flags of that
//! context's span, so log lines can be joined with the trace they were
//! written under.
//!
//! ```
//! use tracelink::Context;
//! use tracelink_sdk::logs::{InMemoryLogExporter, SdkLoggerProvider};
//!
//! let exporter = InMemoryLogExporter::default();
//! let provider = SdkLoggerProvider::builder()
//!     .with_exporter(exporter.clone())
//!     .build();
//!
//! provider
//!     .logger_for(&Context::new())
//!     .info()
//!     .attr("status", 200)
//!     .msg("request served");
//!
//! let logs = exporter.get_emitted_logs().unwrap();
//! assert_eq!(logs[0].body, "request served");
//! assert!(logs[0].trace_context.is_none());
//! ```
//!
//! [`Context`]: tracelink::Context
mod export;
mod in_memory_exporter;
mod logger;
mod logger_provider;

pub use export::LogExporter;
pub use in_memory_exporter::InMemoryLogExporter;
pub use logger::{Logger, RecordBuilder};
pub use logger_provider::{LoggerProviderBuilder, SdkLoggerProvider};
pub use tracelink::logs::{LogRecord, Severity, TraceContext};
