//! Log records that carry the identifiers of the span they were emitted under.
//!
//! Emission, filtering and export live in `tracelink_sdk::logs`; this module
//! only defines the record shape shared by loggers and exporters.
use crate::trace::{SpanContext, SpanId, TraceFlags, TraceId};
use crate::KeyValue;
use std::borrow::Cow;
use std::fmt;
use std::time::SystemTime;

/// Log severity, ordered from least to most severe.
///
/// The discriminants follow the OpenTelemetry severity numbers of each
/// range's first level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Fine-grained diagnostics.
    Trace = 1,
    /// Debugging events.
    Debug = 5,
    /// Normal operation.
    Info = 9,
    /// Unexpected but handled situations.
    Warn = 13,
    /// Failed operations.
    Error = 17,
}

impl Severity {
    /// Upper-case short name, as printed by exporters.
    pub const fn name(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The trace identifiers stamped onto a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceContext {
    /// Trace the record belongs to.
    pub trace_id: TraceId,
    /// Span that was active when the record was emitted.
    pub span_id: SpanId,
    /// Flags of that span.
    pub trace_flags: TraceFlags,
}

impl From<&SpanContext> for TraceContext {
    fn from(span_context: &SpanContext) -> Self {
        TraceContext {
            trace_id: span_context.trace_id(),
            span_id: span_context.span_id(),
            trace_flags: span_context.trace_flags(),
        }
    }
}

/// One structured log line.
#[derive(Clone, Debug, PartialEq)]
pub struct LogRecord {
    /// When the record was created.
    pub timestamp: SystemTime,
    /// Name of the logger that emitted it, usually the service name.
    pub target: Cow<'static, str>,
    /// Severity.
    pub severity: Severity,
    /// Message text.
    pub body: Cow<'static, str>,
    /// Attributes in the order they were added.
    pub attributes: Vec<KeyValue>,
    /// Identifiers of the active span, when there was one.
    pub trace_context: Option<TraceContext>,
}

impl LogRecord {
    /// A record with no attributes and no trace context, stamped now.
    pub fn new(
        target: impl Into<Cow<'static, str>>,
        severity: Severity,
        body: impl Into<Cow<'static, str>>,
    ) -> Self {
        LogRecord {
            timestamp: crate::time::now(),
            target: target.into(),
            severity,
            body: body.into(),
            attributes: Vec::new(),
            trace_context: None,
        }
    }

    /// Value of the first attribute named `key`.
    pub fn attribute(&self, key: &str) -> Option<&crate::Value> {
        self.attributes
            .iter()
            .find(|kv| kv.key.as_str() == key)
            .map(|kv| &kv.value)
    }
}
