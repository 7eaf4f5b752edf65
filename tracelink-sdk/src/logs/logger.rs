use crate::logs::SdkLoggerProvider;
use std::borrow::Cow;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracelink::logs::{LogRecord, Severity, TraceContext};
use tracelink::trace::TraceContextExt;
use tracelink::{tl_debug, tl_warn, Context, Key, KeyValue, Value};

/// Emits records stamped with the trace identifiers of one context.
#[derive(Debug, Clone)]
pub struct Logger {
    provider: SdkLoggerProvider,
    trace_context: Option<TraceContext>,
}

impl Logger {
    pub(crate) fn new(provider: SdkLoggerProvider, cx: &Context) -> Self {
        let span_context = cx.span_context();
        let trace_context = span_context
            .is_valid()
            .then(|| TraceContext::from(span_context));
        Logger {
            provider,
            trace_context,
        }
    }

    /// Identifiers stamped on every record, if the context had a valid span.
    pub fn trace_context(&self) -> Option<&TraceContext> {
        self.trace_context.as_ref()
    }

    /// Whether a record at `severity` would reach the exporters.
    pub fn is_enabled(&self, severity: Severity) -> bool {
        severity >= self.provider.min_severity() && !self.provider.is_shutdown()
    }

    /// Start a record at `severity`.
    pub fn record(&self, severity: Severity) -> RecordBuilder<'_> {
        RecordBuilder {
            logger: self,
            record: LogRecord::new(self.provider.target().clone(), severity, ""),
        }
    }

    /// Start a [`Severity::Trace`] record.
    pub fn trace(&self) -> RecordBuilder<'_> {
        self.record(Severity::Trace)
    }

    /// Start a [`Severity::Debug`] record.
    pub fn debug(&self) -> RecordBuilder<'_> {
        self.record(Severity::Debug)
    }

    /// Start a [`Severity::Info`] record.
    pub fn info(&self) -> RecordBuilder<'_> {
        self.record(Severity::Info)
    }

    /// Start a [`Severity::Warn`] record.
    pub fn warn(&self) -> RecordBuilder<'_> {
        self.record(Severity::Warn)
    }

    /// Start a [`Severity::Error`] record.
    pub fn error(&self) -> RecordBuilder<'_> {
        self.record(Severity::Error)
    }

    /// Hand `record` to every exporter.
    ///
    /// The logger's trace context replaces whatever the record carried. An
    /// exporter that fails or panics is reported and skipped; the caller
    /// never sees the failure.
    pub fn emit(&self, mut record: LogRecord) {
        if self.provider.is_shutdown() {
            tl_debug!(
                name: "Logger.Emit.AfterShutdown",
                message = "record dropped because the logger provider is shut down"
            );
            return;
        }
        if record.severity < self.provider.min_severity() {
            return;
        }
        if self.trace_context.is_some() {
            record.trace_context = self.trace_context;
        }

        for exporter in self.provider.exporters() {
            match catch_unwind(AssertUnwindSafe(|| exporter.export(&record))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tl_warn!(
                        name: "Logger.Emit.ExportFailed",
                        exporter = format!("{:?}", exporter),
                        error = err.to_string()
                    );
                }
                Err(_) => {
                    tl_warn!(
                        name: "Logger.Emit.ExporterPanicked",
                        exporter = format!("{:?}", exporter)
                    );
                }
            }
        }
    }
}

/// A record under construction. Finish it with [`msg`](Self::msg).
#[derive(Debug)]
#[must_use = "a record is only emitted by `msg`"]
pub struct RecordBuilder<'a> {
    logger: &'a Logger,
    record: LogRecord,
}

impl RecordBuilder<'_> {
    /// Append an attribute. Attributes keep the order they were added in.
    pub fn attr<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<Key>,
        V: Into<Value>,
    {
        self.record.attributes.push(KeyValue::new(key, value));
        self
    }

    /// Set the body and emit the record.
    pub fn msg<T: Into<Cow<'static, str>>>(mut self, body: T) {
        self.record.body = body.into();
        self.logger.emit(self.record)
    }
}
