//! The telemetry bundle handed to every handler.
use crate::config::{DemoConfig, TraceExporterKind};
use http::HeaderMap;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tracelink::logs::Severity;
use tracelink::propagation::{TextMapCompositePropagator, TextMapPropagator};
use tracelink::baggage::BaggageExt;
use tracelink::trace::{SpanKind, TraceContextExt};
use tracelink::{Context, KeyValue};
use tracelink_http::{HeaderExtractor, HeaderInjector};
use tracelink_sdk::error::{SdkError, SdkResult};
use tracelink_sdk::logs::{LogExporter, Logger, LoggerProviderBuilder, SdkLoggerProvider};
use tracelink_sdk::metrics::{Counter, MeterProviderBuilder, MetricExporter, SdkMeterProvider};
use tracelink_sdk::propagation::{BaggagePropagator, TraceContextPropagator};
use tracelink_sdk::resource::{DEPLOYMENT_ENVIRONMENT, SERVICE_VERSION};
use tracelink_sdk::trace::{
    SdkTracer, SdkTracerProvider, Span, SpanBuilder, SpanData, SpanExporter, SpanProcessor,
    TracerProviderBuilder,
};
use tracelink_sdk::Resource;

/// Tracer, propagator, logger provider and meter provider of one service.
///
/// Cloning is cheap and shares everything.
#[derive(Clone, Debug)]
pub struct Telemetry {
    inner: Arc<TelemetryInner>,
}

#[derive(Debug)]
struct TelemetryInner {
    tracer: SdkTracer,
    tracer_provider: SdkTracerProvider,
    propagator: TextMapCompositePropagator,
    logger_provider: SdkLoggerProvider,
    meter_provider: SdkMeterProvider,
}

impl Telemetry {
    /// Start building the bundle of the service called `service_name`.
    pub fn builder(service_name: impl Into<Cow<'static, str>>) -> TelemetryBuilder {
        TelemetryBuilder {
            service_name: service_name.into(),
            tracer_provider: SdkTracerProvider::builder()
                .with_span_processor(BaggageSpanProcessor),
            logger_provider: SdkLoggerProvider::builder(),
            meter_provider: SdkMeterProvider::builder(),
        }
    }

    /// Stdout exporters for every signal, spans going through the pipeline
    /// chosen by `config.trace_exporter`.
    pub fn from_config(service_name: impl Into<Cow<'static, str>>, config: &DemoConfig) -> Self {
        let builder = Telemetry::builder(service_name)
            .with_span_processor(LoggingSpanProcessor)
            .with_log_exporter(tracelink_stdout::LogExporter::default())
            .with_metric_exporter(tracelink_stdout::MetricExporter::default());
        let builder = match config.trace_exporter {
            TraceExporterKind::Stdout => {
                builder.with_simple_span_exporter(tracelink_stdout::SpanExporter::default())
            }
            TraceExporterKind::BatchStdout => {
                builder.with_batch_span_exporter(tracelink_stdout::SpanExporter::default())
            }
        };
        builder.build()
    }

    /// The service's tracer.
    pub fn tracer(&self) -> &SdkTracer {
        &self.inner.tracer
    }

    /// Context carried by inbound `headers`: trace context then baggage.
    pub fn extract(&self, headers: &HeaderMap) -> Context {
        self.inner.propagator.extract(&HeaderExtractor(headers))
    }

    /// Write `cx` into outbound `headers`.
    pub fn inject(&self, cx: &Context, headers: &mut HeaderMap) {
        self.inner
            .propagator
            .inject(cx, &mut HeaderInjector(headers));
    }

    /// Start the server span of an inbound request, child of whatever
    /// context its headers carry.
    pub fn start_server_span(
        &self,
        name: &'static str,
        request: &http::Request<bytes::Bytes>,
    ) -> (Context, Span) {
        let parent_cx = self.extract(request.headers());
        let span = SpanBuilder::from_name(name)
            .with_kind(SpanKind::Server)
            .with_attributes(vec![
                KeyValue::new("http.request.method", request.method().to_string()),
                KeyValue::new("url.path", request.uri().path().to_string()),
            ])
            .start_with_context(&self.inner.tracer, &parent_cx);
        let cx = parent_cx.with_span_context(span.span_context().clone());
        (cx, span)
    }

    /// Logger stamping records with the span of `cx`.
    pub fn logger(&self, cx: &Context) -> Logger {
        self.inner.logger_provider.logger_for(cx)
    }

    /// The counter named `name`.
    pub fn counter(&self, name: &'static str, description: &'static str) -> Counter {
        self.inner.meter_provider.counter(name, description)
    }

    /// The tracer provider.
    pub fn tracer_provider(&self) -> &SdkTracerProvider {
        &self.inner.tracer_provider
    }

    /// The logger provider.
    pub fn logger_provider(&self) -> &SdkLoggerProvider {
        &self.inner.logger_provider
    }

    /// The meter provider.
    pub fn meter_provider(&self) -> &SdkMeterProvider {
        &self.inner.meter_provider
    }

    /// Flush and shut down every provider. All three are attempted even
    /// when one fails.
    pub fn shutdown(&self) -> SdkResult {
        let results = [
            self.inner.tracer_provider.shutdown(),
            self.inner.meter_provider.shutdown(),
            self.inner.logger_provider.shutdown(),
        ];
        if results.iter().all(|r| matches!(r, Err(SdkError::AlreadyShutdown))) {
            return Err(SdkError::AlreadyShutdown);
        }
        let errors: Vec<String> = results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .filter(|err| !matches!(err, SdkError::AlreadyShutdown))
            .map(|err| err.to_string())
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(SdkError::InternalFailure(errors.join("; ")))
        }
    }
}

/// Builder for [`Telemetry`].
#[derive(Debug)]
pub struct TelemetryBuilder {
    service_name: Cow<'static, str>,
    tracer_provider: TracerProviderBuilder,
    logger_provider: LoggerProviderBuilder,
    meter_provider: MeterProviderBuilder,
}

impl TelemetryBuilder {
    /// Export each span as soon as it ends.
    pub fn with_simple_span_exporter<T: SpanExporter + 'static>(mut self, exporter: T) -> Self {
        self.tracer_provider = self.tracer_provider.with_simple_exporter(exporter);
        self
    }

    /// Export spans in batches from a background thread.
    pub fn with_batch_span_exporter<T: SpanExporter + 'static>(mut self, exporter: T) -> Self {
        self.tracer_provider = self.tracer_provider.with_batch_exporter(exporter);
        self
    }

    /// Add a span processor.
    pub fn with_span_processor<T: SpanProcessor + 'static>(mut self, processor: T) -> Self {
        self.tracer_provider = self.tracer_provider.with_span_processor(processor);
        self
    }

    /// Add a log sink.
    pub fn with_log_exporter<T: LogExporter + 'static>(mut self, exporter: T) -> Self {
        self.logger_provider = self.logger_provider.with_exporter(exporter);
        self
    }

    /// Add a counter sink.
    pub fn with_metric_exporter<T: MetricExporter + 'static>(mut self, exporter: T) -> Self {
        self.meter_provider = self.meter_provider.with_exporter(exporter);
        self
    }

    /// Build the bundle. Every provider shares one resource naming the
    /// service; logs are kept from debug level up so header dumps show.
    pub fn build(self) -> Telemetry {
        let resource = Resource::builder()
            .with_service_name(self.service_name.clone())
            .with_attribute(KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")))
            .with_attribute(KeyValue::new(DEPLOYMENT_ENVIRONMENT, "demo"))
            .build();

        let tracer_provider = self
            .tracer_provider
            .with_resource(resource.clone())
            .build();
        let tracer = tracer_provider.tracer(self.service_name);
        let propagator = TextMapCompositePropagator::new(vec![
            Box::new(TraceContextPropagator::new()),
            Box::new(BaggagePropagator::new()),
        ]);
        let logger_provider = self
            .logger_provider
            .with_min_severity(Severity::Debug)
            .with_resource(resource.clone())
            .build();
        let meter_provider = self.meter_provider.with_resource(resource).build();

        Telemetry {
            inner: Arc::new(TelemetryInner {
                tracer,
                tracer_provider,
                propagator,
                logger_provider,
                meter_provider,
            }),
        }
    }
}

/// Dump `headers` as one debug record, one attribute per header.
pub fn log_headers(logger: &Logger, label: &'static str, headers: &HeaderMap) {
    if !logger.is_enabled(Severity::Debug) {
        return;
    }
    headers
        .iter()
        .fold(logger.debug(), |record, (name, value)| {
            record.attr(
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .msg(label);
}

/// Copies every baggage entry of the parent context onto the starting span,
/// so entries sent by a caller show up on each hop's spans.
#[derive(Debug)]
pub struct BaggageSpanProcessor;

impl SpanProcessor for BaggageSpanProcessor {
    fn on_start(&self, span: &mut Span, cx: &Context) {
        for (key, (value, _)) in cx.baggage().iter() {
            span.set_attribute(KeyValue::new(key.clone(), value.clone()));
        }
    }

    fn on_end(&self, _span: SpanData) -> SdkResult {
        Ok(())
    }

    fn force_flush_with_timeout(&self, _timeout: Duration) -> SdkResult {
        Ok(())
    }

    fn shutdown_with_timeout(&self, _timeout: Duration) -> SdkResult {
        Ok(())
    }
}

/// Reports every ended span to the internal log at debug level.
#[derive(Debug)]
pub struct LoggingSpanProcessor;

impl SpanProcessor for LoggingSpanProcessor {
    fn on_start(&self, _span: &mut Span, _cx: &Context) {}

    fn on_end(&self, span: SpanData) -> SdkResult {
        let duration = span
            .end_time
            .duration_since(span.start_time)
            .unwrap_or_default();
        tracing::debug!(
            span_name = %span.name,
            trace_id = %span.span_context.trace_id(),
            span_id = %span.span_context.span_id(),
            parent_span_id = %span.parent_span_id,
            duration_us = duration.as_micros() as u64,
            "span ended"
        );
        Ok(())
    }

    fn force_flush_with_timeout(&self, _timeout: Duration) -> SdkResult {
        Ok(())
    }

    fn shutdown_with_timeout(&self, _timeout: Duration) -> SdkResult {
        Ok(())
    }
}
