//! # Tracer provider
//!
//! [`SdkTracerProvider`] owns the configuration and the processor pipeline
//! shared by every tracer it hands out. It is built explicitly and passed to
//! whoever needs to trace; there is no global instance.
//!
//! ```
//! use tracelink::Context;
//! use tracelink_sdk::trace::{InMemorySpanExporter, SdkTracerProvider};
//!
//! let exporter = InMemorySpanExporter::default();
//! let provider = SdkTracerProvider::builder()
//!     .with_simple_exporter(exporter.clone())
//!     .build();
//!
//! let mut span = provider.tracer("docs").start_with_context("work", &Context::new());
//! span.end();
//!
//! provider.shutdown().unwrap();
//! assert_eq!(exporter.get_finished_spans().unwrap().len(), 1);
//! ```
//!
//! Cloning a provider shares it. When the last clone (and every tracer made
//! from it) is dropped, the pipeline is shut down.
use crate::error::SdkResult;
use crate::trace::pipeline::SpanProcessorPipeline;
use crate::trace::{
    BatchSpanProcessor, Config, IdGenerator, SdkTracer, ShouldSample, SimpleSpanProcessor,
    SpanExporter, SpanLimits, SpanProcessor, DEFAULT_PROCESSOR_TIMEOUT,
};
use crate::Resource;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tracelink::{tl_debug, InstrumentationScope};

#[derive(Debug)]
struct TracerProviderInner {
    pipeline: Arc<SpanProcessorPipeline>,
    config: Config,
}

impl Drop for TracerProviderInner {
    fn drop(&mut self) {
        if self.pipeline.is_running() {
            if let Err(err) = self.pipeline.shutdown_now(DEFAULT_PROCESSOR_TIMEOUT) {
                tl_debug!(
                    name: "TracerProvider.Drop.ShutdownFailed",
                    error = err.to_string()
                );
            }
        }
    }
}

/// Creates tracers that share one configuration and processor pipeline.
#[derive(Clone, Debug)]
pub struct SdkTracerProvider {
    inner: Arc<TracerProviderInner>,
}

impl SdkTracerProvider {
    /// Start building a provider.
    pub fn builder() -> TracerProviderBuilder {
        TracerProviderBuilder::default()
    }

    /// A tracer for the scope `name`.
    pub fn tracer(&self, name: impl Into<Cow<'static, str>>) -> SdkTracer {
        self.tracer_with_scope(InstrumentationScope::new(name))
    }

    /// A tracer for an explicit scope.
    pub fn tracer_with_scope(&self, scope: InstrumentationScope) -> SdkTracer {
        SdkTracer::new(scope, self.clone())
    }

    /// The provider's configuration.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// The resource handed to every processor.
    pub fn resource(&self) -> &Resource {
        &self.inner.config.resource
    }

    pub(crate) fn pipeline(&self) -> &Arc<SpanProcessorPipeline> {
        &self.inner.pipeline
    }

    /// Flush every processor, waiting at most the default five seconds.
    pub fn force_flush(&self) -> SdkResult {
        self.force_flush_with_timeout(DEFAULT_PROCESSOR_TIMEOUT)
    }

    /// Flush every processor, waiting at most `timeout` in total.
    pub fn force_flush_with_timeout(&self, timeout: Duration) -> SdkResult {
        self.inner.pipeline.force_flush(timeout)
    }

    /// Shut the pipeline down with the default five second budget.
    pub fn shutdown(&self) -> SdkResult {
        self.shutdown_with_timeout(DEFAULT_PROCESSOR_TIMEOUT)
    }

    /// Stop accepting spans, drain in-flight spans, and shut every processor
    /// down within `timeout`. Later calls return
    /// [`SdkError::AlreadyShutdown`](crate::error::SdkError::AlreadyShutdown).
    pub fn shutdown_with_timeout(&self, timeout: Duration) -> SdkResult {
        self.inner.pipeline.shutdown(timeout)
    }
}

/// Builder for [`SdkTracerProvider`].
#[derive(Debug, Default)]
pub struct TracerProviderBuilder {
    processors: Vec<Box<dyn SpanProcessor>>,
    config: Config,
}

impl TracerProviderBuilder {
    /// Export every sampled span synchronously through `exporter`.
    pub fn with_simple_exporter<T: SpanExporter + 'static>(self, exporter: T) -> Self {
        self.with_span_processor(SimpleSpanProcessor::new(exporter))
    }

    /// Export sampled spans in the background through `exporter`, with the
    /// batch settings taken from the environment.
    pub fn with_batch_exporter<T: SpanExporter + 'static>(self, exporter: T) -> Self {
        self.with_span_processor(BatchSpanProcessor::builder(exporter).build())
    }

    /// Append a processor. Processors run in the order they were added.
    pub fn with_span_processor<T: SpanProcessor + 'static>(mut self, processor: T) -> Self {
        self.processors.push(Box::new(processor));
        self
    }

    /// Replace the sampler.
    pub fn with_sampler<T: ShouldSample + 'static>(mut self, sampler: T) -> Self {
        self.config.sampler = Box::new(sampler);
        self
    }

    /// Replace the id generator.
    pub fn with_id_generator<T: IdGenerator + 'static>(mut self, id_generator: T) -> Self {
        self.config.id_generator = Box::new(id_generator);
        self
    }

    /// Replace the span limits.
    pub fn with_span_limits(mut self, span_limits: SpanLimits) -> Self {
        self.config.span_limits = span_limits;
        self
    }

    /// Replace the resource.
    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.config.resource = resource;
        self
    }

    /// Build the provider and hand its resource to every processor.
    pub fn build(self) -> SdkTracerProvider {
        let TracerProviderBuilder {
            mut processors,
            config,
        } = self;
        for processor in processors.iter_mut() {
            processor.set_resource(&config.resource);
        }

        SdkTracerProvider {
            inner: Arc::new(TracerProviderInner {
                pipeline: Arc::new(SpanProcessorPipeline::new(processors)),
                config,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SdkError;
    use crate::resource::SERVICE_NAME;
    use crate::trace::{IncrementIdGenerator, InMemorySpanExporter, Sampler};
    use tracelink::trace::{SpanId, TraceId};
    use tracelink::{Context, Value};

    #[test]
    fn resource_reaches_exporter() {
        let exporter = InMemorySpanExporter::default();
        let _provider = SdkTracerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .with_resource(
                Resource::builder_empty()
                    .with_service_name("serviceA")
                    .build(),
            )
            .build();
        assert_eq!(
            exporter.resource().get(SERVICE_NAME),
            Some(&Value::from("serviceA"))
        );
    }

    #[test]
    fn batch_resource_reaches_exporter() {
        let exporter = InMemorySpanExporter::default();
        let provider = SdkTracerProvider::builder()
            .with_batch_exporter(exporter.clone())
            .with_resource(
                Resource::builder_empty()
                    .with_service_name("serviceB")
                    .build(),
            )
            .build();
        provider.force_flush().unwrap();
        assert_eq!(
            exporter.resource().get(SERVICE_NAME),
            Some(&Value::from("serviceB"))
        );
    }

    #[test]
    fn custom_id_generator() {
        let exporter = InMemorySpanExporter::default();
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .with_sampler(Sampler::AlwaysOn)
            .with_id_generator(IncrementIdGenerator::new())
            .build();
        let span = provider
            .tracer("provider-tests")
            .start_with_context("sequential", &Context::new());
        assert_eq!(span.span_context().trace_id(), TraceId::from(1));
        assert_eq!(span.span_context().span_id(), SpanId::from(2));
    }

    #[test]
    fn batch_provider_exports_on_shutdown() {
        let exporter = InMemorySpanExporter::default();
        let provider = SdkTracerProvider::builder()
            .with_batch_exporter(exporter.clone())
            .with_sampler(Sampler::AlwaysOn)
            .build();
        let tracer = provider.tracer("provider-tests");
        for _ in 0..5 {
            tracer.start_with_context("batched", &Context::new()).end();
        }
        provider.shutdown().unwrap();
        assert_eq!(exporter.get_finished_spans().unwrap().len(), 5);
        assert_eq!(provider.shutdown(), Err(SdkError::AlreadyShutdown));
    }

    #[test]
    fn dropping_last_handle_shuts_down() {
        let exporter = InMemorySpanExporter::default();
        {
            let provider = SdkTracerProvider::builder()
                .with_batch_exporter(exporter.clone())
                .with_sampler(Sampler::AlwaysOn)
                .build();
            let tracer = provider.tracer("provider-tests");
            drop(provider);
            tracer.start_with_context("outlives-provider", &Context::new()).end();
        }
        assert_eq!(exporter.get_finished_spans().unwrap().len(), 1);
    }

    #[test]
    fn dropping_provider_does_not_wait_for_open_span() {
        let exporter = InMemorySpanExporter::default();
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .build();
        let span = provider
            .tracer("provider-tests")
            .start_with_context("held-by-dropper", &Context::new());

        let started = std::time::Instant::now();
        drop(provider);
        assert!(started.elapsed() < Duration::from_millis(500));

        drop(span);
        assert!(exporter.get_finished_spans().unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_span_ends() {
        let exporter = InMemorySpanExporter::default();
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .with_sampler(Sampler::AlwaysOn)
            .build();
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let tracer = provider.tracer("provider-tests");
                tokio::spawn(async move {
                    let mut span = tracer.start_with_context(format!("task-{}", i), &Context::new());
                    tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                    span.end();
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(exporter.get_finished_spans().unwrap().len(), 16);
    }
}
