use crate::error::{SdkError, SdkResult};
use crate::trace::{SpanData, SpanExporter};
use crate::Resource;
use futures_util::future::BoxFuture;
use std::sync::{Arc, Mutex};

/// Collects exported spans in memory, for tests.
///
/// Clones share storage, so keep one clone and hand another to the provider:
///
/// ```
/// use tracelink::Context;
/// use tracelink_sdk::trace::{InMemorySpanExporter, SdkTracerProvider};
///
/// let exporter = InMemorySpanExporter::default();
/// let provider = SdkTracerProvider::builder()
///     .with_simple_exporter(exporter.clone())
///     .build();
/// provider.tracer("test").start_with_context("span", &Context::new()).end();
///
/// for span in exporter.get_finished_spans().unwrap() {
///     println!("{:?}", span.name);
/// }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemorySpanExporter {
    spans: Arc<Mutex<Vec<SpanData>>>,
    resource: Arc<Mutex<Resource>>,
}

impl InMemorySpanExporter {
    /// Everything exported so far, oldest first.
    pub fn get_finished_spans(&self) -> Result<Vec<SpanData>, SdkError> {
        Ok(self.spans.lock()?.clone())
    }

    /// Forget every exported span.
    pub fn reset(&self) {
        if let Ok(mut spans) = self.spans.lock() {
            spans.clear();
        }
    }

    /// The resource last handed over by a provider.
    pub fn resource(&self) -> Resource {
        self.resource
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl SpanExporter for InMemorySpanExporter {
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, SdkResult> {
        let result = self
            .spans
            .lock()
            .map(|mut spans| spans.extend(batch))
            .map_err(SdkError::from);
        Box::pin(std::future::ready(result))
    }

    fn set_resource(&mut self, resource: &Resource) {
        if let Ok(mut current) = self.resource.lock() {
            *current = resource.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracelink::Context;
    use crate::trace::SdkTracerProvider;

    #[test]
    fn reset_clears_spans() {
        let exporter = InMemorySpanExporter::default();
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .build();
        provider
            .tracer("memory")
            .start_with_context("one", &Context::new())
            .end();
        assert_eq!(exporter.get_finished_spans().unwrap().len(), 1);
        exporter.reset();
        assert!(exporter.get_finished_spans().unwrap().is_empty());
    }
}
