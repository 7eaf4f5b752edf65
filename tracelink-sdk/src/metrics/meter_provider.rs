use crate::error::{SdkError, SdkResult};
use crate::metrics::counter::CounterInner;
use crate::metrics::{Counter, CounterData, MetricExporter};
use crate::Resource;
use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracelink::{tl_debug, tl_warn};

const INSTRUMENT_NAME_MAX_LENGTH: usize = 255;
const INSTRUMENT_NAME_ALLOWED_NON_ALPHANUMERIC_CHARS: [char; 4] = ['_', '.', '-', '/'];

/// Registry of named counters.
///
/// Cloning shares the registry. Counters live as long as any clone of the
/// provider or of the counter itself; the registry is independent of the
/// tracer and logger providers.
#[derive(Clone, Debug)]
pub struct SdkMeterProvider {
    inner: Arc<MeterProviderInner>,
}

#[derive(Debug)]
struct MeterProviderInner {
    counters: Mutex<Vec<Arc<CounterInner>>>,
    exporters: Vec<Box<dyn MetricExporter>>,
    is_shutdown: AtomicBool,
}

impl Default for SdkMeterProvider {
    fn default() -> Self {
        SdkMeterProvider::builder().build()
    }
}

impl SdkMeterProvider {
    /// Start building a provider.
    pub fn builder() -> MeterProviderBuilder {
        MeterProviderBuilder::default()
    }

    /// The counter named `name`, registering it on first use.
    ///
    /// Later calls with the same name return the same series whatever
    /// description they pass. A name that is empty, longer than 255
    /// characters, not starting with an ASCII letter, or containing anything
    /// but alphanumerics and `_ . - /` yields a no-op counter.
    pub fn counter(
        &self,
        name: impl Into<Cow<'static, str>>,
        description: impl Into<Cow<'static, str>>,
    ) -> Counter {
        let name = name.into();
        if let Err(reason) = validate_instrument_name(&name) {
            tl_warn!(
                name: "MeterProvider.Counter.InvalidName",
                counter_name = name.to_string(),
                reason = reason,
                message = "increments on this counter are discarded"
            );
            return Counter::noop();
        }

        let mut counters = self
            .inner
            .counters
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = counters.iter().find(|c| c.name == name) {
            return Counter::new(existing.clone());
        }
        let inner = Arc::new(CounterInner::new(name, description.into()));
        counters.push(inner.clone());
        Counter::new(inner)
    }

    /// Snapshot of every counter, in registration order.
    pub fn collect(&self) -> Vec<CounterData> {
        self.inner
            .counters
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|c| c.snapshot())
            .collect()
    }

    /// Send a snapshot to every exporter.
    pub fn force_flush(&self) -> SdkResult {
        if self.inner.is_shutdown.load(Ordering::Relaxed) {
            return Err(SdkError::AlreadyShutdown);
        }
        self.export_snapshot()
    }

    /// Export a final snapshot and shut every exporter down. Counters keep
    /// counting afterwards but are never exported again.
    pub fn shutdown(&self) -> SdkResult {
        if self.inner.is_shutdown.swap(true, Ordering::SeqCst) {
            return Err(SdkError::AlreadyShutdown);
        }
        let flushed = self.export_snapshot();
        let mut errors: Vec<String> = flushed.err().map(|e| e.to_string()).into_iter().collect();
        for exporter in &self.inner.exporters {
            if let Err(err) = exporter.shutdown() {
                tl_debug!(name: "MeterProvider.ShutdownError", error = err.to_string());
                errors.push(err.to_string());
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(SdkError::InternalFailure(errors.join("; ")))
        }
    }

    fn export_snapshot(&self) -> SdkResult {
        if self.inner.exporters.is_empty() {
            return Ok(());
        }
        let snapshot = self.collect();
        let errors: Vec<String> = self
            .inner
            .exporters
            .iter()
            .filter_map(|exporter| exporter.export(&snapshot).err())
            .map(|err| err.to_string())
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(SdkError::InternalFailure(errors.join("; ")))
        }
    }
}

fn validate_instrument_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("counter name must be non-empty");
    }
    if name.len() > INSTRUMENT_NAME_MAX_LENGTH {
        return Err("counter name must be at most 255 characters");
    }
    if name.starts_with(|c: char| !c.is_ascii_alphabetic()) {
        return Err("counter name must start with an ASCII letter");
    }
    if name.contains(|c: char| {
        !c.is_ascii_alphanumeric() && !INSTRUMENT_NAME_ALLOWED_NON_ALPHANUMERIC_CHARS.contains(&c)
    }) {
        return Err("counter name may only contain alphanumerics and _ . - /");
    }
    Ok(())
}

/// Builder for [`SdkMeterProvider`].
#[derive(Debug, Default)]
pub struct MeterProviderBuilder {
    exporters: Vec<Box<dyn MetricExporter>>,
    resource: Option<Resource>,
}

impl MeterProviderBuilder {
    /// Add a sink for [`SdkMeterProvider::force_flush`] snapshots.
    pub fn with_exporter<T: MetricExporter + 'static>(mut self, exporter: T) -> Self {
        self.exporters.push(Box::new(exporter));
        self
    }

    /// Set the resource handed to exporters.
    pub fn with_resource(self, resource: Resource) -> Self {
        MeterProviderBuilder {
            resource: Some(resource),
            ..self
        }
    }

    /// Build the provider.
    pub fn build(self) -> SdkMeterProvider {
        let resource = self.resource.unwrap_or_else(|| Resource::builder().build());
        let mut exporters = self.exporters;
        for exporter in exporters.iter_mut() {
            exporter.set_resource(&resource);
        }
        SdkMeterProvider {
            inner: Arc::new(MeterProviderInner {
                counters: Mutex::new(Vec::new()),
                exporters,
                is_shutdown: AtomicBool::new(false),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::InMemoryMetricExporter;
    use rstest::rstest;
    use tracelink::{Context, KeyValue};

    #[test]
    fn registration_is_idempotent() {
        let provider = SdkMeterProvider::default();
        let first = provider.counter("service_a_called_counter", "calls to service A");
        let second = provider.counter("service_a_called_counter", "ignored");
        let cx = Context::new();
        first.add(&cx, 1, &[]);
        second.add(&cx, 1, &[]);
        assert_eq!(first.value(&[]), 2);

        let metrics = provider.collect();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].description, "calls to service A");
        assert_eq!(metrics[0].total(), 2);
    }

    #[rstest]
    #[case("serviceB_call_counter", false)]
    #[case("http.server/requests-total", false)]
    #[case("", true)]
    #[case("1counter", true)]
    #[case("_counter", true)]
    #[case("has space", true)]
    #[case("emoji_🦀", true)]
    fn name_validation(#[case] name: &'static str, #[case] noop: bool) {
        let provider = SdkMeterProvider::default();
        assert_eq!(provider.counter(name, "").is_noop(), noop);
    }

    #[test]
    fn name_length_limit() {
        let provider = SdkMeterProvider::default();
        assert!(!provider.counter("a".repeat(255), "").is_noop());
        assert!(provider.counter("a".repeat(256), "").is_noop());
        assert_eq!(provider.collect().len(), 1);
    }

    #[test]
    fn flush_exports_snapshot() {
        let exporter = InMemoryMetricExporter::default();
        let provider = SdkMeterProvider::builder()
            .with_exporter(exporter.clone())
            .build();
        let counter = provider.counter("requests", "");
        counter.add(&Context::new(), 3, &[KeyValue::new("req_size", 0)]);
        provider.force_flush().unwrap();
        counter.add(&Context::new(), 2, &[KeyValue::new("req_size", 0)]);
        provider.shutdown().unwrap();

        let snapshots = exporter.get_finished_metrics().unwrap();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0][0].value(&[KeyValue::new("req_size", 0)]), Some(3));
        assert_eq!(snapshots[1][0].value(&[KeyValue::new("req_size", 0)]), Some(5));

        assert_eq!(provider.force_flush(), Err(SdkError::AlreadyShutdown));
        assert_eq!(provider.shutdown(), Err(SdkError::AlreadyShutdown));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_registration_and_increments() {
        let provider = SdkMeterProvider::default();
        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let provider = provider.clone();
                tokio::spawn(async move {
                    let counter = provider.counter("shared", "");
                    for _ in 0..100 {
                        counter.add(&Context::new(), 1, &[KeyValue::new("k", "v")]);
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(provider.collect()[0].value(&[KeyValue::new("k", "v")]), Some(3_200));
    }
}
