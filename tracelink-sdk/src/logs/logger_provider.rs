use crate::error::{SdkError, SdkResult};
use crate::logs::{LogExporter, Logger};
use crate::resource::SERVICE_NAME;
use crate::Resource;
use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracelink::logs::Severity;
use tracelink::{tl_debug, Context};

/// Creates [`Logger`]s that share one set of exporters.
///
/// Cloning shares the provider. Dropping the last reference shuts it down;
/// [`shutdown`](Self::shutdown) does the same explicitly.
#[derive(Debug, Clone)]
pub struct SdkLoggerProvider {
    inner: Arc<LoggerProviderInner>,
}

#[derive(Debug)]
struct LoggerProviderInner {
    exporters: Vec<Box<dyn LogExporter>>,
    min_severity: Severity,
    target: Cow<'static, str>,
    resource: Resource,
    is_shutdown: AtomicBool,
}

impl LoggerProviderInner {
    fn shutdown(&self) -> Vec<SdkResult> {
        self.exporters
            .iter()
            .map(|exporter| {
                let result = exporter.shutdown();
                if let Err(err) = &result {
                    tl_debug!(name: "LoggerProvider.ShutdownError", error = err.to_string());
                }
                result
            })
            .collect()
    }
}

impl Drop for LoggerProviderInner {
    fn drop(&mut self) {
        if !self.is_shutdown.swap(true, Ordering::SeqCst) {
            tl_debug!(
                name: "LoggerProvider.Drop",
                message = "last reference dropped, shutting down"
            );
            let _ = self.shutdown();
        }
    }
}

impl SdkLoggerProvider {
    /// Start building a provider.
    pub fn builder() -> LoggerProviderBuilder {
        LoggerProviderBuilder::default()
    }

    /// A logger whose records carry the identifiers of `cx`'s span, when it
    /// has a valid one.
    pub fn logger_for(&self, cx: &Context) -> Logger {
        Logger::new(self.clone(), cx)
    }

    /// Records below this severity are discarded.
    pub fn min_severity(&self) -> Severity {
        self.inner.min_severity
    }

    /// The resource handed to every exporter.
    pub fn resource(&self) -> &Resource {
        &self.inner.resource
    }

    pub(crate) fn target(&self) -> &Cow<'static, str> {
        &self.inner.target
    }

    pub(crate) fn exporters(&self) -> &[Box<dyn LogExporter>] {
        &self.inner.exporters
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_shutdown(&self) -> bool {
        self.inner.is_shutdown.load(Ordering::Relaxed)
    }

    /// Shut every exporter down. Records emitted afterwards are dropped.
    pub fn shutdown(&self) -> SdkResult {
        if self
            .inner
            .is_shutdown
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SdkError::AlreadyShutdown);
        }

        let errors: Vec<String> = self
            .inner
            .shutdown()
            .into_iter()
            .filter_map(Result::err)
            .map(|err| err.to_string())
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(SdkError::InternalFailure(format!(
                "shutdown errors: {}",
                errors.join("; ")
            )))
        }
    }
}

/// Builder for [`SdkLoggerProvider`].
#[derive(Debug)]
pub struct LoggerProviderBuilder {
    exporters: Vec<Box<dyn LogExporter>>,
    min_severity: Severity,
    resource: Option<Resource>,
}

impl Default for LoggerProviderBuilder {
    fn default() -> Self {
        LoggerProviderBuilder {
            exporters: Vec::new(),
            min_severity: Severity::Trace,
            resource: None,
        }
    }
}

impl LoggerProviderBuilder {
    /// Add a sink. Sinks receive records in the order they were added.
    pub fn with_exporter<T: LogExporter + 'static>(mut self, exporter: T) -> Self {
        self.exporters.push(Box::new(exporter));
        self
    }

    /// Discard records below `severity`. Defaults to [`Severity::Trace`].
    pub fn with_min_severity(self, min_severity: Severity) -> Self {
        LoggerProviderBuilder {
            min_severity,
            ..self
        }
    }

    /// Set the resource. Its `service.name` becomes the record target.
    pub fn with_resource(self, resource: Resource) -> Self {
        LoggerProviderBuilder {
            resource: Some(resource),
            ..self
        }
    }

    /// Build the provider.
    pub fn build(self) -> SdkLoggerProvider {
        let resource = self.resource.unwrap_or_else(|| Resource::builder().build());
        let target = resource
            .get(SERVICE_NAME)
            .map(|name| Cow::Owned(name.as_str().into_owned()))
            .unwrap_or(Cow::Borrowed("unknown_service"));

        let mut exporters = self.exporters;
        for exporter in exporters.iter_mut() {
            exporter.set_resource(&resource);
        }

        SdkLoggerProvider {
            inner: Arc::new(LoggerProviderInner {
                exporters,
                min_severity: self.min_severity,
                target,
                resource,
                is_shutdown: AtomicBool::new(false),
            }),
        }
    }
}
