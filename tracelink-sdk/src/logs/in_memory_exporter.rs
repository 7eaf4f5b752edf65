use crate::error::{SdkError, SdkResult};
use crate::logs::LogExporter;
use crate::Resource;
use std::sync::{Arc, Mutex};
use tracelink::logs::LogRecord;

/// Keeps emitted records in memory, for tests.
///
/// Clones share storage. Records survive shutdown so a test can inspect them
/// after tearing the provider down.
#[derive(Clone, Debug, Default)]
pub struct InMemoryLogExporter {
    logs: Arc<Mutex<Vec<LogRecord>>>,
    resource: Arc<Mutex<Resource>>,
}

impl InMemoryLogExporter {
    /// Every record received so far, oldest first.
    pub fn get_emitted_logs(&self) -> Result<Vec<LogRecord>, SdkError> {
        Ok(self.logs.lock()?.clone())
    }

    /// Forget every record.
    pub fn reset(&self) {
        if let Ok(mut logs) = self.logs.lock() {
            logs.clear();
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

impl LogExporter for InMemoryLogExporter {
    fn export(&self, record: &LogRecord) -> SdkResult {
        self.logs.lock()?.push(record.clone());
        Ok(())
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
    use tracelink::logs::Severity;

    #[test]
    fn stores_and_resets() {
        let exporter = InMemoryLogExporter::default();
        exporter
            .export(&LogRecord::new("test", Severity::Info, "kept"))
            .unwrap();
        assert_eq!(exporter.clone().get_emitted_logs().unwrap().len(), 1);
        exporter.reset();
        assert!(exporter.get_emitted_logs().unwrap().is_empty());
    }
}
