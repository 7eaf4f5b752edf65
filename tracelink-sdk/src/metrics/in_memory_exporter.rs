use crate::error::{SdkError, SdkResult};
use crate::metrics::{CounterData, MetricExporter};
use std::sync::{Arc, Mutex};

/// Keeps exported snapshots in memory, for tests.
///
/// Clones share storage.
#[derive(Clone, Debug, Default)]
pub struct InMemoryMetricExporter {
    snapshots: Arc<Mutex<Vec<Vec<CounterData>>>>,
}

impl InMemoryMetricExporter {
    /// Every snapshot received so far, oldest first.
    pub fn get_finished_metrics(&self) -> Result<Vec<Vec<CounterData>>, SdkError> {
        Ok(self.snapshots.lock()?.clone())
    }

    /// The most recent snapshot, if any.
    pub fn latest(&self) -> Result<Option<Vec<CounterData>>, SdkError> {
        Ok(self.snapshots.lock()?.last().cloned())
    }

    /// Forget every snapshot.
    pub fn reset(&self) {
        if let Ok(mut snapshots) = self.snapshots.lock() {
            snapshots.clear();
        }
    }
}

impl MetricExporter for InMemoryMetricExporter {
    fn export(&self, metrics: &[CounterData]) -> SdkResult {
        self.snapshots.lock()?.push(metrics.to_vec());
        Ok(())
    }
}
