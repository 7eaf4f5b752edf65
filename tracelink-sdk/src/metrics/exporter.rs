use crate::error::SdkResult;
use crate::metrics::CounterData;
use crate::Resource;
use std::fmt::Debug;

/// Destination for counter snapshots.
pub trait MetricExporter: Send + Sync + Debug {
    /// Deliver one snapshot of every registered counter.
    fn export(&self, metrics: &[CounterData]) -> SdkResult;

    /// Release resources. Called once when the provider shuts down.
    fn shutdown(&self) -> SdkResult {
        Ok(())
    }

    /// Receive the provider's resource before the first export.
    fn set_resource(&mut self, _resource: &Resource) {}
}
