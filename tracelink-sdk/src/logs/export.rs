use crate::error::SdkResult;
use crate::Resource;
use std::fmt::Debug;
use tracelink::logs::LogRecord;

/// Destination for emitted log records.
///
/// `export` is called on the emitting thread, possibly from many threads at
/// once; implementations guard their own state.
pub trait LogExporter: Send + Sync + Debug {
    /// Deliver one record.
    fn export(&self, record: &LogRecord) -> SdkResult;

    /// Release resources. Called once when the provider shuts down.
    fn shutdown(&self) -> SdkResult {
        Ok(())
    }

    /// Receive the provider's resource before the first record.
    fn set_resource(&mut self, _resource: &Resource) {}
}
