//! Errors returned by exporters, processors and providers.
use std::sync::PoisonError;
use std::time::Duration;
use thiserror::Error;

/// Failure of an export, flush or shutdown operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SdkError {
    /// The component was already shut down; the call had no effect.
    #[error("already shut down")]
    AlreadyShutdown,

    /// The operation did not finish within the allowed time.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// Anything else: a failing exporter, a dead worker thread, a poisoned lock.
    #[error("internal failure: {0}")]
    InternalFailure(String),
}

impl<T> From<PoisonError<T>> for SdkError {
    fn from(err: PoisonError<T>) -> Self {
        SdkError::InternalFailure(format!("lock poisoned: {}", err))
    }
}

/// Result of an export, flush or shutdown operation.
pub type SdkResult = Result<(), SdkError>;
