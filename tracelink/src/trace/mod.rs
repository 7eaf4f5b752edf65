//! Span identity and the value types recorded on spans.
//!
//! A trace is a tree of spans sharing one [`TraceId`]. Each span is
//! identified by a [`SpanContext`]; that context is the only part of a span
//! that is shared, copied into [`Context`](crate::Context) values and
//! serialized onto carriers. The mutable span record itself lives in the SDK
//! and is owned by whichever call path started it.
//!
//! [`TraceContextExt`] adds span-context accessors to
//! [`Context`](crate::Context).
use std::borrow::Cow;
use std::time::SystemTime;
use thiserror::Error;

use crate::KeyValue;

mod context;
mod ids;
mod span_context;

pub use context::TraceContextExt;
pub use ids::{SpanId, TraceFlags, TraceId};
pub use span_context::{SpanContext, TraceState};

/// Errors raised while building trace values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TraceError {
    /// See <https://www.w3.org/TR/trace-context/#key>.
    #[error("{0} is not a valid tracestate key")]
    InvalidTraceStateKey(String),

    /// See <https://www.w3.org/TR/trace-context/#value>.
    #[error("{0} is not a valid tracestate value")]
    InvalidTraceStateValue(String),

    /// See <https://www.w3.org/TR/trace-context/#list>.
    #[error("invalid tracestate list member: {0}")]
    InvalidTraceStateList(String),
}

/// The role a span plays in the request it describes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SpanKind {
    /// Outbound request to a remote service; its remote child is a `Server` span.
    Client,
    /// Handling of an inbound request.
    Server,
    /// Initiator of an asynchronous operation.
    Producer,
    /// Receiver of an asynchronous operation started by a `Producer`.
    Consumer,
    /// Work inside the process with no remote side.
    #[default]
    Internal,
}

/// Outcome of the operation a span describes.
///
/// Statuses are totally ordered `Unset < Error < Ok`; a span only ever moves
/// up that order, so once a status is `Ok` it stays `Ok`.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd)]
pub enum Status {
    /// No status has been set.
    #[default]
    Unset,
    /// The operation failed.
    Error {
        /// What went wrong
        description: Cow<'static, str>,
    },
    /// The operation was explicitly marked successful.
    Ok,
}

impl Status {
    /// An error status with the given description.
    pub fn error(description: impl Into<Cow<'static, str>>) -> Self {
        Status::Error {
            description: description.into(),
        }
    }
}

/// A timestamped annotation on a span.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    /// Event name, `exception` for recorded errors.
    pub name: Cow<'static, str>,
    /// When the event happened.
    pub timestamp: SystemTime,
    /// Event attributes.
    pub attributes: Vec<KeyValue>,
    /// Attributes discarded by limits.
    pub dropped_attributes_count: u32,
}

impl Event {
    /// Create an event.
    pub fn new<T: Into<Cow<'static, str>>>(
        name: T,
        timestamp: SystemTime,
        attributes: Vec<KeyValue>,
        dropped_attributes_count: u32,
    ) -> Self {
        Event {
            name: name.into(),
            timestamp,
            attributes,
            dropped_attributes_count,
        }
    }

    /// Create an event stamped with the current time.
    pub fn with_name<T: Into<Cow<'static, str>>>(name: T) -> Self {
        Event::new(name, crate::time::now(), Vec::new(), 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_order() {
        assert!(Status::Ok > Status::error("failed"));
        assert!(Status::error("") > Status::Unset);
    }

    #[test]
    fn span_kind_defaults_to_internal() {
        assert_eq!(SpanKind::default(), SpanKind::Internal);
    }
}
