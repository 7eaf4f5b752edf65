//! Core types for correlating traces, logs and counters across service hops.
//!
//! This crate holds the value types that travel with a request: the
//! [`Context`] passed explicitly through every call, the
//! [`trace::SpanContext`] identifying a position in a trace, [`baggage`]
//! entries, and the [`propagation`] traits that move them on and off a
//! carrier such as HTTP headers.
//!
//! Nothing here records or exports data. Span recording, processors, log
//! emission and counters live in `tracelink_sdk`.
//!
//! # Passing context
//!
//! There is no ambient "current" context. Every operation that needs a
//! parent takes a `&Context`, and every operation that creates a child hands
//! a new `Context` back.
//!
//! ```
//! use tracelink::trace::{SpanContext, SpanId, TraceContextExt, TraceFlags, TraceId, TraceState};
//! use tracelink::Context;
//!
//! let parent = SpanContext::new(
//!     TraceId::from(7),
//!     SpanId::from(9),
//!     TraceFlags::SAMPLED,
//!     true,
//!     TraceState::default(),
//! );
//! let cx = Context::new().with_remote_span_context(parent);
//! assert!(cx.has_active_span());
//! assert_eq!(cx.span_context().trace_id(), TraceId::from(7));
//! ```
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod baggage;

mod common;
pub use common::{InstrumentationScope, Key, KeyValue, StringValue, Value};

mod context;
pub use context::Context;

#[doc(hidden)]
pub mod internal_logging;

pub mod logs;

pub mod propagation;

pub mod trace;

#[doc(hidden)]
pub mod _private {
    #[cfg(feature = "internal-logs")]
    pub use tracing::{debug, error, info, warn};
}

#[doc(hidden)]
pub mod time {
    use std::time::SystemTime;

    #[doc(hidden)]
    pub fn now() -> SystemTime {
        SystemTime::now()
    }
}
