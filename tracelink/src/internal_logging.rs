#![allow(unused_macros)]
//! Diagnostics emitted by the tracelink crates themselves.
//!
//! These macros report problems inside the telemetry pipeline (a rejected
//! header, a failing processor, a full queue). They are not a logging API for
//! applications; use `tracelink_sdk::logs` for correlated application logs.
//!
//! Every event carries a `name` of the form `Component.Event` and is emitted
//! through `tracing` with the calling crate's package name as target, so a
//! subscriber can filter with e.g. `RUST_LOG=tracelink_sdk=debug`. The
//! `internal-logs` feature must be declared by the calling crate for the
//! events to reach `tracing`. Under `cfg(test)` events are also printed, which
//! shows them when running tests with `--nocapture`.

#[doc(hidden)]
#[macro_export]
macro_rules! __tl_log {
    ($level:ident, $tag:literal, $name:expr $(,)?) => {
        #[cfg(feature = "internal-logs")]
        {
            $crate::_private::$level!(name: $name, target: env!("CARGO_PKG_NAME"), name = $name);
        }

        #[cfg(test)]
        {
            println!("{}: name={}", $tag, $name);
        }

        #[cfg(all(not(feature = "internal-logs"), not(test)))]
        {
            let _ = $name;
        }
    };
    ($level:ident, $tag:literal, $name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        #[cfg(feature = "internal-logs")]
        {
            $crate::_private::$level!(
                name: $name,
                target: env!("CARGO_PKG_NAME"),
                name = $name,
                $($key = $value),+
            );
        }

        #[cfg(test)]
        {
            let mut line = format!("{}: name={}", $tag, $name);
            $(
                line.push_str(&format!(", {}={}", stringify!($key), $value));
            )+
            println!("{}", line);
        }

        #[cfg(all(not(feature = "internal-logs"), not(test)))]
        {
            let _ = ($name, $($value),+);
        }
    };
}

/// Debug-level diagnostic.
///
/// ```
/// use tracelink::tl_debug;
/// tl_debug!(name: "Propagator.Extract.Invalid", header = "traceparent");
/// ```
#[macro_export]
macro_rules! tl_debug {
    (name: $name:expr $(, $($rest:tt)*)?) => {
        $crate::__tl_log!(debug, "tl_debug", $name $(, $($rest)*)?)
    };
}

/// Info-level diagnostic.
#[macro_export]
macro_rules! tl_info {
    (name: $name:expr $(, $($rest:tt)*)?) => {
        $crate::__tl_log!(info, "tl_info", $name $(, $($rest)*)?)
    };
}

/// Warning-level diagnostic, for recoverable misuse such as ending a span twice.
///
/// ```
/// use tracelink::tl_warn;
/// tl_warn!(name: "Span.End.AlreadyEnded", span_name = "checkout");
/// ```
#[macro_export]
macro_rules! tl_warn {
    (name: $name:expr $(, $($rest:tt)*)?) => {
        $crate::__tl_log!(warn, "tl_warn", $name $(, $($rest)*)?)
    };
}

/// Error-level diagnostic, for failures the pipeline absorbed on the caller's behalf.
#[macro_export]
macro_rules! tl_error {
    (name: $name:expr $(, $($rest:tt)*)?) => {
        $crate::__tl_log!(error, "tl_error", $name $(, $($rest)*)?)
    };
}
