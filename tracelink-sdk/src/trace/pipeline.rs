//! The ordered set of span processors shared by every tracer of a provider.
//!
//! The pipeline moves through three states:
//!
//! ```ascii
//!   Running --shutdown()--> Draining --in-flight spans ended or budget spent--> Shutdown
//! ```
//!
//! Only `Running` accepts new spans. Spans started before shutdown are still
//! delivered while `Draining`; spans that end after `Shutdown` are dropped and
//! reported.
use crate::error::{SdkError, SdkResult};
use crate::trace::{Span, SpanData, SpanProcessor};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracelink::{tl_debug, tl_error, tl_warn, Context};

const RUNNING: u8 = 0;
const DRAINING: u8 = 1;
const SHUTDOWN: u8 = 2;

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Processors in registration order, with isolation between them.
///
/// A processor that returns an error or panics is logged and skipped; the
/// remaining processors still see the span.
#[derive(Debug)]
pub struct SpanProcessorPipeline {
    processors: Vec<Box<dyn SpanProcessor>>,
    state: AtomicU8,
    in_flight: AtomicUsize,
}

impl SpanProcessorPipeline {
    pub(crate) fn new(processors: Vec<Box<dyn SpanProcessor>>) -> Self {
        SpanProcessorPipeline {
            processors,
            state: AtomicU8::new(RUNNING),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Number of registered processors.
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    /// Whether no processor is registered.
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Whether new spans are accepted.
    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::SeqCst) == RUNNING
    }

    /// Recording spans started but not yet ended.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Register a new span. Returns `false` once shutdown has begun, in which
    /// case the caller must not deliver the span to [`on_end`](Self::on_end).
    pub(crate) fn admit(&self) -> bool {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        if self.is_running() {
            true
        } else {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            false
        }
    }

    pub(crate) fn on_start(&self, span: &mut Span, cx: &Context) {
        for processor in &self.processors {
            if catch_unwind(AssertUnwindSafe(|| processor.on_start(span, cx))).is_err() {
                tl_error!(
                    name: "SpanProcessorPipeline.OnStart.Panicked",
                    processor = format!("{:?}", processor)
                );
            }
        }
    }

    /// Deliver an ended span to every processor. Exactly one call per
    /// admitted span.
    pub(crate) fn on_end(&self, span: SpanData) {
        if self.state.load(Ordering::SeqCst) == SHUTDOWN {
            tl_error!(
                name: "SpanProcessorPipeline.OnEnd.AfterShutdown",
                span_name = span.name.to_string(),
                trace_id = span.span_context.trace_id().to_string()
            );
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            return;
        }

        let last = self.processors.len().saturating_sub(1);
        let mut span = Some(span);
        for (idx, processor) in self.processors.iter().enumerate() {
            let data = if idx == last {
                span.take()
            } else {
                span.clone()
            };
            let Some(data) = data else {
                break;
            };
            match catch_unwind(AssertUnwindSafe(|| processor.on_end(data))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tl_error!(
                        name: "SpanProcessorPipeline.OnEnd.Failed",
                        processor = format!("{:?}", processor),
                        error = err.to_string()
                    );
                }
                Err(_) => {
                    tl_error!(
                        name: "SpanProcessorPipeline.OnEnd.Panicked",
                        processor = format!("{:?}", processor)
                    );
                }
            }
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    /// Flush every processor within `timeout` overall.
    pub fn force_flush(&self, timeout: Duration) -> SdkResult {
        if !self.is_running() {
            return Err(SdkError::AlreadyShutdown);
        }
        let deadline = Instant::now() + timeout;
        let errors = self.each_processor(deadline, timeout, |processor, budget| {
            processor.force_flush_with_timeout(budget)
        });
        summarize(errors, timeout)
    }

    /// Stop accepting spans, wait for in-flight spans, then shut every
    /// processor down. Terminal; a second call returns
    /// [`SdkError::AlreadyShutdown`].
    ///
    /// Half of `timeout` at most goes to waiting for in-flight spans; the
    /// rest, and whatever the wait left unused, goes to the processors.
    pub fn shutdown(&self, timeout: Duration) -> SdkResult {
        self.shutdown_inner(timeout, true)
    }

    /// Shut down without waiting for in-flight spans. Used when the owning
    /// provider is dropped, where an open span may belong to the dropping
    /// thread itself.
    pub(crate) fn shutdown_now(&self, timeout: Duration) -> SdkResult {
        self.shutdown_inner(timeout, false)
    }

    fn shutdown_inner(&self, timeout: Duration, drain: bool) -> SdkResult {
        if self
            .state
            .compare_exchange(RUNNING, DRAINING, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SdkError::AlreadyShutdown);
        }

        let started = Instant::now();
        let deadline = started + timeout;
        let drain_deadline = started + timeout / 2;
        while drain && self.in_flight() > 0 && Instant::now() < drain_deadline {
            thread::sleep(DRAIN_POLL_INTERVAL);
        }
        let abandoned = self.in_flight();
        if abandoned > 0 {
            tl_warn!(
                name: "SpanProcessorPipeline.Shutdown.SpansAbandoned",
                in_flight = abandoned,
                message = "spans still open at shutdown will not be exported"
            );
        }
        self.state.store(SHUTDOWN, Ordering::SeqCst);
        tl_debug!(name: "SpanProcessorPipeline.Shutdown.Draining.Done", in_flight = abandoned);

        let errors = self.each_processor(deadline, timeout, |processor, budget| {
            processor.shutdown_with_timeout(budget)
        });
        summarize(errors, timeout)
    }

    fn each_processor<F>(&self, deadline: Instant, timeout: Duration, op: F) -> Vec<SdkError>
    where
        F: Fn(&dyn SpanProcessor, Duration) -> SdkResult,
    {
        let mut errors = Vec::new();
        for processor in &self.processors {
            let budget = deadline.saturating_duration_since(Instant::now());
            if budget.is_zero() {
                errors.push(SdkError::Timeout(timeout));
                break;
            }
            match catch_unwind(AssertUnwindSafe(|| op(processor.as_ref(), budget))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => errors.push(err),
                Err(_) => errors.push(SdkError::InternalFailure(format!(
                    "processor panicked: {:?}",
                    processor
                ))),
            }
        }
        let timed_out = errors.iter().any(|e| matches!(e, SdkError::Timeout(_)));
        if !timed_out && Instant::now() > deadline {
            errors.push(SdkError::Timeout(timeout));
        }
        errors
    }
}

fn summarize(errors: Vec<SdkError>, timeout: Duration) -> SdkResult {
    if errors.is_empty() {
        return Ok(());
    }
    if errors.iter().any(|e| matches!(e, SdkError::Timeout(_))) {
        return Err(SdkError::Timeout(timeout));
    }
    let message = errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    Err(SdkError::InternalFailure(message))
}
