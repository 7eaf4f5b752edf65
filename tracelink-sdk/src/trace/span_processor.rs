//! # Span processors
//!
//! A span processor observes recording spans as they start and end. The
//! provider keeps its processors in a
//! [`SpanProcessorPipeline`](crate::trace::SpanProcessorPipeline) and invokes
//! them in registration order; the built-in processors here turn ended spans
//! into exporter calls.
//!
//! ```ascii
//!   +--------------+   +-----------------------+   +-------------------+
//!   |              |   |                       |   |                   |
//!   | Tracer       |   | (Batch)SpanProcessor  |   |    SpanExporter   |
//!   | Span.end()   +---> (Simple)SpanProcessor +--->  (stdout, memory) |
//!   |              |   |                       |   |                   |
//!   +--------------+   +-----------------------+   +-------------------+
//! ```
//!
//! [`SimpleSpanProcessor`] exports each sampled span on the thread that
//! ended it. [`BatchSpanProcessor`] queues spans for a dedicated thread that
//! exports them in batches.
use crate::error::{SdkError, SdkResult};
use crate::resource::Resource;
use crate::trace::{Span, SpanData, SpanExporter};
use futures_executor::block_on;
use std::env;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracelink::{tl_debug, tl_error, tl_warn, Context};

pub(crate) const OTEL_BSP_SCHEDULE_DELAY: &str = "OTEL_BSP_SCHEDULE_DELAY";
pub(crate) const OTEL_BSP_SCHEDULE_DELAY_DEFAULT: u64 = 5_000;
pub(crate) const OTEL_BSP_MAX_QUEUE_SIZE: &str = "OTEL_BSP_MAX_QUEUE_SIZE";
pub(crate) const OTEL_BSP_MAX_QUEUE_SIZE_DEFAULT: usize = 2_048;
pub(crate) const OTEL_BSP_MAX_EXPORT_BATCH_SIZE: &str = "OTEL_BSP_MAX_EXPORT_BATCH_SIZE";
pub(crate) const OTEL_BSP_MAX_EXPORT_BATCH_SIZE_DEFAULT: usize = 512;
pub(crate) const OTEL_BSP_EXPORT_TIMEOUT: &str = "OTEL_BSP_EXPORT_TIMEOUT";
pub(crate) const OTEL_BSP_EXPORT_TIMEOUT_DEFAULT: u64 = 30_000;

/// Timeout used by [`SpanProcessor::force_flush`] and [`SpanProcessor::shutdown`].
pub const DEFAULT_PROCESSOR_TIMEOUT: Duration = Duration::from_secs(5);

/// Hooks invoked for every recording span.
///
/// `on_start` and `on_end` run synchronously on the thread that started or
/// ended the span, so they should be cheap. They may be called concurrently
/// from many threads.
pub trait SpanProcessor: Send + Sync + std::fmt::Debug {
    /// Called right after a recording span is created. `cx` is the parent
    /// context the span was started from. The span may be modified.
    fn on_start(&self, span: &mut Span, cx: &Context);

    /// Called exactly once when a recording span ends.
    fn on_end(&self, span: SpanData) -> SdkResult;

    /// Export everything received so far, waiting at most `timeout`.
    fn force_flush_with_timeout(&self, timeout: Duration) -> SdkResult;

    /// Flush, release resources and stop accepting spans, waiting at most
    /// `timeout`. Terminal.
    fn shutdown_with_timeout(&self, timeout: Duration) -> SdkResult;

    /// [`force_flush_with_timeout`](Self::force_flush_with_timeout) with the default timeout.
    fn force_flush(&self) -> SdkResult {
        self.force_flush_with_timeout(DEFAULT_PROCESSOR_TIMEOUT)
    }

    /// [`shutdown_with_timeout`](Self::shutdown_with_timeout) with the default timeout.
    fn shutdown(&self) -> SdkResult {
        self.shutdown_with_timeout(DEFAULT_PROCESSOR_TIMEOUT)
    }

    /// Receive the provider's resource. Called once, before any span starts.
    fn set_resource(&mut self, _resource: &Resource) {}
}

/// Exports every sampled span as soon as it ends.
///
/// The exporter sits behind a mutex, so concurrent span ends export one at a
/// time. Meant for tests and low-volume services.
///
/// Exporter calls run to completion; one that outlasts its budget is
/// reported as [`SdkError::Timeout`] once it returns.
#[derive(Debug)]
pub struct SimpleSpanProcessor {
    exporter: Mutex<Box<dyn SpanExporter>>,
    export_timeout: Duration,
    is_shutdown: AtomicBool,
}

impl SimpleSpanProcessor {
    /// Wrap `exporter`.
    pub fn new<E: SpanExporter + 'static>(exporter: E) -> Self {
        SimpleSpanProcessor {
            exporter: Mutex::new(Box::new(exporter)),
            export_timeout: Duration::from_millis(OTEL_BSP_EXPORT_TIMEOUT_DEFAULT),
            is_shutdown: AtomicBool::new(false),
        }
    }

    /// Budget of a single export. Defaults to 30 seconds.
    pub fn with_export_timeout(mut self, timeout: Duration) -> Self {
        self.export_timeout = timeout;
        self
    }
}

/// Run `op`, turning a success that took longer than `budget` into a timeout.
fn within_budget<F>(budget: Duration, op: F) -> SdkResult
where
    F: FnOnce() -> SdkResult,
{
    let started = Instant::now();
    let result = op();
    if result.is_ok() && started.elapsed() > budget {
        return Err(SdkError::Timeout(budget));
    }
    result
}

impl SpanProcessor for SimpleSpanProcessor {
    fn on_start(&self, _span: &mut Span, _cx: &Context) {}

    fn on_end(&self, span: SpanData) -> SdkResult {
        if self.is_shutdown.load(Ordering::Relaxed) {
            return Err(SdkError::AlreadyShutdown);
        }
        if !span.span_context.is_sampled() {
            return Ok(());
        }

        within_budget(self.export_timeout, || {
            let mut exporter = self.exporter.lock()?;
            block_on(exporter.export(vec![span]))
        })
    }

    fn force_flush_with_timeout(&self, timeout: Duration) -> SdkResult {
        if self.is_shutdown.load(Ordering::Relaxed) {
            return Err(SdkError::AlreadyShutdown);
        }
        within_budget(timeout, || self.exporter.lock()?.force_flush())
    }

    fn shutdown_with_timeout(&self, timeout: Duration) -> SdkResult {
        if self.is_shutdown.swap(true, Ordering::Relaxed) {
            return Err(SdkError::AlreadyShutdown);
        }
        within_budget(timeout, || self.exporter.lock()?.shutdown())
    }

    fn set_resource(&mut self, resource: &Resource) {
        if let Ok(exporter) = self.exporter.get_mut() {
            exporter.set_resource(resource);
        }
    }
}

#[derive(Debug)]
enum BatchMessage {
    /// A full batch is waiting in the span queue.
    SpansAvailable,
    ForceFlush(SyncSender<SdkResult>),
    Shutdown(SyncSender<SdkResult>),
    SetResource(Arc<Resource>),
}

/// Queues ended spans for a dedicated export thread.
///
/// Spans go through a bounded queue of `max_queue_size`. The worker exports
/// when `max_export_batch_size` spans are waiting or `scheduled_delay` has
/// passed since the last export, whichever comes first. When the queue is
/// full, new spans are dropped and counted; the count is reported at
/// shutdown.
#[derive(Debug)]
pub struct BatchSpanProcessor {
    span_sender: SyncSender<SpanData>,
    message_sender: SyncSender<BatchMessage>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
    is_shutdown: AtomicBool,
    dropped_span_count: AtomicUsize,
    queued: Arc<AtomicUsize>,
    spans_available_sent: Arc<AtomicBool>,
    max_export_batch_size: usize,
    max_queue_size: usize,
}

impl BatchSpanProcessor {
    /// Start the worker thread for `exporter`.
    pub fn new<E>(exporter: E, config: BatchConfig) -> Self
    where
        E: SpanExporter + 'static,
    {
        let (span_sender, span_receiver) = mpsc::sync_channel(config.max_queue_size);
        let (message_sender, message_receiver) = mpsc::sync_channel(64);
        let queued = Arc::new(AtomicUsize::new(0));
        let spans_available_sent = Arc::new(AtomicBool::new(false));
        let (max_export_batch_size, max_queue_size) =
            (config.max_export_batch_size, config.max_queue_size);

        let worker = BatchWorker {
            exporter: Box::new(exporter),
            spans: span_receiver,
            messages: message_receiver,
            queued: queued.clone(),
            spans_available_sent: spans_available_sent.clone(),
            config,
        };
        let handle = thread::Builder::new()
            .name("BatchSpanProcessorThread".to_string())
            .spawn(move || worker.run());
        let handle = match handle {
            Ok(handle) => Some(handle),
            Err(err) => {
                tl_error!(
                    name: "BatchSpanProcessor.ThreadSpawnFailed",
                    error = err.to_string()
                );
                None
            }
        };

        BatchSpanProcessor {
            span_sender,
            message_sender,
            handle: Mutex::new(handle),
            is_shutdown: AtomicBool::new(false),
            dropped_span_count: AtomicUsize::new(0),
            queued,
            spans_available_sent,
            max_export_batch_size,
            max_queue_size,
        }
    }

    /// Builder with the environment-derived [`BatchConfig`].
    pub fn builder<E>(exporter: E) -> BatchSpanProcessorBuilder<E>
    where
        E: SpanExporter + 'static,
    {
        BatchSpanProcessorBuilder {
            exporter,
            config: BatchConfig::default(),
        }
    }

    /// Number of spans dropped because the queue was full.
    pub fn dropped_span_count(&self) -> usize {
        self.dropped_span_count.load(Ordering::Relaxed)
    }

    fn request(
        &self,
        message: impl FnOnce(SyncSender<SdkResult>) -> BatchMessage,
        timeout: Duration,
    ) -> SdkResult {
        let (sender, receiver) = mpsc::sync_channel(1);
        self.message_sender
            .try_send(message(sender))
            .map_err(|err| SdkError::InternalFailure(format!("worker unreachable: {}", err)))?;
        match receiver.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(SdkError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(SdkError::InternalFailure(
                "worker exited before replying".into(),
            )),
        }
    }
}

impl SpanProcessor for BatchSpanProcessor {
    fn on_start(&self, _span: &mut Span, _cx: &Context) {}

    fn on_end(&self, span: SpanData) -> SdkResult {
        if self.is_shutdown.load(Ordering::Relaxed) {
            return Err(SdkError::AlreadyShutdown);
        }
        if !span.span_context.is_sampled() {
            return Ok(());
        }

        match self.span_sender.try_send(span) {
            Ok(()) => {
                let queued = self.queued.fetch_add(1, Ordering::Relaxed) + 1;
                if queued >= self.max_export_batch_size
                    && !self.spans_available_sent.swap(true, Ordering::Relaxed)
                {
                    // Losing this wake-up only delays export to the next tick.
                    let _ = self.message_sender.try_send(BatchMessage::SpansAvailable);
                }
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                if self.dropped_span_count.fetch_add(1, Ordering::Relaxed) == 0 {
                    tl_warn!(
                        name: "BatchSpanProcessor.SpanDroppingStarted",
                        max_queue_size = self.max_queue_size,
                        message = "span queue is full; dropping spans until it drains, total reported at shutdown"
                    );
                }
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => Err(SdkError::InternalFailure(
                "batch worker is not running".into(),
            )),
        }
    }

    fn force_flush_with_timeout(&self, timeout: Duration) -> SdkResult {
        if self.is_shutdown.load(Ordering::Relaxed) {
            return Err(SdkError::AlreadyShutdown);
        }
        self.request(BatchMessage::ForceFlush, timeout)
    }

    fn shutdown_with_timeout(&self, timeout: Duration) -> SdkResult {
        if self.is_shutdown.swap(true, Ordering::Relaxed) {
            return Err(SdkError::AlreadyShutdown);
        }
        let dropped = self.dropped_span_count.load(Ordering::Relaxed);
        if dropped > 0 {
            tl_warn!(
                name: "BatchSpanProcessor.SpansDropped",
                dropped_span_count = dropped,
                max_queue_size = self.max_queue_size
            );
        }

        let result = self.request(BatchMessage::Shutdown, timeout);
        if result.is_ok() {
            if let Some(handle) = self.handle.lock()?.take() {
                if handle.join().is_err() {
                    return Err(SdkError::InternalFailure("batch worker panicked".into()));
                }
            }
        }
        result
    }

    fn set_resource(&mut self, resource: &Resource) {
        let _ = self
            .message_sender
            .try_send(BatchMessage::SetResource(Arc::new(resource.clone())));
    }
}

struct BatchWorker {
    exporter: Box<dyn SpanExporter>,
    spans: Receiver<SpanData>,
    messages: Receiver<BatchMessage>,
    queued: Arc<AtomicUsize>,
    spans_available_sent: Arc<AtomicBool>,
    config: BatchConfig,
}

impl BatchWorker {
    fn run(mut self) {
        let mut last_export = Instant::now();
        loop {
            let wait = self.config.scheduled_delay.saturating_sub(last_export.elapsed());
            match self.messages.recv_timeout(wait) {
                Ok(BatchMessage::SpansAvailable) => {
                    self.spans_available_sent.store(false, Ordering::Relaxed);
                    let _ = self.export_queued();
                    last_export = Instant::now();
                }
                Ok(BatchMessage::ForceFlush(reply)) => {
                    let result = self.export_queued().and_then(|_| self.exporter.force_flush());
                    let _ = reply.send(result);
                    last_export = Instant::now();
                }
                Ok(BatchMessage::Shutdown(reply)) => {
                    let flushed = self.export_queued();
                    let closed = self.exporter.shutdown();
                    let _ = reply.send(flushed.and(closed));
                    tl_debug!(name: "BatchSpanProcessor.ThreadExiting", reason = "shutdown");
                    break;
                }
                Ok(BatchMessage::SetResource(resource)) => {
                    self.exporter.set_resource(&resource);
                }
                Err(RecvTimeoutError::Timeout) => {
                    let _ = self.export_queued();
                    last_export = Instant::now();
                }
                Err(RecvTimeoutError::Disconnected) => {
                    tl_debug!(name: "BatchSpanProcessor.ThreadExiting", reason = "processor dropped");
                    break;
                }
            }
        }
    }

    /// Export everything currently queued in batches of at most
    /// `max_export_batch_size`. Returns the first export error.
    fn export_queued(&mut self) -> SdkResult {
        let mut result = Ok(());
        loop {
            let batch: Vec<SpanData> = self
                .spans
                .try_iter()
                .take(self.config.max_export_batch_size)
                .collect();
            if batch.is_empty() {
                return result;
            }
            self.queued.fetch_sub(batch.len(), Ordering::Relaxed);

            let started = Instant::now();
            let mut exported = block_on(self.exporter.export(batch));
            if exported.is_ok() && started.elapsed() > self.config.max_export_timeout {
                exported = Err(SdkError::Timeout(self.config.max_export_timeout));
            }
            if let Err(err) = exported {
                tl_error!(name: "BatchSpanProcessor.ExportError", error = err.to_string());
                if result.is_ok() {
                    result = Err(err);
                }
            }
        }
    }
}

/// Builder for [`BatchSpanProcessor`].
#[derive(Debug)]
pub struct BatchSpanProcessorBuilder<E> {
    exporter: E,
    config: BatchConfig,
}

impl<E> BatchSpanProcessorBuilder<E>
where
    E: SpanExporter + 'static,
{
    /// Replace the batch configuration.
    pub fn with_batch_config(self, config: BatchConfig) -> Self {
        BatchSpanProcessorBuilder { config, ..self }
    }

    /// Start the processor.
    pub fn build(self) -> BatchSpanProcessor {
        BatchSpanProcessor::new(self.exporter, self.config)
    }
}

/// Queue and timing settings for [`BatchSpanProcessor`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    pub(crate) max_queue_size: usize,
    pub(crate) scheduled_delay: Duration,
    pub(crate) max_export_batch_size: usize,
    pub(crate) max_export_timeout: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfigBuilder::default().build()
    }
}

/// Builder for [`BatchConfig`]. Starts from the defaults overridden by the
/// `OTEL_BSP_*` environment variables.
#[derive(Debug)]
pub struct BatchConfigBuilder {
    max_queue_size: usize,
    scheduled_delay: Duration,
    max_export_batch_size: usize,
    max_export_timeout: Duration,
}

impl Default for BatchConfigBuilder {
    fn default() -> Self {
        BatchConfigBuilder {
            max_queue_size: OTEL_BSP_MAX_QUEUE_SIZE_DEFAULT,
            scheduled_delay: Duration::from_millis(OTEL_BSP_SCHEDULE_DELAY_DEFAULT),
            max_export_batch_size: OTEL_BSP_MAX_EXPORT_BATCH_SIZE_DEFAULT,
            max_export_timeout: Duration::from_millis(OTEL_BSP_EXPORT_TIMEOUT_DEFAULT),
        }
        .init_from_env_vars()
    }
}

impl BatchConfigBuilder {
    /// Capacity of the span queue.
    pub fn with_max_queue_size(mut self, max_queue_size: usize) -> Self {
        self.max_queue_size = max_queue_size;
        self
    }

    /// Largest batch handed to the exporter. Clamped to the queue size.
    pub fn with_max_export_batch_size(mut self, max_export_batch_size: usize) -> Self {
        self.max_export_batch_size = max_export_batch_size;
        self
    }

    /// Longest time a span waits in the queue when batches stay small.
    pub fn with_scheduled_delay(mut self, scheduled_delay: Duration) -> Self {
        self.scheduled_delay = scheduled_delay;
        self
    }

    /// Exports slower than this are reported as timeouts.
    pub fn with_max_export_timeout(mut self, max_export_timeout: Duration) -> Self {
        self.max_export_timeout = max_export_timeout;
        self
    }

    /// Finish the configuration.
    pub fn build(self) -> BatchConfig {
        let max_queue_size = self.max_queue_size.max(1);
        BatchConfig {
            max_queue_size,
            scheduled_delay: self.scheduled_delay,
            max_export_batch_size: self.max_export_batch_size.clamp(1, max_queue_size),
            max_export_timeout: self.max_export_timeout,
        }
    }

    fn init_from_env_vars(mut self) -> Self {
        if let Some(size) = env_parse::<usize>(OTEL_BSP_MAX_QUEUE_SIZE) {
            self.max_queue_size = size;
        }
        if let Some(delay) = env_parse::<u64>(OTEL_BSP_SCHEDULE_DELAY) {
            self.scheduled_delay = Duration::from_millis(delay);
        }
        if let Some(size) = env_parse::<usize>(OTEL_BSP_MAX_EXPORT_BATCH_SIZE) {
            self.max_export_batch_size = size;
        }
        if let Some(timeout) = env_parse::<u64>(OTEL_BSP_EXPORT_TIMEOUT) {
            self.max_export_timeout = Duration::from_millis(timeout);
        }
        self
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{InMemorySpanExporter, SpanEvents};
    use futures_util::future::BoxFuture;
    use tracelink::trace::{
        SpanContext, SpanId, SpanKind, Status, TraceFlags, TraceId, TraceState,
    };
    use tracelink::InstrumentationScope;

    fn span_data(sampled: bool) -> SpanData {
        let now = tracelink::time::now();
        SpanData {
            span_context: SpanContext::new(
                TraceId::from(1),
                SpanId::from(1),
                TraceFlags::default().with_sampled(sampled),
                false,
                TraceState::NONE,
            ),
            parent_span_id: SpanId::INVALID,
            span_kind: SpanKind::Internal,
            name: "processor-test".into(),
            start_time: now,
            end_time: now,
            attributes: Vec::new(),
            dropped_attributes_count: 0,
            events: SpanEvents::default(),
            status: Status::Unset,
            instrumentation_scope: InstrumentationScope::new("test"),
        }
    }

    const BSP_VARS: [&str; 4] = [
        OTEL_BSP_SCHEDULE_DELAY,
        OTEL_BSP_EXPORT_TIMEOUT,
        OTEL_BSP_MAX_QUEUE_SIZE,
        OTEL_BSP_MAX_EXPORT_BATCH_SIZE,
    ];

    #[test]
    fn simple_exports_sampled_spans_only() {
        let exporter = InMemorySpanExporter::default();
        let processor = SimpleSpanProcessor::new(exporter.clone());
        processor.on_end(span_data(true)).unwrap();
        processor.on_end(span_data(false)).unwrap();
        assert_eq!(exporter.get_finished_spans().unwrap().len(), 1);
    }

    /// Exporter whose every call takes `delay`.
    #[derive(Debug)]
    struct SlowExporter {
        delay: Duration,
    }

    impl SpanExporter for SlowExporter {
        fn export(&mut self, _batch: Vec<SpanData>) -> BoxFuture<'static, SdkResult> {
            thread::sleep(self.delay);
            Box::pin(futures_util::future::ready(Ok(())))
        }

        fn force_flush(&mut self) -> SdkResult {
            thread::sleep(self.delay);
            Ok(())
        }

        fn shutdown(&mut self) -> SdkResult {
            thread::sleep(self.delay);
            Ok(())
        }
    }

    #[test]
    fn simple_reports_overrun_exporter_calls() {
        let processor = SimpleSpanProcessor::new(SlowExporter {
            delay: Duration::from_millis(60),
        })
        .with_export_timeout(Duration::from_millis(10));

        assert_eq!(
            processor.on_end(span_data(true)),
            Err(SdkError::Timeout(Duration::from_millis(10)))
        );
        assert_eq!(
            processor.force_flush_with_timeout(Duration::from_millis(20)),
            Err(SdkError::Timeout(Duration::from_millis(20)))
        );
        assert_eq!(processor.force_flush_with_timeout(Duration::from_secs(5)), Ok(()));
        assert_eq!(
            processor.shutdown_with_timeout(Duration::from_millis(20)),
            Err(SdkError::Timeout(Duration::from_millis(20)))
        );
    }

    #[test]
    fn simple_shutdown_is_terminal() {
        let exporter = InMemorySpanExporter::default();
        let processor = SimpleSpanProcessor::new(exporter.clone());
        processor.shutdown().unwrap();
        assert_eq!(processor.shutdown(), Err(SdkError::AlreadyShutdown));
        assert_eq!(
            processor.on_end(span_data(true)),
            Err(SdkError::AlreadyShutdown)
        );
        assert_eq!(processor.force_flush(), Err(SdkError::AlreadyShutdown));
    }

    #[test]
    fn default_batch_config() {
        let config = temp_env::with_vars_unset(BSP_VARS, BatchConfig::default);
        assert_eq!(config.max_queue_size, OTEL_BSP_MAX_QUEUE_SIZE_DEFAULT);
        assert_eq!(
            config.scheduled_delay,
            Duration::from_millis(OTEL_BSP_SCHEDULE_DELAY_DEFAULT)
        );
        assert_eq!(
            config.max_export_batch_size,
            OTEL_BSP_MAX_EXPORT_BATCH_SIZE_DEFAULT
        );
        assert_eq!(
            config.max_export_timeout,
            Duration::from_millis(OTEL_BSP_EXPORT_TIMEOUT_DEFAULT)
        );
    }

    #[test]
    fn batch_config_from_env() {
        let config = temp_env::with_vars(
            [
                (OTEL_BSP_SCHEDULE_DELAY, Some("2000")),
                (OTEL_BSP_EXPORT_TIMEOUT, Some("60000")),
                (OTEL_BSP_MAX_QUEUE_SIZE, Some("256")),
                (OTEL_BSP_MAX_EXPORT_BATCH_SIZE, Some("1024")),
            ],
            BatchConfig::default,
        );
        assert_eq!(config.scheduled_delay, Duration::from_millis(2000));
        assert_eq!(config.max_export_timeout, Duration::from_millis(60000));
        assert_eq!(config.max_queue_size, 256);
        // clamped to the queue size
        assert_eq!(config.max_export_batch_size, 256);
    }

    #[test]
    fn batch_config_builder_overrides_env() {
        let config = temp_env::with_vars([(OTEL_BSP_MAX_QUEUE_SIZE, Some("10"))], || {
            BatchConfigBuilder::default()
                .with_max_queue_size(20)
                .with_max_export_batch_size(5)
                .with_scheduled_delay(Duration::from_millis(7))
                .build()
        });
        assert_eq!(config.max_queue_size, 20);
        assert_eq!(config.max_export_batch_size, 5);
        assert_eq!(config.scheduled_delay, Duration::from_millis(7));
    }

    #[test]
    fn batch_flush_exports_pending_spans() {
        let exporter = InMemorySpanExporter::default();
        let config = BatchConfigBuilder::default()
            .with_scheduled_delay(Duration::from_secs(3600))
            .build();
        let processor = BatchSpanProcessor::new(exporter.clone(), config);
        for _ in 0..3 {
            processor.on_end(span_data(true)).unwrap();
        }
        processor.on_end(span_data(false)).unwrap();
        processor.force_flush().unwrap();
        assert_eq!(exporter.get_finished_spans().unwrap().len(), 3);
        processor.shutdown().unwrap();
    }

    #[test]
    fn batch_exports_when_batch_is_full() {
        let exporter = InMemorySpanExporter::default();
        let config = BatchConfigBuilder::default()
            .with_scheduled_delay(Duration::from_secs(3600))
            .with_max_export_batch_size(2)
            .build();
        let processor = BatchSpanProcessor::new(exporter.clone(), config);
        processor.on_end(span_data(true)).unwrap();
        processor.on_end(span_data(true)).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while exporter.get_finished_spans().unwrap().len() < 2 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(exporter.get_finished_spans().unwrap().len(), 2);
        processor.shutdown().unwrap();
    }

    #[test]
    fn batch_shutdown_flushes_and_is_terminal() {
        let exporter = InMemorySpanExporter::default();
        let processor = BatchSpanProcessor::builder(exporter.clone())
            .with_batch_config(
                BatchConfigBuilder::default()
                    .with_scheduled_delay(Duration::from_secs(3600))
                    .build(),
            )
            .build();
        processor.on_end(span_data(true)).unwrap();
        processor.shutdown().unwrap();
        assert_eq!(exporter.get_finished_spans().unwrap().len(), 1);
        assert_eq!(processor.shutdown(), Err(SdkError::AlreadyShutdown));
        assert_eq!(processor.force_flush(), Err(SdkError::AlreadyShutdown));
        assert_eq!(
            processor.on_end(span_data(true)),
            Err(SdkError::AlreadyShutdown)
        );
    }

    /// Blocks every export until the gate opens.
    #[derive(Debug, Clone)]
    struct GatedExporter {
        gate: Arc<(Mutex<bool>, std::sync::Condvar)>,
    }

    impl GatedExporter {
        fn new() -> Self {
            GatedExporter {
                gate: Arc::new((Mutex::new(false), std::sync::Condvar::new())),
            }
        }

        fn open(&self) {
            let (lock, cvar) = &*self.gate;
            *lock.lock().unwrap() = true;
            cvar.notify_all();
        }
    }

    impl SpanExporter for GatedExporter {
        fn export(&mut self, _batch: Vec<SpanData>) -> BoxFuture<'static, SdkResult> {
            let (lock, cvar) = &*self.gate;
            let mut open = lock.lock().unwrap();
            while !*open {
                open = cvar.wait(open).unwrap();
            }
            Box::pin(async { Ok(()) })
        }
    }

    #[test]
    fn full_queue_drops_and_counts() {
        let exporter = GatedExporter::new();
        let config = BatchConfigBuilder::default()
            .with_max_queue_size(2)
            .with_max_export_batch_size(1)
            .with_scheduled_delay(Duration::from_secs(3600))
            .build();
        let processor = BatchSpanProcessor::new(exporter.clone(), config);

        // the worker takes one span and blocks in export; the queue then fills
        for _ in 0..10 {
            processor.on_end(span_data(true)).unwrap();
        }
        assert!(processor.dropped_span_count() > 0);

        exporter.open();
        processor.shutdown().unwrap();
    }

    #[test]
    fn flush_times_out_when_export_blocks() {
        let exporter = GatedExporter::new();
        let processor = BatchSpanProcessor::new(
            exporter.clone(),
            BatchConfigBuilder::default()
                .with_scheduled_delay(Duration::from_secs(3600))
                .build(),
        );
        processor.on_end(span_data(true)).unwrap();
        assert_eq!(
            processor.force_flush_with_timeout(Duration::from_millis(50)),
            Err(SdkError::Timeout(Duration::from_millis(50)))
        );
        exporter.open();
        let _ = processor.shutdown();
    }
}
