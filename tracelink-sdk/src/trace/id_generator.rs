//! Trace and span id generation.
use rand::{rngs, Rng, SeedableRng};
use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracelink::trace::{SpanId, TraceId};

/// Source of new ids. Generated ids must never be zero.
pub trait IdGenerator: Send + Sync + fmt::Debug {
    /// A fresh trace id.
    fn new_trace_id(&self) -> TraceId;

    /// A fresh span id.
    fn new_span_id(&self) -> SpanId;
}

/// Random ids from a per-thread generator seeded from the OS.
#[derive(Clone, Debug, Default)]
pub struct RandomIdGenerator {
    _private: (),
}

impl IdGenerator for RandomIdGenerator {
    fn new_trace_id(&self) -> TraceId {
        CURRENT_RNG.with(|rng| {
            let mut rng = rng.borrow_mut();
            loop {
                let id = rng.random::<u128>();
                if id != 0 {
                    return TraceId::from(id);
                }
            }
        })
    }

    fn new_span_id(&self) -> SpanId {
        CURRENT_RNG.with(|rng| {
            let mut rng = rng.borrow_mut();
            loop {
                let id = rng.random::<u64>();
                if id != 0 {
                    return SpanId::from(id);
                }
            }
        })
    }
}

thread_local! {
    static CURRENT_RNG: RefCell<rngs::SmallRng> = RefCell::new(rngs::SmallRng::from_os_rng());
}

/// Sequential ids starting at 1, for predictable output in tests and demos.
#[derive(Debug, Default)]
pub struct IncrementIdGenerator(AtomicU64);

impl IncrementIdGenerator {
    /// A generator whose first id is 1.
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for IncrementIdGenerator {
    fn new_trace_id(&self) -> TraceId {
        TraceId::from(u128::from(self.0.fetch_add(1, Ordering::SeqCst) + 1))
    }

    fn new_span_id(&self) -> SpanId {
        SpanId::from(self.0.fetch_add(1, Ordering::SeqCst) + 1)
    }
}
