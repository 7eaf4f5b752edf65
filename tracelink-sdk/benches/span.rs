use criterion::{black_box, criterion_group, criterion_main, Criterion};
use futures_util::future::BoxFuture;
use std::collections::HashMap;
use tracelink::propagation::TextMapPropagator;
use tracelink::{Context, KeyValue};
use tracelink_sdk::error::SdkResult;
use tracelink_sdk::propagation::TraceContextPropagator;
use tracelink_sdk::trace::{SdkTracerProvider, SpanData, SpanExporter};

#[derive(Debug)]
struct NoopExporter;

impl SpanExporter for NoopExporter {
    fn export(&mut self, _batch: Vec<SpanData>) -> BoxFuture<'static, SdkResult> {
        Box::pin(futures_util::future::ready(Ok(())))
    }
}

fn criterion_benchmark(c: &mut Criterion) {
    let provider = SdkTracerProvider::builder()
        .with_simple_exporter(NoopExporter)
        .build();
    let tracer = provider.tracer("bench");
    let mut group = c.benchmark_group("span");

    group.bench_function("start-end-root", |b| {
        b.iter(|| {
            let (_, mut span) = tracer.start_span(&Context::new(), "root", vec![]);
            span.end();
        })
    });

    group.bench_function("start-end-child-with-attributes", |b| {
        let (parent_cx, _parent) = tracer.start_span(&Context::new(), "parent", vec![]);
        b.iter(|| {
            let (_, mut span) = tracer.start_span(
                &parent_cx,
                "child",
                vec![KeyValue::new("x", 42), KeyValue::new("y", 1813)],
            );
            span.end();
        })
    });
    group.finish();

    let propagator = TraceContextPropagator::new();
    let (cx, _span) = tracer.start_span(&Context::new(), "carrier", vec![]);
    let mut carrier: HashMap<String, String> = HashMap::new();
    propagator.inject_context(&cx, &mut carrier);

    let mut group = c.benchmark_group("traceparent");
    group.bench_function("inject", |b| {
        b.iter(|| {
            let mut out: HashMap<String, String> = HashMap::new();
            propagator.inject_context(black_box(&cx), &mut out);
            out
        })
    });
    group.bench_function("extract", |b| {
        b.iter(|| propagator.extract(black_box(&carrier)))
    });
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
