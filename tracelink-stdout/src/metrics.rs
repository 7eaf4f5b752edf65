use crate::common::{format_time, Output, Writer};
use std::fmt::{self, Write as _};
use std::time::SystemTime;
use tracelink_sdk::error::SdkResult;
use tracelink_sdk::metrics::CounterData;
use tracelink_sdk::Resource;

/// Writes counter snapshots to stdout.
#[derive(Debug)]
pub struct MetricExporter {
    output: Output,
}

impl Default for MetricExporter {
    fn default() -> Self {
        MetricExporter {
            output: Output::stdout(),
        }
    }
}

impl MetricExporter {
    /// Write to `writer` instead of stdout.
    pub fn with_writer<W: std::io::Write + Send + 'static>(writer: W) -> Self {
        MetricExporter {
            output: Output::new(Box::new(writer) as Writer),
        }
    }
}

impl tracelink_sdk::metrics::MetricExporter for MetricExporter {
    fn export(&self, metrics: &[CounterData]) -> SdkResult {
        let collected_at = SystemTime::now();
        self.output
            .emit("Metrics", |text| print_metrics(text, metrics, collected_at))
    }

    fn shutdown(&self) -> SdkResult {
        self.output.shutdown()
    }

    fn set_resource(&mut self, resource: &Resource) {
        self.output.set_resource(resource);
    }
}

fn print_metrics(text: &mut String, metrics: &[CounterData], at: SystemTime) -> fmt::Result {
    writeln!(text, "\t Collected at: {}", format_time(at))?;
    for (i, counter) in metrics.iter().enumerate() {
        writeln!(text, "Metric #{i}")?;
        writeln!(text, "\t Name: {}", counter.name)?;
        if !counter.description.is_empty() {
            writeln!(text, "\t Description: {}", counter.description)?;
        }
        writeln!(text, "\t Type: Sum (monotonic, cumulative)")?;
        for (j, point) in counter.data_points.iter().enumerate() {
            writeln!(text, "\t DataPoint #{j}")?;
            writeln!(text, "\t\t Value: {}", point.value)?;
            if !point.attributes.is_empty() {
                writeln!(text, "\t\t Attributes:")?;
                for kv in &point.attributes {
                    writeln!(text, "\t\t\t ->  {}: {}", kv.key, kv.value)?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::test_writer::Captured;
    use tracelink::{Context, KeyValue};
    use tracelink_sdk::metrics::SdkMeterProvider;

    #[test]
    fn prints_every_series() {
        let captured = Captured::default();
        let provider = SdkMeterProvider::builder()
            .with_exporter(MetricExporter::with_writer(captured.clone()))
            .build();
        let counter = provider.counter("service_a_called_counter", "calls to service A");
        let cx = Context::new();
        counter.add(&cx, 2, &[KeyValue::new("handler_name", "serviceA"), KeyValue::new("req_size", 0)]);
        provider.counter("serviceB_call_counter", "").add(&cx, 1, &[]);
        provider.force_flush().unwrap();

        let text = captured.contents();
        assert!(text.contains("\t Name: service_a_called_counter"));
        assert!(text.contains("\t Description: calls to service A"));
        assert!(text.contains("\t\t\t ->  handler_name: serviceA"));
        assert!(text.contains("\t\t\t ->  req_size: 0"));
        assert!(text.contains("\t Name: serviceB_call_counter"));
        assert_eq!(text.matches("\t\t Value: ").count(), 2);
        assert!(text.contains("\t\t Value: 2"));
    }
}
