use crate::common::{format_time, Output, Writer};
use std::fmt::{self, Write as _};
use tracelink_sdk::error::SdkResult;
use tracelink_sdk::logs::LogRecord;
use tracelink_sdk::Resource;

/// Writes log records to stdout, one block per record.
#[derive(Debug)]
pub struct LogExporter {
    output: Output,
}

impl Default for LogExporter {
    fn default() -> Self {
        LogExporter {
            output: Output::stdout(),
        }
    }
}

impl LogExporter {
    /// Write to `writer` instead of stdout.
    pub fn with_writer<W: std::io::Write + Send + 'static>(writer: W) -> Self {
        LogExporter {
            output: Output::new(Box::new(writer) as Writer),
        }
    }
}

impl tracelink_sdk::logs::LogExporter for LogExporter {
    fn export(&self, record: &LogRecord) -> SdkResult {
        self.output.emit("Log", |text| print_log(text, record))
    }

    fn shutdown(&self) -> SdkResult {
        self.output.shutdown()
    }

    fn set_resource(&mut self, resource: &Resource) {
        self.output.set_resource(resource);
    }
}

fn print_log(text: &mut String, record: &LogRecord) -> fmt::Result {
    writeln!(text, "\t Target: {:?}", record.target)?;
    if let Some(trace_context) = &record.trace_context {
        writeln!(text, "\t TraceId: {}", trace_context.trace_id)?;
        writeln!(text, "\t SpanId: {}", trace_context.span_id)?;
        writeln!(text, "\t TraceFlags: {:02x}", trace_context.trace_flags.to_u8())?;
    }
    writeln!(text, "\t Timestamp: {}", format_time(record.timestamp))?;
    writeln!(text, "\t SeverityText: {}", record.severity)?;
    writeln!(text, "\t SeverityNumber: {}", record.severity as u8)?;
    writeln!(text, "\t Body: {:?}", record.body)?;
    if !record.attributes.is_empty() {
        writeln!(text, "\t Attributes:")?;
        for kv in &record.attributes {
            writeln!(text, "\t\t ->  {}: {}", kv.key, kv.value)?;
        }
    }
    Ok(())
}
