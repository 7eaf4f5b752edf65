use chrono::{DateTime, Utc};
use std::fmt::{self, Write as _};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::SystemTime;
use tracelink_sdk::error::{SdkError, SdkResult};
use tracelink_sdk::Resource;

pub(crate) type Writer = Box<dyn Write + Send>;

/// Destination shared by the exporters. Each export is rendered to a string
/// first and written with a single call, so concurrent exports never
/// interleave their lines.
pub(crate) struct Output {
    writer: Mutex<Writer>,
    resource: Resource,
    resource_emitted: AtomicBool,
    is_shutdown: AtomicBool,
}

impl Output {
    pub(crate) fn new(writer: Writer) -> Self {
        Output {
            writer: Mutex::new(writer),
            resource: Resource::builder().build(),
            resource_emitted: AtomicBool::new(false),
            is_shutdown: AtomicBool::new(false),
        }
    }

    pub(crate) fn stdout() -> Self {
        Output::new(Box::new(io::stdout()))
    }

    pub(crate) fn set_resource(&mut self, resource: &Resource) {
        self.resource = resource.clone();
    }

    pub(crate) fn shutdown(&self) -> SdkResult {
        self.is_shutdown.store(true, Ordering::SeqCst);
        if let Ok(mut writer) = self.writer.lock() {
            writer.flush().map_err(io_error)?;
        }
        Ok(())
    }

    /// Render `body` under `header`, prefixed by the resource on the first
    /// call, and write it out.
    pub(crate) fn emit<F>(&self, header: &str, body: F) -> SdkResult
    where
        F: FnOnce(&mut String) -> fmt::Result,
    {
        if self.is_shutdown.load(Ordering::SeqCst) {
            return Err(SdkError::AlreadyShutdown);
        }

        let mut text = String::new();
        let first = self
            .resource_emitted
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if first {
            write_resource(&mut text, &self.resource).map_err(fmt_error)?;
        }
        writeln!(text, "{header}").map_err(fmt_error)?;
        body(&mut text).map_err(fmt_error)?;

        let mut writer = self.writer.lock()?;
        writer.write_all(text.as_bytes()).map_err(io_error)?;
        writer.flush().map_err(io_error)
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Output")
            .field("is_shutdown", &self.is_shutdown.load(Ordering::Relaxed))
            .finish()
    }
}

fn write_resource(text: &mut String, resource: &Resource) -> fmt::Result {
    writeln!(text, "Resource")?;
    for (key, value) in resource.iter() {
        writeln!(text, "\t ->  {key}={value}")?;
    }
    Ok(())
}

pub(crate) fn format_time(time: SystemTime) -> String {
    let datetime: DateTime<Utc> = time.into();
    datetime.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

fn io_error(err: io::Error) -> SdkError {
    SdkError::InternalFailure(format!("stdout write failed: {err}"))
}

fn fmt_error(_: fmt::Error) -> SdkError {
    SdkError::InternalFailure("formatting failed".into())
}
