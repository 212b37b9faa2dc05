use std::fmt;
use std::path::PathBuf;

use chrono::Utc;
use tracing::Span;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::error::{RelayError, Result};

const DEFAULT_MAX_LOG_FILES: usize = 5;
const DEFAULT_LOG_FILTER: &str = "info";
const LOG_FILE_PREFIX: &str = "status_relay";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Attached to every invocation span.
    pub function_name: String,
    pub format: LogFormat,
    /// Also write rolling log files here when set.
    pub directory: Option<PathBuf>,
}

/// RFC 3339 in UTC, whole seconds, no offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct UtcSecondsTimer;

impl FormatTime for UtcSecondsTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", Utc::now().format("%Y-%m-%dT%H:%M:%SZ"))
    }
}

pub struct FileLogger {
    log_directory: PathBuf,
    max_files: usize,
    rotation: Rotation,
}

impl FileLogger {
    pub fn new(log_directory: PathBuf) -> Self {
        Self {
            log_directory,
            max_files: DEFAULT_MAX_LOG_FILES,
            rotation: Rotation::DAILY,
        }
    }

    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn setup_file_logging(&self) -> Result<(NonBlocking, WorkerGuard)> {
        std::fs::create_dir_all(&self.log_directory)?;

        let file_appender = RollingFileAppender::builder()
            .rotation(self.rotation.clone())
            .filename_prefix(LOG_FILE_PREFIX)
            .max_log_files(self.max_files)
            .build(&self.log_directory)
            .map_err(|e| {
                RelayError::ConfigError(format!("Failed to create log file appender: {}", e))
            })?;

        Ok(tracing_appender::non_blocking(file_appender))
    }
}

fn console_layer(format: LogFormat) -> Box<dyn Layer<Registry> + Send + Sync> {
    match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_timer(UtcSecondsTimer)
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_timer(UtcSecondsTimer)
            .boxed(),
    }
}

/// Installs the global subscriber. The returned guard must stay alive for
/// file logging to keep flushing.
pub fn setup_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let mut layers = vec![console_layer(config.format)];
    let mut guard = None;

    if let Some(directory) = &config.directory {
        let (writer, file_guard) = FileLogger::new(directory.clone()).setup_file_logging()?;
        layers.push(
            tracing_subscriber::fmt::layer()
                .json()
                .with_timer(UtcSecondsTimer)
                .with_current_span(true)
                .with_writer(writer)
                .with_ansi(false)
                .boxed(),
        );
        guard = Some(file_guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| RelayError::ConfigError(format!("Failed to initialise logging: {}", e)))?;

    Ok(guard)
}

/// The first dash-separated group of a request id, enough to correlate log lines.
pub fn short_request_id(request_id: &str) -> &str {
    request_id.split('-').next().unwrap_or(request_id)
}

/// Span wrapping a single invocation.
pub fn invocation_span(function_name: &str, request_id: &str) -> Span {
    tracing::info_span!(
        "invocation",
        function = %function_name,
        request_id = %short_request_id(request_id)
    )
}
