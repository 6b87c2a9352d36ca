//! Tracing setup shared by binaries: a plain-text log file plus optional stderr output.
//!
//! Filter comes from `RUST_LOG`, falling back to `default_filter`. The returned
//! guard flushes the non-blocking file writer on drop; keep it alive in `main`.

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Where and how to log.
#[derive(Debug, Clone)]
pub struct TracingOptions {
    /// Directory for the log file; created if missing.
    pub log_dir: PathBuf,
    pub file_name: String,
    /// Filter used when `RUST_LOG` is unset, e.g. `"tollgraph=info"`.
    pub default_filter: String,
    /// Also write events to stderr.
    pub stderr: bool,
}

impl TracingOptions {
    pub fn new(app_name: &str) -> Self {
        Self {
            log_dir: default_log_dir(app_name),
            file_name: format!("{app_name}.log"),
            default_filter: format!("{}=info", app_name.replace('-', "_")),
            stderr: false,
        }
    }

    pub fn with_stderr(mut self, on: bool) -> Self {
        self.stderr = on;
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join(&self.file_name)
    }
}

/// `<data dir>/<app_name>/logs`, or `./logs` when the platform has no data dir.
pub fn default_log_dir(app_name: &str) -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(app_name))
        .unwrap_or_else(|| Path::new(".").to_path_buf())
        .join("logs")
}

/// Installs the global subscriber. Fails if the log dir cannot be created or a
/// subscriber is already set.
pub fn init(options: &TracingOptions) -> Result<WorkerGuard, Box<dyn std::error::Error + Send + Sync>> {
    std::fs::create_dir_all(&options.log_dir)?;
    let file_appender = tracing_appender::rolling::never(&options.log_dir, &options.file_name);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&options.default_filter))
    };
    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_filter(filter());
    let stderr_layer = options.stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(filter())
    });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()?;
    Ok(guard)
}
