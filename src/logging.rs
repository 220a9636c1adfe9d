//! Structured logging configuration.
//!
//! Uses `tracing` with `tracing-subscriber` for configurable log levels and
//! structured output.
//!
//! ## Environment Variables
//!
//! - `NITROCID_LOG` or `RUST_LOG`: log filter (e.g. `nitrocid=debug`)
//! - `NITROCID_LOG_FORMAT`: output format (`pretty`, `compact`, `json`)
//!
//! Log lines go to stderr by default. Full-screen commands log to a file
//! instead so the output does not tear through the alternate screen.

use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan, writer::BoxMakeWriter},
    prelude::*,
};

const DEFAULT_FILTER: &str = "nitrocid=warn";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    /// JSON lines for log aggregation
    Json,
}

impl LogFormat {
    /// Parse from string (case-insensitive); unknown values fall back to pretty.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "compact" => Self::Compact,
            _ => Self::Pretty,
        }
    }
}

/// Where log lines are written.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogTarget {
    #[default]
    Stderr,
    /// Append to this file
    File(PathBuf),
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log filter directive (e.g. "debug", "nitrocid=debug,warn")
    pub filter: String,
    pub format: LogFormat,
    pub target: LogTarget,
    /// Include span events (enter/exit)
    pub with_spans: bool,
    /// Include file/line in logs
    pub with_file: bool,
    /// Include thread names; useful with many kernel threads
    pub with_thread_names: bool,
    /// Include target (module path)
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            format: LogFormat::Pretty,
            target: LogTarget::Stderr,
            with_spans: false,
            with_file: false,
            with_thread_names: false,
            with_target: true,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let filter = std::env::var("NITROCID_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| DEFAULT_FILTER.to_string());

        let format = std::env::var("NITROCID_LOG_FORMAT")
            .map(|s| LogFormat::parse(&s))
            .unwrap_or_default();

        Self {
            filter,
            format,
            ..Default::default()
        }
    }

    pub fn debug() -> Self {
        Self {
            filter: "nitrocid=debug,info".to_string(),
            with_file: true,
            with_thread_names: true,
            ..Default::default()
        }
    }

    /// Redirect output to `path` (compact, no colours).
    pub fn to_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.target = LogTarget::File(path.into());
        if self.format == LogFormat::Pretty {
            self.format = LogFormat::Compact;
        }
        self
    }
}

/// Initialize the global tracing subscriber.
///
/// Only the first call installs a subscriber; later calls are ignored.
/// Fails only when the log file cannot be opened.
pub fn init(config: LogConfig) -> io::Result<()> {
    let env_filter =
        EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let span_events = if config.with_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let (writer, ansi) = match &config.target {
        LogTarget::Stderr => (BoxMakeWriter::new(io::stderr), true),
        LogTarget::File(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
    };

    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_span_events(span_events)
        .with_file(config.with_file)
        .with_line_number(config.with_file)
        .with_thread_names(config.with_thread_names)
        .with_target(config.with_target);

    match config.format {
        LogFormat::Json => {
            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(layer.json());
            let _ = tracing::subscriber::set_global_default(subscriber);
        }
        LogFormat::Compact => {
            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(layer.compact());
            let _ = tracing::subscriber::set_global_default(subscriber);
        }
        LogFormat::Pretty => {
            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(layer.pretty());
            let _ = tracing::subscriber::set_global_default(subscriber);
        }
    }
    Ok(())
}
