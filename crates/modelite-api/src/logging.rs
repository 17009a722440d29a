//! Logging configuration for Modelite
//!
//! Every crate of the workspace emits `tracing` events: translated native
//! queries at `debug`, connection and snapshot lifecycle at `info`,
//! rollbacks and discarded delayed calls at `warn`. [`LogConfig`] installs a
//! subscriber printing them to stdout, to a daily-rolling file, or both.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "modelite.log";

/// Log output destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogOutput {
    /// Output to stdout
    Stdout,
    /// Output to a file with daily rotation
    File(PathBuf),
    /// Output to both stdout and file
    Both(PathBuf),
}

/// Log format style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable multi-line format (default)
    Pretty,
    /// Compact single-line format
    Compact,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive (`info`, `modelite_sql=debug`, ...); `RUST_LOG`
    /// takes precedence when set
    pub level: String,
    /// Output destination
    pub output: LogOutput,
    /// Format style
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            output: LogOutput::Stdout,
            format: LogFormat::Pretty,
        }
    }
}

impl LogConfig {
    /// Info level, stdout output
    pub fn info() -> Self {
        Self::default()
    }

    /// Debug level: shows every translated query
    pub fn debug() -> Self {
        Self::default().with_level("debug")
    }

    pub fn warn() -> Self {
        Self::default().with_level("warn")
    }

    /// Set log output to file with rotation
    pub fn with_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output = LogOutput::File(path.into());
        self
    }

    /// Set log output to both stdout and file
    pub fn with_both<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output = LogOutput::Both(path.into());
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level<S: Into<String>>(mut self, level: S) -> Self {
        self.level = level.into();
        self
    }

    /// Filter built from `RUST_LOG`, or from `level` when the variable is unset
    pub fn env_filter(&self) -> Result<EnvFilter> {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .map_err(|e| Error::Config(format!("Invalid log level '{}': {}", self.level, e)))
    }

    /// Install the global subscriber.
    ///
    /// Returns the file writer guard when logging to a file; keep it alive
    /// for the lifetime of the application, dropping it flushes and stops
    /// the writer thread. Fails with [`Error::Config`] when the level is
    /// invalid or a global subscriber is already installed.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use modelite::logging::LogConfig;
    ///
    /// let _guard = LogConfig::debug().with_file("logs/modelite.log").init()?;
    /// # Ok::<(), modelite::Error>(())
    /// ```
    pub fn init(self) -> Result<Option<WorkerGuard>> {
        let filter = self.env_filter()?;
        let (to_stdout, file) = match &self.output {
            LogOutput::Stdout => (true, None),
            LogOutput::File(path) => (false, Some(path.as_path())),
            LogOutput::Both(path) => (true, Some(path.as_path())),
        };
        let (writer, guard) = match file {
            Some(path) => {
                let (writer, guard) = tracing_appender::non_blocking(file_appender(path));
                (Some(writer), Some(guard))
            }
            None => (None, None),
        };

        let pretty = self.format == LogFormat::Pretty;
        let stdout_pretty = (to_stdout && pretty).then(|| fmt::layer().pretty());
        let stdout_compact = (to_stdout && !pretty).then(|| fmt::layer().compact());
        let file_pretty = writer
            .clone()
            .filter(|_| pretty)
            .map(|w| fmt::layer().with_writer(w).with_ansi(false).pretty());
        let file_compact = writer
            .filter(|_| !pretty)
            .map(|w| fmt::layer().with_writer(w).with_ansi(false).compact());

        tracing_subscriber::registry()
            .with(filter)
            .with(stdout_pretty)
            .with(stdout_compact)
            .with(file_pretty)
            .with(file_compact)
            .try_init()
            .map_err(|e| Error::Config(format!("Cannot install log subscriber: {}", e)))?;
        Ok(guard)
    }
}

fn file_appender(path: &Path) -> RollingFileAppender {
    let directory = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(DEFAULT_LOG_FILE);
    tracing_appender::rolling::daily(directory, file_name)
}
