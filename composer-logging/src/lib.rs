//! Tracing subscriber setup shared by the composer repository binaries.
//!
//! Configured from the environment:
//!
//! - `LOG_LEVEL`: default filter when `RUST_LOG` is unset (`info`)
//! - `LOG_FORMAT`: `human` or `json` (`human`)
//! - `LOG_OUTPUT`: `console`, `file` or `both` (`console`)
//! - `LOG_FILE_PATH`: log file for the file output, rotated daily
//!   (`/tmp/composer-repo.log`)

use std::env;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter, Layer, Registry};

const DEFAULT_LOG_FILE: &str = "/tmp/composer-repo.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Human,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Console,
    File,
    Both,
    None,
}

impl LogOutput {
    fn console(self) -> bool {
        matches!(self, LogOutput::Console | LogOutput::Both)
    }

    fn file(self) -> bool {
        matches!(self, LogOutput::File | LogOutput::Both)
    }
}

/// Logging settings read from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: String,
    pub format: LogFormat,
    pub output: LogOutput,
    pub file_path: PathBuf,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Human,
            output: LogOutput::Console,
            file_path: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build settings from any variable source. Unknown values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let format = match lookup("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => defaults.format,
        };
        let output = match lookup("LOG_OUTPUT").as_deref() {
            Some("file") => LogOutput::File,
            Some("both") => LogOutput::Both,
            Some("none") => LogOutput::None,
            _ => defaults.output,
        };

        Self {
            level: lookup("LOG_LEVEL").unwrap_or(defaults.level),
            format,
            output,
            file_path: lookup("LOG_FILE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.file_path),
        }
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn fmt_layer<W>(writer: W, format: LogFormat) -> BoxedLayer
where
    W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer().with_writer(writer);
    match format {
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Human => layer.boxed(),
    }
}

/// Initializes the global tracing subscriber from the environment.
///
/// Keep the returned guard alive for the life of the process when file output
/// is enabled, otherwise buffered lines are lost on exit.
pub fn init_subscriber() -> Option<WorkerGuard> {
    init_with(&LogSettings::from_env())
}

/// Initializes the global tracing subscriber from explicit settings.
///
/// Does nothing if a global subscriber is already installed.
pub fn init_with(settings: &LogSettings) -> Option<WorkerGuard> {
    let mut env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));
    if let Ok(directive) = "tokio=warn".parse() {
        env_filter = env_filter.add_directive(directive);
    }

    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut guard = None;

    if settings.output.console() {
        layers.push(fmt_layer(std::io::stderr, settings.format));
    }

    if settings.output.file() {
        let log_dir = settings
            .file_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let log_filename = settings
            .file_path
            .file_name()
            .unwrap_or("composer-repo.log".as_ref());

        let file_appender = tracing_appender::rolling::daily(log_dir, log_filename);
        let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(worker_guard);
        layers.push(fmt_layer(non_blocking, settings.format));
    }

    // Filter sits outermost so it gates every output
    let _ = registry()
        .with(layers)
        .with(env_filter)
        .try_init();

    guard
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> LogSettings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LogSettings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        assert_eq!(settings(&[]), LogSettings::default());
    }

    #[test]
    fn test_settings_from_vars() {
        let s = settings(&[
            ("LOG_LEVEL", "debug"),
            ("LOG_FORMAT", "json"),
            ("LOG_OUTPUT", "both"),
            ("LOG_FILE_PATH", "/var/log/repo.log"),
        ]);
        assert_eq!(s.level, "debug");
        assert_eq!(s.format, LogFormat::Json);
        assert_eq!(s.output, LogOutput::Both);
        assert_eq!(s.file_path, PathBuf::from("/var/log/repo.log"));
        assert!(s.output.console() && s.output.file());
    }

    #[test]
    fn test_unknown_values_fall_back() {
        let s = settings(&[("LOG_FORMAT", "xml"), ("LOG_OUTPUT", "syslog")]);
        assert_eq!(s.format, LogFormat::Human);
        assert_eq!(s.output, LogOutput::Console);
    }
}
