//! Opt-in `tracing` subscriber for hosts and test suites.
//!
//! The analysis only emits events (targets `modules`, `loader`, `names`,
//! `schema`, `scanner`); nothing is printed unless a subscriber is installed.

use std::env;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::{self, writer::BoxMakeWriter, writer::TestWriter};

/// Filter used when neither the caller nor `GOSEM_LOG` supplies a valid one.
pub const DEFAULT_FILTER: &str = "warn";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" | "compact" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Subscriber settings. `filter` takes `EnvFilter` directives such as
/// `loader=debug,schema=trace`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogOptions {
    pub format: LogFormat,
    pub filter: String,
    /// Write through the test harness so output is captured per test.
    pub capture: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            filter: DEFAULT_FILTER.to_string(),
            capture: false,
        }
    }
}

impl LogOptions {
    /// Defaults overridden by `GOSEM_LOG` and `GOSEM_LOG_FORMAT`.
    #[must_use]
    pub fn from_env() -> Self {
        let filter = env::var("GOSEM_LOG").ok();
        let format = env::var("GOSEM_LOG_FORMAT").ok();
        Self::default().with_env(filter.as_deref(), format.as_deref())
    }

    /// Environment settings with output routed through the test harness.
    #[must_use]
    pub fn for_tests() -> Self {
        Self {
            capture: true,
            ..Self::from_env()
        }
    }

    fn with_env(mut self, filter: Option<&str>, format: Option<&str>) -> Self {
        if let Some(filter) = filter.map(str::trim).filter(|filter| !filter.is_empty()) {
            self.filter = filter.to_string();
        }
        if let Some(format) = format.and_then(LogFormat::parse) {
            self.format = format;
        }
        self
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }

    fn writer(&self) -> BoxMakeWriter {
        if self.capture {
            BoxMakeWriter::new(TestWriter::new())
        } else {
            BoxMakeWriter::new(std::io::stderr)
        }
    }
}

/// Install the global subscriber. Returns `false` when one was already set,
/// in which case `options` are ignored.
pub fn init_logging(options: &LogOptions) -> bool {
    let builder = fmt::fmt()
        .with_env_filter(options.env_filter())
        .with_writer(options.writer())
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true);
    match options.format {
        LogFormat::Json => {
            tracing::subscriber::set_global_default(builder.json().finish()).is_ok()
        }
        LogFormat::Text => {
            tracing::subscriber::set_global_default(builder.compact().finish()).is_ok()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_names_parse() {
        assert_eq!(LogFormat::parse("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse(" text "), Some(LogFormat::Text));
        assert_eq!(LogFormat::parse("yaml"), None);
    }

    #[test]
    fn environment_overrides_defaults() {
        let options = LogOptions::default().with_env(Some("loader=debug"), Some("json"));
        assert_eq!(options.filter, "loader=debug");
        assert_eq!(options.format, LogFormat::Json);

        let untouched = LogOptions::default().with_env(Some("  "), Some("xml"));
        assert_eq!(untouched, LogOptions::default());
    }

    #[test]
    fn invalid_filter_falls_back_to_default() {
        let options = LogOptions {
            filter: "loader=nonsense=1".to_string(),
            ..LogOptions::default()
        };
        assert_eq!(
            options.env_filter().to_string(),
            EnvFilter::new(DEFAULT_FILTER).to_string()
        );
    }

    #[test]
    fn only_the_first_subscriber_is_installed() {
        init_logging(&LogOptions::for_tests());
        assert!(!init_logging(&LogOptions::for_tests()));
        tracing::warn!(target: "loader", stage = "test", "subscriber already installed");
    }
}
