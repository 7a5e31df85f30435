//! `tracing` subscriber setup for the CLI.
//!
//! Logs go to stderr. Mapped row values are never logged; parse errors quote
//! the offending date or number together with its line.

use std::io;

use clap::ValueEnum;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Multi-line, human readable.
    #[default]
    Pretty,
    /// One line per event.
    Compact,
    /// Newline-delimited JSON.
    Json,
}

#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Explicit level; when unset `RUST_LOG` applies, then `info`.
    pub level: Option<Level>,
    pub format: LogFormat,
    pub with_ansi: bool,
}

impl LogConfig {
    #[must_use]
    pub fn with_level(mut self, level: Option<Level>) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_ansi(mut self, enable: bool) -> Self {
        self.with_ansi = enable;
        self
    }
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &LogConfig) -> anyhow::Result<()> {
    let filter = build_env_filter(config.level);
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(io::stderr))
            .try_init()?,
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_writer(io::stderr)
                    .with_ansi(config.with_ansi)
                    .with_target(false),
            )
            .try_init()?,
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(io::stderr)
                    .with_ansi(config.with_ansi)
                    .with_target(false)
                    .without_time(),
            )
            .try_init()?,
    }
    Ok(())
}

fn build_env_filter(level: Option<Level>) -> EnvFilter {
    let directives = |level: Level| {
        let level = level.as_str().to_lowercase();
        format!("warn,mapper_cli={level},mapper_fhir={level},fhir_mapper={level}")
    };
    match level {
        Some(level) => EnvFilter::new(directives(level)),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(directives(Level::INFO))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_level_builds_crate_directives() {
        let filter = build_env_filter(Some(Level::DEBUG));
        let rendered = filter.to_string();
        assert!(rendered.contains("mapper_fhir=debug"));
        assert!(rendered.contains("mapper_cli=debug"));
    }

    #[test]
    fn builder_sets_fields() {
        let config = LogConfig::default()
            .with_level(Some(Level::WARN))
            .with_format(LogFormat::Json)
            .with_ansi(true);
        assert_eq!(config.level, Some(Level::WARN));
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.with_ansi);
    }
}
