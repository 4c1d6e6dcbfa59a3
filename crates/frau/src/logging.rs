//! Diagnostics for the `frau` binary.
//!
//! Port and handshake events (dropped envelopes, handler panics, timeouts)
//! are written to stderr so that reports on stdout stay machine-readable.

use clap::ValueEnum;
use tracing::level_filters::LevelFilter;

/// How diagnostics are rendered on stderr.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// One human-readable line per event.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Minimum severity written to stderr.
///
/// The default hides per-message `debug!` and `trace!` output from the port.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Install the global subscriber. A second call leaves the first in place.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(LevelFilter::from(level))
        .with_ansi(false)
        .with_target(false);

    let _ = match format {
        LogFormat::Text => subscriber.try_init(),
        LogFormat::Json => subscriber.json().try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_keep_port_chatter_quiet() {
        assert_eq!(LogFormat::default(), LogFormat::Text);
        assert_eq!(LevelFilter::from(LogLevel::default()), LevelFilter::WARN);
        assert!(LevelFilter::from(LogLevel::default()) < LevelFilter::DEBUG);
    }

    #[test]
    fn trace_enables_everything() {
        assert_eq!(LevelFilter::from(LogLevel::Trace), LevelFilter::TRACE);
        assert_eq!(LevelFilter::from(LogLevel::Error), LevelFilter::ERROR);
    }

    #[test]
    fn repeated_init_is_harmless() {
        init_logging(LogFormat::Json, LogLevel::Error);
        init_logging(LogFormat::Text, LogLevel::Trace);
    }
}
