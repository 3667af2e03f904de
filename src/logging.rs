use std::io::IsTerminal;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::cli::LogLevel;

impl LogLevel {
    /// `tracing` has no separate critical level, so it shares `ERROR`.
    pub fn level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Error | LogLevel::Critical => LevelFilter::ERROR,
        }
    }
}

/// Builds the filter for `level`. At `DEBUG` the HTTP stack logs its
/// connections too. Directives from `RUST_LOG` are added on top.
pub fn env_filter(level: LogLevel) -> EnvFilter {
    let mut filter = EnvFilter::builder()
        .with_default_directive(level.level_filter().into())
        .from_env_lossy();
    if level == LogLevel::Debug {
        for directive in ["reqwest=debug", "hyper=debug"] {
            if let Ok(directive) = directive.parse() {
                filter = filter.add_directive(directive);
            }
        }
    }
    filter
}

pub fn init_logging(level: LogLevel) {
    let subscriber = tracing_subscriber::registry().with(env_filter(level));
    // A second initialisation (tests) is not an error worth reporting.
    let _ = subscriber
        .with(
            fmt::layer()
                .with_target(level == LogLevel::Debug)
                .with_ansi(std::io::stderr().is_terminal())
                .with_writer(std::io::stderr),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_map_onto_tracing() {
        assert_eq!(LogLevel::Debug.level_filter(), LevelFilter::DEBUG);
        assert_eq!(LogLevel::Warning.level_filter(), LevelFilter::WARN);
        assert_eq!(LogLevel::Critical.level_filter(), LevelFilter::ERROR);
    }

    #[test]
    fn debug_filter_includes_http_stack() {
        let filter = env_filter(LogLevel::Debug).to_string();
        assert!(filter.contains("reqwest=debug"), "{filter}");
        let filter = env_filter(LogLevel::Info).to_string();
        assert!(!filter.contains("reqwest"), "{filter}");
    }
}
