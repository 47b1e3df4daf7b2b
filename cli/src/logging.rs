//! Logging setup for the `form-extract` binary.
//!
//! Library crates only emit `tracing` events; this module installs the
//! subscriber that prints them to stderr so stdout stays clean for
//! extracted documents.
//!
//! # Log Levels
//!
//! - `warn`: unreadable batch inputs, recovered oddities (default)
//! - `info`: per-document summaries
//! - `debug`: rule firings, grid fallbacks, template near-misses
//! - `trace`: everything else
//!
//! `RUST_LOG` overrides the verbosity flag when set.

use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const OWN_CRATES: [&str; 4] = [
    "form_extract",
    "form_schema_core",
    "form_schema_catalog",
    "form_schema_extract",
];

/// Maps the `-v` count to a level.
///
/// - 0: warn
/// - 1 (`-v`): info
/// - 2 (`-vv`): debug
/// - 3+: trace
pub fn level_from_verbosity(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Installs the global stderr subscriber.
///
/// Calling it twice is harmless; the second install is ignored.
pub fn init_logging(verbosity: u8) {
    let filter = build_env_filter(level_from_verbosity(verbosity));
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init();
}

/// Builds an `EnvFilter` from `RUST_LOG`, falling back to `level` for our
/// crates and `warn` for everything else.
fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = level.as_str().to_lowercase();
        let directives: Vec<String> = OWN_CRATES
            .iter()
            .map(|krate| format!("{krate}={level}"))
            .collect();
        EnvFilter::new(format!("warn,{}", directives.join(",")))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_verbosity() {
        assert_eq!(level_from_verbosity(0), Level::WARN);
        assert_eq!(level_from_verbosity(1), Level::INFO);
        assert_eq!(level_from_verbosity(2), Level::DEBUG);
        assert_eq!(level_from_verbosity(9), Level::TRACE);
    }
}
