//! Structured logging to stderr through `tracing`.

use std::io::IsTerminal as _;

use tracing_subscriber::EnvFilter;

/// Environment variable holding a full filter directive, e.g. `gitlinks=debug`.
const LOG_ENV: &str = "GITLINKS_LOG";

/// Default level for a given count of `-v` flags.
const fn level_for_verbosity(verbosity: u8) -> &'static str {
    return match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
}

/// Install the global subscriber. `GITLINKS_LOG` wins over `-v` when set.
/// Calling this twice keeps the first subscriber.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_err| return EnvFilter::new(level_for_verbosity(verbosity)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .try_init();
}
