//! Logging setup for binaries and tests.
//!
//! Library crates only emit `tracing` events; installing a subscriber is
//! left to the process.

use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

static INIT: OnceLock<()> = OnceLock::new();

/// Filter variable checked before `RUST_LOG`.
pub const LOG_ENV: &str = "CASECHAT_LOG";

/// Set to `json` for JSON lines instead of human-readable output.
pub const LOG_FORMAT_ENV: &str = "CASECHAT_LOG_FORMAT";

fn resolve_env_filter() -> EnvFilter {
    if let Ok(directives) = std::env::var(LOG_ENV) {
        if let Ok(filter) = EnvFilter::try_new(directives) {
            return filter;
        }
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn json_requested() -> bool {
    std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.trim().eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Install the global subscriber once per process.
///
/// Output goes to stderr so stdout stays free for streamed replies.
/// Later calls are no-ops, as is a call after another subscriber was
/// installed elsewhere.
pub fn init_tracing() {
    INIT.get_or_init(|| {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(resolve_env_filter())
            .with_writer(std::io::stderr)
            .with_target(false);

        let result = if json_requested() {
            builder.json().try_init()
        } else {
            builder.try_init()
        };
        if result.is_err() {
            tracing::debug!("tracing subscriber already installed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_tracing();
        init_tracing();
        tracing::info!("still logging");
    }
}
