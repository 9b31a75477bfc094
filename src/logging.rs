//! Logging setup for binaries that embed the server core.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Installs a global `tracing` subscriber that writes to stderr.
///
/// The filter comes from `RUST_LOG`, falling back to `default_filter`
/// (for example `"info"` or `"docmcp=debug,docmcp_tasks=debug"`). Stdout is
/// left alone so a stdio transport can own it.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_logging(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_is_refused() {
        init_logging("warn");
        assert!(!init_logging("debug"));
    }
}
