use tracing_subscriber::{fmt, EnvFilter};

use crate::util::env::env_opt;

/// Install the global tracing subscriber for this process.
///
/// Filter directives are resolved in order: `RUST_LOG`, then
/// `THREADSTOCK_LOG`, then the caller-supplied default (binaries pass a
/// default that keeps this crate chatty and dependencies at info).
pub fn init_tracing(default_filter: &str) -> anyhow::Result<()> {
    let directives = env_opt("RUST_LOG")
        .or_else(|| env_opt("THREADSTOCK_LOG"))
        .unwrap_or_else(|| default_filter.to_string());
    let filter = EnvFilter::try_new(&directives)
        .map_err(|e| anyhow::anyhow!("bad log filter {directives:?}: {e}"))?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))
}
