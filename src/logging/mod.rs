//! Diagnostic logging
//!
//! The harness emits `tracing` events at its seams (case appended, gate
//! transitions, late results, sink failures). Nothing is printed unless a
//! subscriber is installed; [`init`] installs the stock `fmt` subscriber.

use crate::config::{HarnessConfig, ENV_LOG};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Filter used when neither the config nor the environment names one
pub const DEFAULT_FILTER: &str = "conformance_harness=warn";

/// Install a global `fmt` subscriber using the config's `log_filter`, then
/// `HARNESS_LOG`, then [`DEFAULT_FILTER`].
///
/// Returns `false` if a global subscriber was already set (by an earlier call
/// or by the embedder); that is not an error.
pub fn init(config: &HarnessConfig) -> bool {
    let filter = config
        .log_filter
        .clone()
        .or_else(|| std::env::var(ENV_LOG).ok())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string());
    init_with_filter(&filter)
}

/// Install a global `fmt` subscriber with an explicit filter directive
pub fn init_with_filter(filter: &str) -> bool {
    let env_filter = match EnvFilter::try_new(filter) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("invalid log filter '{}': {}; using '{}'", filter, e, DEFAULT_FILTER);
            EnvFilter::new(DEFAULT_FILTER)
        }
    };
    FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
