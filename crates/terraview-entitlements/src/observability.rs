//! Tracing subscriber setup.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use terraview_core::config::ObservabilityConfig;

/// Install the global subscriber. `RUST_LOG` overrides the configured filter.
/// Returns false if a subscriber was already installed.
pub fn init_tracing(config: &ObservabilityConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let json = config.json.then(|| fmt::layer().json());
    let plain = (!config.json).then(fmt::layer);

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(plain)
        .try_init()
        .is_ok()
}
