use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Env var holding a `tracing` filter directive; `RUST_LOG` is the fallback.
pub const LOG_ENV: &str = "VARLINE_LOG";

fn filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "varline=debug" } else { "warn" }))
}

/// Install the global subscriber. Output goes to stderr: stdout belongs to
/// the JSON-RPC stream when serving. Safe to call more than once.
pub fn init_logging(verbose: bool) {
    let _ = tracing_subscriber::registry()
        .with(filter(verbose))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}
