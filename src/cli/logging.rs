//! Diagnostic logging setup

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (falls back to `RUST_LOG`)
pub const LOG_ENV: &str = "VOXMEMO_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Install the tracing subscriber. Logs go to stderr so stdout stays
/// reserved for paths and values.
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| DEFAULT_FILTER.into());

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init()
    {
        eprintln!("failed to initialize tracing: {}", err);
    }
}
