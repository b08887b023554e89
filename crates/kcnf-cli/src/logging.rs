use tracing_subscriber::{EnvFilter, fmt};

pub const LOG_ENV: &str = "KCNF_LOG";
const DEFAULT_DIRECTIVE: &str = "warn";

/// Installs the stderr subscriber. Filter directives come from `KCNF_LOG`;
/// a missing or unparsable value falls back to warnings only.
///
/// Calling this more than once keeps the first subscriber.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    let _ = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .try_init();
}
