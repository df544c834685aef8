//! Tracing subscriber initialization.

use tracing_subscriber::EnvFilter;

/// Default filter: paycast crates at `info`, everything else at `warn`.
pub const DEFAULT_DIRECTIVE: &str =
    "warn,paycast_loader=info,paycast_predictor=info,paycast_infra=info,paycast=info";

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    init_with_default(DEFAULT_DIRECTIVE);
}

pub fn init_with_default(directive: &str) {
    let _ = try_init(build_filter(directive));
}

/// `RUST_LOG` if set and valid, `directive` otherwise.
pub fn build_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive))
}

fn try_init(filter: EnvFilter) -> Result<(), tracing_subscriber::util::TryInitError> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    // JSON logs + timestamps on stderr so stdout stays machine-readable.
    let fmt = tracing_subscriber::fmt::layer()
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry().with(filter).with(fmt).try_init()
}
