use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "ndjson_stream=info";

/// Install a `fmt` subscriber filtered by `RUST_LOG`.
///
/// Falls back to [`DEFAULT_FILTER`]. Returns `false` when a global subscriber was
/// already installed, so calling it from several tests is harmless.
pub fn init_tracing() -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}
