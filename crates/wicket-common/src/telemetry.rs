use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing for a wicket binary.
///
/// - `service_name`: identifies this component (e.g. "wicket-gateway")
/// - `log_format`: `"json"` for structured line-per-event output, anything
///   else for human-readable text
///
/// The filter comes from `RUST_LOG` and defaults to `info`.
pub fn init_tracing(service_name: &str, log_format: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if log_format.eq_ignore_ascii_case("json") {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::debug!(service_name, log_format, "tracing initialized");
}
