use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs the fmt subscriber. `RUST_LOG` overrides the default
/// `modelops=info` filter; `log` records are forwarded to it as well.
pub fn init() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "modelops=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
