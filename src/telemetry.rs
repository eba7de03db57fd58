use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Installs a global fmt subscriber.
///
/// Prefers `RUST_LOG` when set. Ex:
/// RUST_LOG=info,silkey_sso=debug
///
/// Returns `false` when a global subscriber was already installed by the host application.
pub fn init_tracing() -> bool {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
