//! Structured logging initialization

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Marker returned by `init_logging`; hold it for the duration of main.
/// Carries no resources today, but keeps call sites stable if a buffering
/// writer is added later.
pub struct LogGuard;

/// Initialize structured logging for the provisioner.
///
/// Defaults to INFO; override with `RUST_LOG`.
pub fn init_logging() -> LogGuard {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let format = fmt::layer().with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();

    LogGuard
}
