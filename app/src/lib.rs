//! LootLook Application Shell
//!
//! Wires configuration, the database and the entitlement engine together and
//! exposes the command layer the UI calls. Business logic lives in `crates/`.

pub mod commands;
pub mod error;
pub mod state;

pub use error::CommandError;
pub use state::AppState;

/// Application version.
#[must_use]
pub fn get_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Initialize tracing subscriber for logging.
///
/// Honors `RUST_LOG`; defaults to `info,lootlook=debug`. Logs go to stderr so
/// stdout stays free for command output.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,lootlook=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
