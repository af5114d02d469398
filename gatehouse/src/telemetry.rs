//! Tracing subscriber setup.
//!
//! Activity entries are emitted under the `gatehouse::activity` target, so
//! they can be filtered on their own:
//!
//! ```bash
//! RUST_LOG=warn,gatehouse::activity=info ./bot
//! ```

use gatehouse_core::BoxError;
use tracing_subscriber::EnvFilter;

/// Install a compact fmt subscriber as the global default.
///
/// The filter comes from `RUST_LOG`; when it is unset or invalid,
/// `default_level` is used instead (e.g. `"info"` or `"gatehouse=debug"`).
/// Fails if a global subscriber is already installed.
pub fn init(default_level: &str) -> Result<(), BoxError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init()
}
