//! Tracing setup for embedders that want this crate's `debug!`/`trace!`
//! call sites surfaced without wiring up `tracing-subscriber` themselves.
//! Optional: a caller that already runs its own subscriber should skip
//! this and just let `tracing`'s events flow into it.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs a global `tracing` subscriber reading its filter from
/// `RUST_LOG`, falling back to `info` when unset. Call at most once per
/// process; a second call is a no-op (the underlying `try_init` just
/// returns an error that's swallowed here).
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let layer = tracing_subscriber::fmt::layer().with_target(true);
    let _ = tracing_subscriber::registry().with(layer).with(env_filter).try_init();
}
