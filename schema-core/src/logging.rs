//! Gated `tracing-subscriber` install. The engine never
//! installs a global subscriber on its own — every other crate only ever
//! calls into `tracing`'s macros, which are no-ops until someone sets a
//! subscriber. `init()` is the one entry point a host CLI is expected to
//! call once at start-up; calling it more than once (or from more than
//! one thread racing at start-up) is harmless.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Installs a `tracing-subscriber` `fmt` layer with an `EnvFilter` read
/// from `RUST_LOG`, defaulting to `info` when unset or unparsable.
pub fn init() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    });
}
