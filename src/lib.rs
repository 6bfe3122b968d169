//! HotkeyMaster - multi-finger trackpad taps as shortcuts.
//!
//! This is the library crate behind the `hotkeymaster` binary. It classifies
//! raw trackpad frames into tap gestures (`tap-1` .. `tap-4`) and hands them to
//! a dispatcher that runs the bound actions.

pub mod app;
pub mod capture;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod processing;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging. `RUST_LOG` takes precedence over `verbose`.
pub fn init_tracing(verbose: bool) {
    let default_directives = if verbose {
        "hotkeymaster=debug,hotkeymaster_lib=debug"
    } else {
        "hotkeymaster=info,hotkeymaster_lib=info"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directives.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting HotkeyMaster v{}", env!("CARGO_PKG_VERSION"));
}
