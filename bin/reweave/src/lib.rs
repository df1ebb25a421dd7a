//! ReWeave CLI Library
//!
//! Command implementations for the `reweave` binary.
//!
//! # Modules
//!
//! - [`cmd`] - Command implementations (build, check)
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use reweave::cmd;
//!
//! cmd::build::run(Path::new("reweave.toml"), None, None).unwrap();
//! ```

pub mod cmd;

pub use reweave_core::Config;
pub use reweave_generator::{BuildStats, Builder};

/// Initialize tracing with the specified verbosity level.
///
/// `0` shows warnings, `1` info, `2` debug and `3` or more trace. `RUST_LOG`
/// directives are honoured on top of the level.
pub fn init_tracing(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_thread_names(true))
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}
