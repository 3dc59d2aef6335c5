pub mod commands;
pub mod engine;
pub mod errors;
pub mod models;
pub mod utils;

use tracing_subscriber::EnvFilter;

/// Initialize tracing on stderr, leaving stdout free for generated scripts.
///
/// `RUST_LOG` takes precedence; otherwise `verbose` selects debug over info.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}
