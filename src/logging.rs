//! Diagnostic logging to stderr.
//!
//! Program output owns stdout, so everything we log goes to stderr.  The
//! filter comes from $GORUN_LOG (e.g. `GORUN_LOG=debug`), else `-v` picks
//! debug and the default is warnings only.

use tracing_subscriber::EnvFilter;

pub const ENV_VAR: &str = "GORUN_LOG";

pub fn init(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(ENV_VAR).unwrap_or_else(|_| EnvFilter::new(default));
    // Fails only if a subscriber is already installed.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .try_init();
}
