//! Shared plumbing of the `inkrypt` binaries: command-line configuration and
//! text rendering of the account page.

pub mod render;
pub mod settings;

/// Initialise `env_logger`, honouring `RUST_LOG` and defaulting to `info`.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .try_init();
}
