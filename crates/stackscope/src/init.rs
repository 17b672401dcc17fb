//! Process-wide setup.

/// Installs the `env_logger` backend for the `log` facade.
///
/// Verbosity follows `RUST_LOG`. Calling this more than once, or after the
/// host application installed its own logger, does nothing.
pub fn init_logging() {
    if env_logger::try_init().is_ok() {
        log::debug!("stackscope logging initialized");
    }
}

/// Like [`init_logging`], but with a default filter used when `RUST_LOG` is unset.
pub fn init_logging_with_default(filter: &str) {
    let env = env_logger::Env::default().default_filter_or(filter);
    if env_logger::Builder::from_env(env).try_init().is_ok() {
        log::debug!("stackscope logging initialized (default filter '{filter}')");
    }
}
