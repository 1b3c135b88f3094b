use env_logger::{Builder, Env};

/// Installs the global logger. `RUST_LOG` wins over the verbosity flag.
pub fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    let result = Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .format_target(verbose)
        .try_init();

    if let Err(e) = result {
        // Already installed, e.g. by a test harness
        log::debug!("Logger not installed: {}", e);
    }
}
