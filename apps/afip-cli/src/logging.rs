//! Log subscriber setup.

use tracing_subscriber::EnvFilter;

/// Default filter directive for a `-v` count.
pub fn default_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info,afip_auth=info",
        2 => "info,afip_auth=debug,afip=debug",
        _ => "debug,afip_auth=trace,afip=trace",
    }
}

/// Install the fmt subscriber on stderr. `RUST_LOG` wins over `-v`.
pub fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose > 1)
        .try_init();
}
