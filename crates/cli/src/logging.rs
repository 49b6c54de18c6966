//! Structured logging setup, grounded in `anvil/src/lib.rs`'s
//! `init_tracing`: an explicit `RUST_LOG` always wins, otherwise
//! `--verbose` raises the default filter from `info` to `debug`.

pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).without_time().init();
}
