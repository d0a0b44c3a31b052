use tracing_subscriber::EnvFilter;

/// Filter directive for a `-v` count: 0 → warn, 1 → info, 2 → debug,
/// 3+ → trace. Child process stderr is logged at debug.
pub fn filter_for_verbosity(verbose: u8) -> String {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    format!("videotiler={level}")
}

/// Install the stderr subscriber. `RUST_LOG` takes precedence over `-v`.
pub fn init(verbose: u8) {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| filter_for_verbosity(verbose));

    let filter = EnvFilter::try_new(&env_filter).unwrap_or_else(|_| EnvFilter::new("videotiler=warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2)
        .try_init();
}
