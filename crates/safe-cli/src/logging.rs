use tracing_subscriber::EnvFilter;

/// Log level used when `RUST_LOG` is not set.
pub fn default_directive(verbosity: u8, debug: bool) -> &'static str {
    match (verbosity, debug) {
        (0, false) => "warn",
        (1, false) => "info",
        (0..=2, _) => "debug",
        _ => "trace",
    }
}

/// Installs the global subscriber. Logs go to stderr so command output stays parseable.
pub fn init_tracing(verbosity: u8, debug: bool) -> eyre::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity, debug)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(debug)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| eyre::eyre!("failed to initialize logging: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_level() {
        assert_eq!(default_directive(0, false), "warn");
        assert_eq!(default_directive(0, true), "debug");
        assert_eq!(default_directive(1, false), "info");
        assert_eq!(default_directive(1, true), "debug");
        assert_eq!(default_directive(2, false), "debug");
        assert_eq!(default_directive(5, true), "trace");
    }
}
