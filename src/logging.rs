//! Diagnostic logging setup.
//!
//! Logs go to stderr through `tracing-subscriber`. `RUST_LOG` wins when set;
//! otherwise the level follows the `-q` / `-v` flags.

use tracing_subscriber::EnvFilter;

/// Default filter directive for a verbosity level.
pub fn default_directive(verbosity: u8, quiet: bool) -> &'static str {
    if quiet {
        return "intervoice=error";
    }
    match verbosity {
        0 => "intervoice=warn",
        1 => "intervoice=info",
        2 => "intervoice=debug",
        _ => "intervoice=trace",
    }
}

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init(verbosity: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity, quiet)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbosity >= 2)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_overrides_verbosity() {
        assert_eq!(default_directive(3, true), "intervoice=error");
    }

    #[test]
    fn verbosity_raises_level() {
        assert_eq!(default_directive(0, false), "intervoice=warn");
        assert_eq!(default_directive(1, false), "intervoice=info");
        assert_eq!(default_directive(2, false), "intervoice=debug");
        assert_eq!(default_directive(9, false), "intervoice=trace");
    }

    #[test]
    fn init_twice_is_harmless() {
        init(0, true);
        init(2, false);
    }
}
