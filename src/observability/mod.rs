//! Logging and crash reporting.
//!
//! Diagnostics go to stderr through `tracing`; stdout is reserved for diffs
//! and reports. `RUST_LOG` overrides the verbosity chosen on the command
//! line.
//!
//! ```ignore
//! use errfix::observability::{init_logging, install_panic_hook, set_phase, Phase};
//!
//! init_logging(cli.verbosity);
//! install_panic_hook();
//! let _phase = set_phase(Phase::Loading);
//! ```

pub mod context;
pub mod panic_hook;

use std::io::IsTerminal;
use std::sync::OnceLock;

use tracing_subscriber::{fmt, EnvFilter};

pub use context::{current_context, set_current_file, set_iteration, set_phase, Phase, RunContext};
pub use panic_hook::install_panic_hook;

/// Filter directive for a `-v` count: warnings by default, then info,
/// debug and trace.
pub fn level_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Installs the global stderr subscriber once; later calls are ignored.
pub fn init_logging(verbosity: u8) {
    static INITIALISED: OnceLock<()> = OnceLock::new();

    INITIALISED.get_or_init(|| {
        let use_ansi = std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal();
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_directive(verbosity)));
        let subscriber = fmt::fmt()
            .with_env_filter(filter)
            .with_ansi(use_ansi)
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_level(true)
            .without_time()
            .compact()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(level_directive(0), "warn");
        assert_eq!(level_directive(1), "info");
        assert_eq!(level_directive(2), "debug");
        assert_eq!(level_directive(7), "trace");
    }

    #[test]
    fn init_is_idempotent() {
        init_logging(0);
        init_logging(3);
    }
}
