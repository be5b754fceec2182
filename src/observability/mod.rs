//! Structured logging setup.
//!
//! stdout carries the MCP protocol stream in stdio mode, so all diagnostics
//! go to stderr.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "statelessor_mcp=info";

/// Initialize structured logging with `RUST_LOG` environment variable support.
///
/// `verbose` raises the default to debug. Call once at program startup;
/// subsequent calls are silently ignored by `tracing_subscriber`.
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("statelessor_mcp=debug")
        } else {
            EnvFilter::new(DEFAULT_FILTER)
        }
    });

    // try_init so double-init in tests doesn't panic
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
