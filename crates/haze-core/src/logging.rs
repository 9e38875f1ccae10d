//! Logging facilities for Haze.
//!
//! Haze is instrumented with the `tracing` crate. Every subsystem logs under a
//! fixed target so output can be filtered per subsystem, e.g.
//! `RUST_LOG=haze::dispatch=trace,haze_core::threadpool=debug`.
//!
//! Nothing is printed until a subscriber is installed. [`init`] installs a
//! reasonable default:
//!
//! ```no_run
//! haze_core::logging::init("info");
//! ```

use tracing_subscriber::EnvFilter;

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "haze_core";
    /// Thread pool target.
    pub const THREADPOOL: &str = "haze_core::threadpool";
    /// Event queue target.
    pub const QUEUE: &str = "haze_core::queue";
    /// Application lifecycle target.
    pub const APP: &str = "haze::app";
    /// Dispatch loop target.
    pub const DISPATCH: &str = "haze::dispatch";
    /// Window lifecycle and per-frame update target.
    pub const WINDOW: &str = "haze::window";
    /// Input polling target.
    pub const INPUT: &str = "haze::input";
    /// Frame timing target.
    pub const PERF: &str = "haze::perf";
}

/// Install a formatting subscriber filtered by `RUST_LOG`.
///
/// `default_directive` is used when `RUST_LOG` is unset or invalid. Returns
/// `false` if a global subscriber was already installed, in which case nothing
/// changes.
pub fn init(default_directive: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

/// A guard that times an operation inside a tracing span.
///
/// The span is entered on creation and exited when the guard is dropped, so
/// span-aware subscribers record the operation's duration.
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create and enter a new performance span.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: "haze::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_repeatable() {
        // The first call may lose to another test's subscriber; the second
        // must never succeed once one is installed.
        let _ = init("warn");
        assert!(!init("warn"));
    }

    #[test]
    fn test_perf_span() {
        let _span = PerfSpan::new("test_operation");
    }
}
