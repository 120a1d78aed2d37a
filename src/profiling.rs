//! # Profiling Guide
//!
//! The scheduler always reports through `tracing`: slow systems at `warn`,
//! failed systems at `error`, schedule rebuilds at `debug`, and
//! [`crate::performance::SystemPerformanceTracker::log_performance_stats`]
//! at `info`. Installing a subscriber is up to the application.
//!
//! ## Spans
//!
//! Enable the `profiling` feature in your Cargo.toml:
//!
//! ```toml
//! [dependencies]
//! stage_scheduler = { version = "0.1", features = ["profiling"] }
//! ```
//!
//! Every frame then opens a `frame` span and every stage a `stage` span, so
//! a flame view shows where the frame budget went:
//!
//! ```ignore
//! let _guard = stage_scheduler::profiling::init_file_tracing("trace.json")?;
//! scheduler.update(&world, 0.016)?;
//! scheduler.tracker().log_performance_stats();
//! ```
//!
//! ## Performance Tips
//!
//! 1. Profile in release mode for accurate metrics
//! 2. Use `RUST_LOG=debug` to see the stage plan after every rebuild
//! 3. A stage with one member runs inline; long single-member stages point at
//!    an access declaration that is wider than it needs to be

#[cfg(feature = "profiling")]
pub use file_tracing::init_file_tracing;

#[cfg(feature = "profiling")]
mod file_tracing {
    use std::fs::File;

    use tracing_appender::non_blocking::WorkerGuard;

    use crate::error::Result;

    /// Send every event and span, down to `TRACE`, to a JSON-lines file.
    ///
    /// Keep the returned guard alive; dropping it flushes the writer.
    pub fn init_file_tracing(path: &str) -> Result<WorkerGuard> {
        let file = File::create(path)
            .map_err(|err| crate::error::SchedulerError::Config(format!("{path}: {err}")))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        tracing_subscriber::fmt()
            .json()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .try_init()
            .map_err(|err| crate::error::SchedulerError::Config(err.to_string()))?;
        Ok(guard)
    }
}
