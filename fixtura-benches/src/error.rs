//! Benchmark setup error type.

use fixtura_core::FixturaError;

/// Errors that may occur while preparing a benchmark.
#[derive(Debug, thiserror::Error)]
pub enum BenchSetupError {
    /// A warm-up population failed.
    #[error("warm-up population failed: {0}")]
    Populate(#[from] FixturaError),
    /// A parameter was zero where at least one is required.
    #[error("expected a non-zero value for {context}")]
    ZeroValue {
        /// The offending parameter.
        context: &'static str,
    },
}
