//! Batch orchestration: apply the single-lookup engine across a list of
//! numbers with progress reporting and per-item failure isolation.

pub mod runner;

pub use runner::{ProgressReporter, SilentProgress, run_batch};
