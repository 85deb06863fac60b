/// Evaluation verdicts
pub mod verdict;

/// Progress records and sweep counters
pub mod progress;

/// Unexpected values and failures
pub mod unexpected;
