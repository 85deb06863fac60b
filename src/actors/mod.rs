/// Actors module

/// sync progress reporting actor
pub mod reporter;

/// sync two phase sweep actor
pub mod sweeper;
