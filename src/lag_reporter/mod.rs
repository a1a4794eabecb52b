// Inner module
mod reporter;

// Exports
pub use reporter::{LagOutcome, LagPoint, LagReporter};
