//! Business logic services.
//!
//! The deduplication engine is pure; the sweep service wraps it with
//! fetching and applying against a feed source.

pub mod deduplication;
mod sweep;

pub use sweep::{ApplyOutcome, SkippedEntry, SweepJob, SweepReport, SweepService, prepare_items};
