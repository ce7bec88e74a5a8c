//! Aggregation of classified reports into per-agent views.

pub mod aggregator;

pub use aggregator::*;
