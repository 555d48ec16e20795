//! Analysis modules.
//!
//! `reducers` holds the pure folds; `aggregator` feeds them from a store.

pub mod aggregator;
pub mod reducers;

pub use aggregator::{AggregationOptions, Aggregator};
pub use reducers::DEFAULT_TOP_SECTIONS;
