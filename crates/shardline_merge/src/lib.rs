//! Cross-shard merged results.
//!
//! Shards return partial results; the mergers here turn them into one
//! logical result, finishing split aggregates through aggregation units.

pub mod aggregation;
pub mod compare;
pub mod context;
pub mod engine;
pub mod merger;
pub mod result;

pub use aggregation::{AggregationType, AggregationUnit};
pub use compare::OrderByItem;
pub use context::{AggregationProjection, MergeContext};
pub use engine::MergeEngine;
pub use merger::MergedResult;
pub use result::{MemoryQueryResult, QueryResult};
