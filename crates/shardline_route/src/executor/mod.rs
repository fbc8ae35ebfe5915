//! Route executors. Every strategy implements [`SqlRouteExecutor`], so the
//! merge side never needs to know which one produced a `RouteContext`.

mod all;
mod standard;

pub use all::AllSqlRouteExecutor;
pub use standard::ShardingStandardRouteExecutor;

use shardline_common::error::ShardlineResult;
use shardline_metadata::{DatabaseMetaData, ShardingRuleMetaData};

use crate::context::{QueryContext, RouteContext};

/// One routing strategy.
pub trait SqlRouteExecutor: Send + Sync {
    /// Strategy label, used for logs and metrics.
    fn name(&self) -> &'static str;

    /// Decide the route units for `query`.
    ///
    /// `rules` and `database` belong to the same metadata snapshot; an
    /// executor never re-reads the store.
    fn route(
        &self,
        query: &QueryContext,
        rules: &ShardingRuleMetaData,
        database: &DatabaseMetaData,
    ) -> ShardlineResult<RouteContext>;
}
