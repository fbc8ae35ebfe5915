//! Routing decision engine.
//!
//! Given a query context and one metadata snapshot, decide the set of
//! (storage unit, table rename) targets the query is dispatched to.

pub mod context;
pub mod engine;
pub mod executor;
pub mod sharding;

pub use context::{
    ConnectionContext, QueryContext, RouteContext, RouteMapper, RouteUnit, ShardingCondition,
    ShardingConditions,
};
pub use engine::RouteEngine;
pub use executor::{AllSqlRouteExecutor, ShardingStandardRouteExecutor, SqlRouteExecutor};
