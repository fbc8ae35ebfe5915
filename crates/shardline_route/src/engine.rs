//! Route engine: picks a strategy and runs it against one metadata snapshot.

use std::time::Instant;

use shardline_common::error::{MetaDataError, ShardlineResult};
use shardline_metadata::{ClusterMetaData, MetaDataStore, ShardingRuleMetaData};
use shardline_observability::record_route_metrics;

use crate::context::{QueryContext, RouteContext};
use crate::executor::{AllSqlRouteExecutor, ShardingStandardRouteExecutor, SqlRouteExecutor};

#[derive(Debug, Default)]
pub struct RouteEngine {
    all: AllSqlRouteExecutor,
    standard: ShardingStandardRouteExecutor,
}

impl RouteEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route against the store's current snapshot. The snapshot is taken
    /// once, so a concurrent rule change cannot affect this decision halfway.
    pub fn route_current(&self, query: &QueryContext, store: &MetaDataStore) -> ShardlineResult<RouteContext> {
        let snapshot = store.snapshot();
        self.route(query, &snapshot)
    }

    pub fn route(&self, query: &QueryContext, metadata: &ClusterMetaData) -> ShardlineResult<RouteContext> {
        let start = Instant::now();
        let db_name = query.connection_context().database().unwrap_or_default();
        let database = metadata
            .database(db_name)
            .ok_or_else(|| MetaDataError::DatabaseNotFound(db_name.to_string()))?;

        let executor = self.select(query, database.rules());
        let ctx = executor.route(query, database.rules(), database)?;

        record_route_metrics(executor.name(), ctx.len());
        tracing::debug!(
            database = %database.name(),
            strategy = executor.name(),
            route_units = ctx.len(),
            metadata_version = metadata.version(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "query routed"
        );
        Ok(ctx)
    }

    fn select(&self, query: &QueryContext, rules: &ShardingRuleMetaData) -> &dyn SqlRouteExecutor {
        if query.tables().iter().any(|t| rules.is_sharded_table(t)) {
            &self.standard
        } else {
            &self.all
        }
    }
}
