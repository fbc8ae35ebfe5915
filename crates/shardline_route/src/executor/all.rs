use std::collections::BTreeSet;

use shardline_common::error::ShardlineResult;
use shardline_metadata::{DatabaseMetaData, ShardingRuleMetaData};

use super::SqlRouteExecutor;
use crate::context::{QueryContext, RouteContext, RouteMapper, RouteUnit};

/// Broadcast: one route unit per known storage unit, identity mapped, with
/// no table renames.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllSqlRouteExecutor;

impl SqlRouteExecutor for AllSqlRouteExecutor {
    fn name(&self) -> &'static str {
        "all"
    }

    fn route(
        &self,
        _query: &QueryContext,
        _rules: &ShardingRuleMetaData,
        database: &DatabaseMetaData,
    ) -> ShardlineResult<RouteContext> {
        let mut ctx = RouteContext::new();
        for name in database.storage_unit_names() {
            ctx.put_route_unit(RouteUnit::new(RouteMapper::identity(name), BTreeSet::new()));
        }
        Ok(ctx)
    }
}
