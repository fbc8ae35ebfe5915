use std::collections::BTreeSet;

use shardline_common::datum::Datum;
use shardline_common::error::{RouteError, ShardlineResult};
use shardline_metadata::{DatabaseMetaData, ShardingAutoTableRule, ShardingRuleMetaData};

use super::{AllSqlRouteExecutor, SqlRouteExecutor};
use crate::context::{QueryContext, RouteContext, RouteMapper, RouteUnit};
use crate::sharding::shard_index;

/// Hash-mod routing for auto tables.
///
/// Each sharding value selects `hash(value) % sharding_count`; a sharded
/// table with no condition values keeps every shard. When a query touches
/// several auto tables they must share one layout (same shard count and
/// storage units) and the selected shard indices are intersected, so each
/// route unit carries one renamed table per auto table.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShardingStandardRouteExecutor;

impl ShardingStandardRouteExecutor {
    fn sharded_rules<'a>(
        query: &QueryContext,
        rules: &'a ShardingRuleMetaData,
    ) -> Vec<&'a ShardingAutoTableRule> {
        let mut found: Vec<&ShardingAutoTableRule> = Vec::new();
        for table in query.tables() {
            if let Some(rule) = rules.auto_table(table) {
                if !found.iter().any(|r| r.logic_table() == rule.logic_table()) {
                    found.push(rule);
                }
            }
        }
        found
    }

    fn check_bound(sharded: &[&ShardingAutoTableRule]) -> ShardlineResult<()> {
        let Some(first) = sharded.first() else {
            return Ok(());
        };
        let bound = sharded.iter().all(|r| {
            r.sharding_count() == first.sharding_count()
                && r.config().storage_units == first.config().storage_units
        });
        if bound {
            Ok(())
        } else {
            let names: Vec<&str> = sharded.iter().map(|r| r.logic_table()).collect();
            Err(RouteError::UnboundTables(names.join(", ")).into())
        }
    }

    /// Shard indices selected by the query's conditions on `rule`, or `None`
    /// when the query does not constrain the sharding column.
    fn selected_indices(
        query: &QueryContext,
        rule: &ShardingAutoTableRule,
    ) -> ShardlineResult<Option<BTreeSet<u64>>> {
        let values = query
            .sharding_conditions()
            .values_for(rule.logic_table(), rule.sharding_column());
        if values.is_empty() {
            return Ok(None);
        }
        let mut indices = BTreeSet::new();
        for value in values {
            match value {
                Datum::Null => continue,
                Datum::Array(_) => {
                    return Err(RouteError::UnroutableValue {
                        table: rule.logic_table().to_string(),
                        column: rule.sharding_column().to_string(),
                    }
                    .into())
                }
                _ => {
                    if let Some(idx) = shard_index(value, rule.sharding_count()) {
                        indices.insert(idx);
                    }
                }
            }
        }
        Ok(Some(indices))
    }
}

impl SqlRouteExecutor for ShardingStandardRouteExecutor {
    fn name(&self) -> &'static str {
        "standard"
    }

    fn route(
        &self,
        query: &QueryContext,
        rules: &ShardingRuleMetaData,
        database: &DatabaseMetaData,
    ) -> ShardlineResult<RouteContext> {
        let sharded = Self::sharded_rules(query, rules);
        let Some(first) = sharded.first().copied() else {
            return AllSqlRouteExecutor.route(query, rules, database);
        };
        Self::check_bound(&sharded)?;
        if first.data_nodes().is_empty() {
            return Err(RouteError::NoDataNodes(first.logic_table().to_string()).into());
        }

        let mut candidates: BTreeSet<u64> = (0..u64::from(first.sharding_count())).collect();
        for rule in &sharded {
            if let Some(selected) = Self::selected_indices(query, rule)? {
                candidates = candidates.intersection(&selected).copied().collect();
            }
        }

        let mut ctx = RouteContext::new();
        for idx in candidates {
            let Some(node) = first.data_node(idx) else {
                continue;
            };
            let mut table_mappers = BTreeSet::new();
            for rule in &sharded {
                if let Some(n) = rule.data_node(idx) {
                    table_mappers.insert(RouteMapper::new(rule.logic_table(), n.table.clone()));
                }
            }
            ctx.put_route_unit(RouteUnit::new(
                RouteMapper::identity(node.storage_unit.clone()),
                table_mappers,
            ));
        }
        if ctx.is_empty() {
            tracing::debug!(
                table = %first.logic_table(),
                "sharding conditions select no shard"
            );
        }
        Ok(ctx)
    }
}
