//! Merge engine: picks a merger for a query's shard results.

use shardline_common::config::MergeConfig;
use shardline_common::error::ShardlineResult;

use crate::context::MergeContext;
use crate::merger::{
    GroupByMemoryMergedResult, IteratorStreamMergedResult, MergedResult, Merger,
    OrderByStreamMergedResult,
};
use crate::result::QueryResult;

#[derive(Debug, Clone, Default)]
pub struct MergeEngine {
    /// Group limit for the in-memory group-by merger; 0 = unlimited.
    max_groups: usize,
}

impl MergeEngine {
    pub fn new(config: &MergeConfig) -> Self {
        Self {
            max_groups: config.max_groups,
        }
    }

    /// Build the merged result for `results`, given in route order.
    ///
    /// Aggregate functions are resolved first, so an unsupported one fails
    /// the query before any shard row is read.
    pub fn merge(
        &self,
        mut results: Vec<Box<dyn QueryResult>>,
        ctx: &MergeContext,
    ) -> ShardlineResult<MergedResult> {
        ctx.validate()?;
        let shard_results = results.len();

        let merger = if ctx.is_aggregation() {
            Merger::GroupBy(GroupByMemoryMergedResult::new(&mut results, ctx, self.max_groups)?)
        } else if !ctx.order_by.is_empty() && results.len() > 1 {
            Merger::OrderBy(OrderByStreamMergedResult::new(results, ctx.order_by.clone())?)
        } else {
            Merger::Iterator(IteratorStreamMergedResult::new(results))
        };

        let merged = MergedResult::new(merger, ctx.offset, ctx.limit, shard_results);
        tracing::debug!(
            merger = merged.merger_name(),
            shard_results,
            aggregations = ctx.aggregations.len(),
            "merge started"
        );
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::AggregationType;
    use crate::compare::OrderByItem;
    use crate::context::AggregationProjection;
    use crate::result::MemoryQueryResult;
    use shardline_common::datum::{Datum, OwnedRow};
    use shardline_common::error::{MergeError, ShardlineError};

    fn shard(name: &str, values: &[i64]) -> Box<dyn QueryResult> {
        Box::new(MemoryQueryResult::from_rows(
            name,
            values.iter().map(|v| OwnedRow::new(vec![Datum::Int64(*v)])).collect(),
        ))
    }

    fn ints(rows: &[OwnedRow]) -> Vec<i64> {
        rows.iter().filter_map(|r| r.values[0].as_i64()).collect()
    }

    #[test]
    fn test_picks_merger() {
        let engine = MergeEngine::default();
        let plain = engine.merge(vec![shard("ds_0", &[1])], &MergeContext::new()).unwrap();
        assert_eq!(plain.merger_name(), "iterator");

        let sorted = MergeContext::new().order_by(OrderByItem::asc(0));
        let merged = engine
            .merge(vec![shard("ds_0", &[1]), shard("ds_1", &[2])], &sorted)
            .unwrap();
        assert_eq!(merged.merger_name(), "order_by");

        let grouped = MergeContext::new().aggregate(AggregationProjection::new(AggregationType::Sum, 0));
        let merged = engine.merge(vec![shard("ds_0", &[1])], &grouped).unwrap();
        assert_eq!(merged.merger_name(), "group_by");
    }

    #[test]
    fn test_offset_and_limit() {
        let ctx = MergeContext::new().order_by(OrderByItem::asc(0)).paginate(1, Some(3));
        let rows = MergeEngine::default()
            .merge(vec![shard("ds_0", &[1, 3, 5]), shard("ds_1", &[2, 4, 6])], &ctx)
            .unwrap()
            .collect_rows()
            .unwrap();
        assert_eq!(ints(&rows), vec![2, 3, 4]);
    }

    #[test]
    fn test_offset_past_end() {
        let ctx = MergeContext::new().paginate(10, None);
        let rows = MergeEngine::default()
            .merge(vec![shard("ds_0", &[1, 2])], &ctx)
            .unwrap()
            .collect_rows()
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_unsupported_function_fails_before_reading() {
        let ctx = MergeContext::new()
            .aggregate(AggregationProjection::new(AggregationType::from_name("bit_and"), 0));
        let err = MergeEngine::default()
            .merge(vec![shard("ds_0", &[1])], &ctx)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            ShardlineError::Merge(MergeError::UnsupportedAggregation(ref name)) if name == "BIT_AND"
        ));
    }

    #[test]
    fn test_group_limit_from_config() {
        let engine = MergeEngine::new(&MergeConfig { max_groups: 1 });
        let ctx = MergeContext::new()
            .group_by([0])
            .aggregate(AggregationProjection::new(AggregationType::Count, 0));
        let err = engine.merge(vec![shard("ds_0", &[1, 2])], &ctx).err().unwrap();
        assert!(err.is_transient());
    }
}
