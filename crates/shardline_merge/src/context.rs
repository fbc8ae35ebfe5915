//! Merge plan for one query: grouping, aggregates, ordering, pagination.

use serde::{Deserialize, Serialize};

use shardline_common::error::MergeError;

use crate::aggregation::{AggregationType, AggregationUnit};
use crate::compare::OrderByItem;

/// One aggregate in the select list.
///
/// `index` is the output column the final value is written to. The partial
/// values a shard ships for it are read from `partial_columns`: just
/// `[index]` for most functions, or the derived `[sum, count]` columns for AVG.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationProjection {
    pub kind: AggregationType,
    pub distinct: bool,
    pub separator: Option<String>,
    pub index: usize,
    pub partial_columns: Vec<usize>,
}

impl AggregationProjection {
    pub fn new(kind: AggregationType, index: usize) -> Self {
        Self {
            kind,
            distinct: false,
            separator: None,
            index,
            partial_columns: vec![index],
        }
    }

    /// AVG whose shards ship SUM at `sum_index` and COUNT at `count_index`.
    pub fn avg(index: usize, sum_index: usize, count_index: usize) -> Self {
        Self {
            partial_columns: vec![sum_index, count_index],
            ..Self::new(AggregationType::Avg, index)
        }
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        if self.kind == AggregationType::Avg {
            // AVG(DISTINCT) shards ship their distinct value set, not sum/count.
            self.partial_columns = vec![self.index];
        }
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }

    pub fn create_unit(&self) -> Result<AggregationUnit, MergeError> {
        AggregationUnit::create(&self.kind, self.distinct, self.separator.as_deref())
    }

    /// Largest column index this projection touches.
    pub fn max_column(&self) -> usize {
        self.partial_columns
            .iter()
            .copied()
            .chain(std::iter::once(self.index))
            .max()
            .unwrap_or(self.index)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeContext {
    pub group_by: Vec<usize>,
    pub aggregations: Vec<AggregationProjection>,
    pub order_by: Vec<OrderByItem>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl MergeContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group_by(mut self, columns: impl IntoIterator<Item = usize>) -> Self {
        self.group_by = columns.into_iter().collect();
        self
    }

    pub fn aggregate(mut self, projection: AggregationProjection) -> Self {
        self.aggregations.push(projection);
        self
    }

    pub fn order_by(mut self, item: OrderByItem) -> Self {
        self.order_by.push(item);
        self
    }

    pub fn paginate(mut self, offset: usize, limit: Option<usize>) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }

    /// True when rows must be folded per group rather than streamed.
    pub fn is_aggregation(&self) -> bool {
        !self.group_by.is_empty() || !self.aggregations.is_empty()
    }

    /// Build every aggregation unit once, so an unsupported function fails
    /// before any shard row is read.
    pub fn validate(&self) -> Result<(), MergeError> {
        for projection in &self.aggregations {
            projection.create_unit()?;
        }
        Ok(())
    }
}
