//! Merged results: one logical row stream over many shard results.

mod group_by;
mod stream;

pub use group_by::GroupByMemoryMergedResult;
pub use stream::{IteratorStreamMergedResult, OrderByStreamMergedResult};

use shardline_common::datum::OwnedRow;
use shardline_common::error::ShardlineResult;
use shardline_observability::record_merge_metrics;

pub(crate) enum Merger {
    Iterator(IteratorStreamMergedResult),
    OrderBy(OrderByStreamMergedResult),
    GroupBy(GroupByMemoryMergedResult),
}

impl Merger {
    fn name(&self) -> &'static str {
        match self {
            Merger::Iterator(_) => "iterator",
            Merger::OrderBy(_) => "order_by",
            Merger::GroupBy(_) => "group_by",
        }
    }

    fn next_row(&mut self) -> ShardlineResult<Option<OwnedRow>> {
        match self {
            Merger::Iterator(m) => m.next_row(),
            Merger::OrderBy(m) => m.next_row(),
            Merger::GroupBy(m) => m.next_row(),
        }
    }
}

/// The merged result handed to result assembly, with OFFSET/LIMIT applied.
///
/// Dropping it early abandons the merge; nothing outlives it.
pub struct MergedResult {
    merger: Merger,
    offset: usize,
    remaining: Option<usize>,
    shard_results: usize,
    emitted: usize,
    done: bool,
}

impl MergedResult {
    pub(crate) fn new(merger: Merger, offset: usize, limit: Option<usize>, shard_results: usize) -> Self {
        Self {
            merger,
            offset,
            remaining: limit,
            shard_results,
            emitted: 0,
            done: false,
        }
    }

    pub fn merger_name(&self) -> &'static str {
        self.merger.name()
    }

    pub fn next_row(&mut self) -> ShardlineResult<Option<OwnedRow>> {
        if self.done {
            return Ok(None);
        }
        if self.remaining == Some(0) {
            self.finish();
            return Ok(None);
        }
        while self.offset > 0 {
            if self.merger.next_row()?.is_none() {
                self.finish();
                return Ok(None);
            }
            self.offset -= 1;
        }
        match self.merger.next_row()? {
            Some(row) => {
                self.emitted += 1;
                if let Some(remaining) = self.remaining.as_mut() {
                    *remaining -= 1;
                }
                Ok(Some(row))
            }
            None => {
                self.finish();
                Ok(None)
            }
        }
    }

    /// Drain the remaining rows.
    pub fn collect_rows(mut self) -> ShardlineResult<Vec<OwnedRow>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next_row()? {
            rows.push(row);
        }
        Ok(rows)
    }

    fn finish(&mut self) {
        self.done = true;
        record_merge_metrics(self.merger.name(), self.shard_results, self.emitted);
        tracing::debug!(
            merger = self.merger.name(),
            shard_results = self.shard_results,
            rows = self.emitted,
            "merge complete"
        );
    }
}
