use std::cmp::Ordering;

use shardline_common::datum::OwnedRow;
use shardline_common::error::ShardlineResult;

use crate::compare::{compare_rows, OrderByItem};
use crate::result::QueryResult;

/// Concatenates shard results in shard order.
pub struct IteratorStreamMergedResult {
    results: Vec<Box<dyn QueryResult>>,
    current: usize,
}

impl IteratorStreamMergedResult {
    pub fn new(results: Vec<Box<dyn QueryResult>>) -> Self {
        Self { results, current: 0 }
    }

    pub fn next_row(&mut self) -> ShardlineResult<Option<OwnedRow>> {
        while let Some(result) = self.results.get_mut(self.current) {
            if let Some(row) = result.next_row()? {
                return Ok(Some(row));
            }
            self.current += 1;
        }
        Ok(None)
    }
}

/// K-way merge of shard results that are each already sorted by the same
/// ORDER BY items. Equal rows come out in shard order.
pub struct OrderByStreamMergedResult {
    results: Vec<Box<dyn QueryResult>>,
    heads: Vec<Option<OwnedRow>>,
    order_by: Vec<OrderByItem>,
}

impl OrderByStreamMergedResult {
    pub fn new(mut results: Vec<Box<dyn QueryResult>>, order_by: Vec<OrderByItem>) -> ShardlineResult<Self> {
        let mut heads = Vec::with_capacity(results.len());
        for result in results.iter_mut() {
            heads.push(result.next_row()?);
        }
        Ok(Self {
            results,
            heads,
            order_by,
        })
    }

    pub fn next_row(&mut self) -> ShardlineResult<Option<OwnedRow>> {
        let mut best: Option<usize> = None;
        for (i, head) in self.heads.iter().enumerate() {
            let Some(row) = head else { continue };
            let better = match best.and_then(|b| self.heads[b].as_ref()) {
                None => true,
                Some(current) => compare_rows(row, current, &self.order_by) == Ordering::Less,
            };
            if better {
                best = Some(i);
            }
        }
        let Some(idx) = best else {
            return Ok(None);
        };
        let next = self.results[idx].next_row()?;
        Ok(std::mem::replace(&mut self.heads[idx], next))
    }
}
