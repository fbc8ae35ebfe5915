//! Per-shard query results consumed by the mergers.

use std::collections::VecDeque;

use shardline_common::datum::OwnedRow;
use shardline_common::error::ShardlineResult;

/// Rows returned by one shard, pulled in order.
pub trait QueryResult: Send {
    /// Storage unit the rows came from, for diagnostics.
    fn storage_unit(&self) -> &str;

    fn column_count(&self) -> usize;

    /// Next row, or `None` once the shard is exhausted.
    fn next_row(&mut self) -> ShardlineResult<Option<OwnedRow>>;
}

/// A shard result fully buffered in memory.
#[derive(Debug, Clone)]
pub struct MemoryQueryResult {
    storage_unit: String,
    column_count: usize,
    rows: VecDeque<OwnedRow>,
}

impl MemoryQueryResult {
    pub fn new(storage_unit: impl Into<String>, column_count: usize, rows: Vec<OwnedRow>) -> Self {
        Self {
            storage_unit: storage_unit.into(),
            column_count,
            rows: rows.into(),
        }
    }

    /// Build from rows, taking the column count from the widest row.
    pub fn from_rows(storage_unit: impl Into<String>, rows: Vec<OwnedRow>) -> Self {
        let column_count = rows.iter().map(OwnedRow::len).max().unwrap_or(0);
        Self::new(storage_unit, column_count, rows)
    }

    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl QueryResult for MemoryQueryResult {
    fn storage_unit(&self) -> &str {
        &self.storage_unit
    }

    fn column_count(&self) -> usize {
        self.column_count
    }

    fn next_row(&mut self) -> ShardlineResult<Option<OwnedRow>> {
        Ok(self.rows.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shardline_common::datum::Datum;

    #[test]
    fn test_memory_result_drains_in_order() {
        let mut result = MemoryQueryResult::from_rows(
            "ds_0",
            vec![
                OwnedRow::new(vec![Datum::Int64(1)]),
                OwnedRow::new(vec![Datum::Int64(2), Datum::Null]),
            ],
        );
        assert_eq!(result.column_count(), 2);
        assert_eq!(result.next_row().unwrap().unwrap().values[0], Datum::Int64(1));
        assert_eq!(result.remaining(), 1);
        assert!(result.next_row().unwrap().is_some());
        assert!(result.next_row().unwrap().is_none());
    }
}
