use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};

use shardline_common::datum::{Datum, OwnedRow};
use shardline_common::error::{MergeError, ShardlineResult};

use crate::aggregation::AggregationUnit;
use crate::compare::{compare_rows, OrderByItem};
use crate::context::MergeContext;
use crate::result::QueryResult;

struct Group {
    /// First row seen for the group; carries the non-aggregate columns.
    template: OwnedRow,
    units: Vec<AggregationUnit>,
}

/// Group-by merge held in memory.
///
/// Drains every shard result in shard order, folds each row into its
/// group's aggregation units, then finalizes and sorts the groups. A scalar
/// aggregate (no GROUP BY) over zero rows still yields one row.
pub struct GroupByMemoryMergedResult {
    rows: VecDeque<OwnedRow>,
    groups: usize,
}

impl GroupByMemoryMergedResult {
    pub fn new(
        results: &mut [Box<dyn QueryResult>],
        ctx: &MergeContext,
        max_groups: usize,
    ) -> ShardlineResult<Self> {
        let column_count = results
            .iter()
            .map(|r| r.column_count())
            .chain(ctx.aggregations.iter().map(|p| p.max_column() + 1))
            .chain(ctx.group_by.iter().map(|c| c + 1))
            .max()
            .unwrap_or(0);

        let mut order: Vec<Vec<u8>> = Vec::new();
        let mut groups: HashMap<Vec<u8>, Group> = HashMap::new();

        for result in results.iter_mut() {
            while let Some(row) = result.next_row()? {
                let key = encode_group_key(&ctx.group_by, &row)?;
                let group = match groups.entry(key) {
                    Entry::Occupied(e) => e.into_mut(),
                    Entry::Vacant(e) => {
                        if max_groups > 0 && order.len() >= max_groups {
                            return Err(MergeError::GroupLimitExceeded(max_groups).into());
                        }
                        order.push(e.key().clone());
                        e.insert(Group {
                            units: create_units(ctx)?,
                            template: row.clone(),
                        })
                    }
                };
                for (projection, unit) in ctx.aggregations.iter().zip(group.units.iter_mut()) {
                    let partials = projection
                        .partial_columns
                        .iter()
                        .map(|&c| row.get(c).cloned().ok_or(MergeError::ColumnOutOfBounds(c)))
                        .collect::<Result<Vec<_>, _>>()?;
                    unit.merge(&partials)?;
                }
            }
        }

        if order.is_empty() && ctx.group_by.is_empty() && !ctx.aggregations.is_empty() {
            let key = Vec::new();
            order.push(key.clone());
            groups.insert(
                key,
                Group {
                    template: OwnedRow::new(vec![Datum::Null; column_count]),
                    units: create_units(ctx)?,
                },
            );
        }

        let mut rows = Vec::with_capacity(order.len());
        for key in order {
            let Some(group) = groups.remove(&key) else {
                continue;
            };
            let mut row = group.template;
            if row.values.len() < column_count {
                row.values.resize(column_count, Datum::Null);
            }
            for (projection, unit) in ctx.aggregations.iter().zip(group.units) {
                row.values[projection.index] = unit.finish();
            }
            rows.push(row);
        }

        let sort_items: Vec<OrderByItem> = if ctx.order_by.is_empty() {
            ctx.group_by.iter().map(|&c| OrderByItem::asc(c)).collect()
        } else {
            ctx.order_by.clone()
        };
        if !sort_items.is_empty() {
            rows.sort_by(|a, b| compare_rows(a, b, &sort_items));
        }

        let groups = rows.len();
        Ok(Self {
            rows: rows.into(),
            groups,
        })
    }

    /// Number of groups produced.
    pub fn group_count(&self) -> usize {
        self.groups
    }

    pub fn next_row(&mut self) -> ShardlineResult<Option<OwnedRow>> {
        Ok(self.rows.pop_front())
    }
}

fn create_units(ctx: &MergeContext) -> Result<Vec<AggregationUnit>, MergeError> {
    ctx.aggregations.iter().map(|p| p.create_unit()).collect()
}

/// Deterministic binary group key. Equal values of different numeric
/// widths, and all NULLs, fall into one group.
fn encode_group_key(group_by: &[usize], row: &OwnedRow) -> Result<Vec<u8>, MergeError> {
    let mut key = Vec::with_capacity(group_by.len() * 9);
    for &idx in group_by {
        let datum = row.get(idx).ok_or(MergeError::ColumnOutOfBounds(idx))?;
        let encoded = datum.canonical_key();
        key.extend_from_slice(&(encoded.len() as u32).to_be_bytes());
        key.extend_from_slice(&encoded);
    }
    Ok(key)
}
