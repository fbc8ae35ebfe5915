//! Datum and row comparison for mergers.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use shardline_common::datum::{Datum, OwnedRow};

/// Total order over datums.
///
/// Values order by class first (NULL, boolean, number, text, timestamp,
/// date, bytes, array), then by value. Numbers compare by exact value with
/// NaN above every other number. Numerically equal values of different
/// representation order by variant, then float bits, then decimal scale,
/// so the result never depends on which operand arrived first.
pub fn total_cmp(a: &Datum, b: &Datum) -> Ordering {
    class_rank(a).cmp(&class_rank(b)).then_with(|| match (a, b) {
        (Datum::Boolean(x), Datum::Boolean(y)) => x.cmp(y),
        (Datum::Text(x), Datum::Text(y)) => x.cmp(y),
        (Datum::Timestamp(x), Datum::Timestamp(y)) => x.cmp(y),
        (Datum::Date(x), Datum::Date(y)) => x.cmp(y),
        (Datum::Bytea(x), Datum::Bytea(y)) => x.cmp(y),
        (Datum::Array(x), Datum::Array(y)) => x
            .iter()
            .zip(y.iter())
            .map(|(l, r)| total_cmp(l, r))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => a
            .numeric_cmp(b)
            .unwrap_or(Ordering::Equal)
            .then_with(|| variant_rank(a).cmp(&variant_rank(b)))
            .then_with(|| float_bits(a).cmp(&float_bits(b)))
            .then_with(|| decimal_scale(a).cmp(&decimal_scale(b))),
    })
}

fn class_rank(d: &Datum) -> u8 {
    match d {
        Datum::Null => 0,
        Datum::Boolean(_) => 1,
        Datum::Int32(_) | Datum::Int64(_) | Datum::Decimal(_, _) | Datum::Float64(_) => 2,
        Datum::Text(_) => 3,
        Datum::Timestamp(_) => 4,
        Datum::Date(_) => 5,
        Datum::Bytea(_) => 6,
        Datum::Array(_) => 7,
    }
}

fn variant_rank(d: &Datum) -> u8 {
    match d {
        Datum::Int32(_) => 0,
        Datum::Int64(_) => 1,
        Datum::Decimal(_, _) => 2,
        Datum::Float64(_) => 3,
        _ => 4,
    }
}

fn float_bits(d: &Datum) -> Option<u64> {
    match d {
        Datum::Float64(v) => Some(v.to_bits()),
        _ => None,
    }
}

fn decimal_scale(d: &Datum) -> Option<u8> {
    match d {
        Datum::Decimal(_, s) => Some(*s),
        _ => None,
    }
}

/// One ORDER BY key over a shard row column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderByItem {
    pub index: usize,
    pub descending: bool,
    /// Place NULL before non-null values regardless of direction.
    pub nulls_first: bool,
}

impl OrderByItem {
    pub fn asc(index: usize) -> Self {
        Self {
            index,
            descending: false,
            nulls_first: true,
        }
    }

    pub fn desc(index: usize) -> Self {
        Self {
            index,
            descending: true,
            nulls_first: false,
        }
    }
}

/// Compare two rows by `items`; missing columns compare as NULL.
pub fn compare_rows(a: &OwnedRow, b: &OwnedRow, items: &[OrderByItem]) -> Ordering {
    for item in items {
        let da = a.get(item.index).unwrap_or(&Datum::Null);
        let db = b.get(item.index).unwrap_or(&Datum::Null);
        let ord = match (da.is_null(), db.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) if item.nulls_first => Ordering::Less,
            (true, false) => Ordering::Greater,
            (false, true) if item.nulls_first => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) if item.descending => total_cmp(db, da),
            (false, false) => total_cmp(da, db),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}
