use std::cmp::Ordering;
use std::collections::HashSet;

use shardline_common::datum::Datum;
use shardline_common::error::MergeError;

use super::sum::NumericSum;
use super::AggregationType;
use crate::compare::total_cmp;

/// Fractional digits of an exact AVG result.
pub const AVG_SCALE: u8 = 4;

const DEFAULT_SEPARATOR: &str = ",";

/// Set of distinct values in first-seen order.
///
/// Keys are canonical encodings, so `Int32(1)` and `Int64(1)` count once.
#[derive(Debug, Clone, Default)]
pub struct DistinctValues {
    seen: HashSet<Vec<u8>>,
    values: Vec<Datum>,
}

impl DistinctValues {
    fn insert(&mut self, datum: &Datum) {
        match datum {
            Datum::Null => {}
            Datum::Array(elems) => {
                for elem in elems {
                    self.insert(elem);
                }
            }
            other => {
                if self.seen.insert(other.canonical_key()) {
                    self.values.push(other.clone());
                }
            }
        }
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    /// Values first seen at or after position `start`.
    fn since(&self, start: usize) -> &[Datum] {
        self.values.get(start..).unwrap_or_default()
    }
}

/// Second-phase merge state for one (group, aggregate) pair.
///
/// Feed each contributing shard row's partial values with [`merge`], then
/// read the final value once with [`finish`], which consumes the unit.
///
/// Partial layouts: `[value]` for Comparable, Accumulation and BitXor;
/// `[sum, count]` for Average; for the DISTINCT variants every element is
/// one distinct value and arrays are flattened. GroupConcat takes every
/// non-null element as a fragment.
///
/// [`merge`]: AggregationUnit::merge
/// [`finish`]: AggregationUnit::finish
#[derive(Debug, Clone)]
pub enum AggregationUnit {
    /// MAX (`keep_min == false`) or MIN.
    Comparable { keep_min: bool, result: Option<Datum> },
    /// SUM and COUNT: running sum of partial sums or counts.
    Accumulation { sum: NumericSum },
    DistinctSum { values: DistinctValues, sum: NumericSum },
    DistinctCount(DistinctValues),
    Average { sum: NumericSum, count: i64 },
    DistinctAverage { values: DistinctValues, sum: NumericSum },
    BitXor { result: Option<u64> },
    GroupConcat { separator: String, fragments: Vec<String> },
    DistinctGroupConcat { separator: String, values: DistinctValues },
}

impl AggregationUnit {
    /// Pick the merge strategy for an aggregate function.
    ///
    /// Kinds without a strategy fail here, before any row is merged.
    pub fn create(
        kind: &AggregationType,
        distinct: bool,
        separator: Option<&str>,
    ) -> Result<Self, MergeError> {
        let separator = separator.unwrap_or(DEFAULT_SEPARATOR).to_string();
        let unit = match kind {
            AggregationType::Max => AggregationUnit::Comparable {
                keep_min: false,
                result: None,
            },
            AggregationType::Min => AggregationUnit::Comparable {
                keep_min: true,
                result: None,
            },
            AggregationType::Sum if distinct => AggregationUnit::DistinctSum {
                values: DistinctValues::default(),
                sum: NumericSum::default(),
            },
            AggregationType::Count if distinct => {
                AggregationUnit::DistinctCount(DistinctValues::default())
            }
            AggregationType::Sum | AggregationType::Count => {
                AggregationUnit::Accumulation { sum: NumericSum::default() }
            }
            AggregationType::Avg if distinct => AggregationUnit::DistinctAverage {
                values: DistinctValues::default(),
                sum: NumericSum::default(),
            },
            AggregationType::Avg => AggregationUnit::Average {
                sum: NumericSum::default(),
                count: 0,
            },
            AggregationType::BitXor => AggregationUnit::BitXor { result: None },
            AggregationType::GroupConcat if distinct => AggregationUnit::DistinctGroupConcat {
                separator,
                values: DistinctValues::default(),
            },
            AggregationType::GroupConcat => AggregationUnit::GroupConcat {
                separator,
                fragments: Vec::new(),
            },
            AggregationType::BitAnd
            | AggregationType::BitOr
            | AggregationType::StddevPop
            | AggregationType::StddevSamp
            | AggregationType::VarPop
            | AggregationType::VarSamp
            | AggregationType::Other(_) => {
                return Err(MergeError::UnsupportedAggregation(kind.name().to_string()))
            }
        };
        Ok(unit)
    }

    pub fn function_name(&self) -> &'static str {
        match self {
            AggregationUnit::Comparable { keep_min: true, .. } => "MIN",
            AggregationUnit::Comparable { keep_min: false, .. } => "MAX",
            AggregationUnit::Accumulation { .. } => "SUM/COUNT",
            AggregationUnit::DistinctSum { .. } => "SUM(DISTINCT)",
            AggregationUnit::DistinctCount(_) => "COUNT(DISTINCT)",
            AggregationUnit::Average { .. } => "AVG",
            AggregationUnit::DistinctAverage { .. } => "AVG(DISTINCT)",
            AggregationUnit::BitXor { .. } => "BIT_XOR",
            AggregationUnit::GroupConcat { .. } => "GROUP_CONCAT",
            AggregationUnit::DistinctGroupConcat { .. } => "GROUP_CONCAT(DISTINCT)",
        }
    }

    /// Fold one shard row's partial values into the running state.
    pub fn merge(&mut self, values: &[Datum]) -> Result<(), MergeError> {
        let function = self.function_name();
        let invalid = |value: &Datum| MergeError::InvalidPartial {
            function,
            value: value.to_string(),
        };

        match self {
            AggregationUnit::Comparable { keep_min, result } => {
                let Some(value) = values.first().filter(|v| !v.is_null()) else {
                    return Ok(());
                };
                let wanted = if *keep_min { Ordering::Less } else { Ordering::Greater };
                let replace = match result {
                    None => true,
                    Some(current) => total_cmp(value, current) == wanted,
                };
                if replace {
                    *result = Some(value.clone());
                }
            }
            AggregationUnit::Accumulation { sum } => {
                let Some(value) = values.first() else {
                    return Ok(());
                };
                if !sum.add(value) {
                    return Err(invalid(value));
                }
            }
            AggregationUnit::DistinctSum { values: set, sum }
            | AggregationUnit::DistinctAverage { values: set, sum } => {
                for value in values {
                    if let Some(bad) = first_non_numeric(value) {
                        return Err(invalid(bad));
                    }
                    let start = set.len();
                    set.insert(value);
                    if let Some(bad) = set.since(start).iter().find(|v| !sum.add(v)) {
                        return Err(invalid(bad));
                    }
                }
            }
            AggregationUnit::DistinctCount(set) => {
                for value in values {
                    set.insert(value);
                }
            }
            AggregationUnit::Average { sum, count } => {
                let (Some(partial_sum), Some(partial_count)) = (values.first(), values.get(1)) else {
                    return Err(MergeError::InvalidPartial {
                        function,
                        value: format!("{} values, expected [sum, count]", values.len()),
                    });
                };
                let partial_count = match partial_count {
                    Datum::Null => 0,
                    c => c.as_i64().ok_or_else(|| invalid(c))?,
                };
                *count = count.checked_add(partial_count).ok_or_else(|| invalid(&Datum::Int64(partial_count)))?;
                if !sum.add(partial_sum) {
                    return Err(invalid(partial_sum));
                }
            }
            AggregationUnit::BitXor { result } => {
                let Some(value) = values.first().filter(|v| !v.is_null()) else {
                    return Ok(());
                };
                let bits = value.as_u64_bits().ok_or_else(|| invalid(value))?;
                *result = Some(result.unwrap_or(0) ^ bits);
            }
            AggregationUnit::GroupConcat { fragments, .. } => {
                for value in values {
                    push_fragments(value, fragments);
                }
            }
            AggregationUnit::DistinctGroupConcat { separator, values: set } => {
                let mut fragments = Vec::new();
                for value in values {
                    push_fragments(value, &mut fragments);
                }
                for fragment in fragments {
                    for piece in fragment.split(separator.as_str()) {
                        set.insert(&Datum::Text(piece.to_string()));
                    }
                }
            }
        }
        Ok(())
    }

    /// Final value. Empty units yield NULL, except COUNT(DISTINCT) which
    /// yields 0.
    pub fn finish(self) -> Datum {
        match self {
            AggregationUnit::Comparable { result, .. } => result.unwrap_or(Datum::Null),
            AggregationUnit::Accumulation { sum } | AggregationUnit::DistinctSum { sum, .. } => {
                sum.finish().unwrap_or(Datum::Null)
            }
            AggregationUnit::DistinctCount(set) => Datum::Int64(set.len() as i64),
            AggregationUnit::Average { sum, count } => sum
                .finish()
                .and_then(|s| s.div_by_count(count, AVG_SCALE))
                .unwrap_or(Datum::Null),
            AggregationUnit::DistinctAverage { values, sum } => sum
                .finish()
                .and_then(|s| s.div_by_count(values.len() as i64, AVG_SCALE))
                .unwrap_or(Datum::Null),
            AggregationUnit::BitXor { result } => match result {
                None => Datum::Null,
                Some(bits) => match i64::try_from(bits) {
                    Ok(v) => Datum::Int64(v),
                    Err(_) => Datum::Decimal(i128::from(bits), 0),
                },
            },
            AggregationUnit::GroupConcat { separator, fragments } => {
                if fragments.is_empty() {
                    Datum::Null
                } else {
                    Datum::Text(fragments.join(&separator))
                }
            }
            AggregationUnit::DistinctGroupConcat { separator, values } => {
                if values.values.is_empty() {
                    return Datum::Null;
                }
                let pieces: Vec<String> = values.values.iter().map(|v| v.to_string()).collect();
                Datum::Text(pieces.join(&separator))
            }
        }
    }
}

fn first_non_numeric(value: &Datum) -> Option<&Datum> {
    match value {
        Datum::Null => None,
        Datum::Array(elems) => elems.iter().find_map(first_non_numeric),
        v if v.is_numeric() => None,
        v => Some(v),
    }
}

fn push_fragments(value: &Datum, fragments: &mut Vec<String>) {
    match value {
        Datum::Null => {}
        Datum::Text(s) => fragments.push(s.clone()),
        Datum::Array(elems) => {
            for elem in elems {
                push_fragments(elem, fragments);
            }
        }
        other => fragments.push(other.to_string()),
    }
}
