//! End-to-end aggregate merge properties over shard results.

use std::cmp::Ordering;

use proptest::prelude::*;

use shardline_common::datum::{Datum, OwnedRow};
use shardline_common::error::{MergeError, ShardlineError};
use shardline_merge::{
    AggregationProjection, AggregationType, AggregationUnit, MemoryQueryResult, MergeContext,
    MergeEngine, QueryResult,
};

fn fold(kind: &AggregationType, distinct: bool, rows: &[Vec<Datum>]) -> Datum {
    let mut unit = AggregationUnit::create(kind, distinct, None).unwrap();
    for row in rows {
        unit.merge(row).unwrap();
    }
    unit.finish()
}

/// Same value, or both NULL. NaN matches NaN and `-0.0` matches `0.0`.
fn same_value(a: &Datum, b: &Datum) -> bool {
    (a.is_null() && b.is_null()) || a.numeric_cmp(b) == Some(Ordering::Equal)
}

fn arb_special_float() -> impl Strategy<Value = f64> {
    prop_oneof![
        Just(f64::NAN),
        Just(f64::INFINITY),
        Just(f64::NEG_INFINITY),
        Just(-0.0),
        Just(1e300),
        Just(-1e300),
        Just(f64::MIN_POSITIVE),
    ]
}

fn arb_exact() -> impl Strategy<Value = Datum> {
    prop_oneof![
        any::<i32>().prop_map(Datum::Int32),
        any::<i64>().prop_map(Datum::Int64),
        (-10i128.pow(20)..10i128.pow(20), 0u8..8).prop_map(|(m, s)| Datum::Decimal(m, s)),
    ]
}

fn arb_numeric() -> impl Strategy<Value = Datum> {
    prop_oneof![
        1 => Just(Datum::Null),
        3 => arb_exact(),
        2 => prop::num::f64::ANY.prop_map(Datum::Float64),
        1 => arb_special_float().prop_map(Datum::Float64),
        1 => (-1e6f64..1e6).prop_map(Datum::Float64),
    ]
}

fn arb_integral() -> impl Strategy<Value = Datum> {
    prop_oneof![
        Just(Datum::Null),
        any::<i32>().prop_map(Datum::Int32),
        any::<i64>().prop_map(Datum::Int64),
    ]
}

/// One partial per shard row, in arrival order and shuffled.
fn arb_shard_partials<S>(values: S) -> impl Strategy<Value = (Vec<Vec<Datum>>, Vec<Vec<Datum>>)>
where
    S: Strategy<Value = Datum>,
{
    prop::collection::vec(values.prop_map(|v| vec![v]), 0..16)
        .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
}

proptest! {
    #[test]
    fn numeric_units_ignore_shard_order((arrival, shuffled) in arb_shard_partials(arb_numeric())) {
        for kind in [AggregationType::Sum, AggregationType::Max, AggregationType::Min] {
            let a = fold(&kind, false, &arrival);
            let b = fold(&kind, false, &shuffled);
            prop_assert!(same_value(&a, &b), "{}: {} vs {}", kind, a, b);
        }
    }

    #[test]
    fn integral_units_ignore_shard_order((arrival, shuffled) in arb_shard_partials(arb_integral())) {
        for kind in [AggregationType::Count, AggregationType::BitXor] {
            let a = fold(&kind, false, &arrival);
            let b = fold(&kind, false, &shuffled);
            prop_assert!(same_value(&a, &b), "{}: {} vs {}", kind, a, b);
        }
    }

    #[test]
    fn distinct_count_matches_single_shard(shards in prop::collection::vec(
        prop::collection::vec(0i64..20, 0..8), 1..5)
    ) {
        let mut unit = AggregationUnit::create(&AggregationType::Count, true, None).unwrap();
        for shard in &shards {
            let local: Vec<Datum> = shard.iter().map(|v| Datum::Int64(*v)).collect();
            unit.merge(&[Datum::Array(local)]).unwrap();
        }
        let mut all: Vec<i64> = shards.iter().flatten().copied().collect();
        all.sort_unstable();
        all.dedup();
        prop_assert_eq!(unit.finish(), Datum::Int64(all.len() as i64));
    }

    #[test]
    fn distinct_avg_split_matches_single_shard(
        (shards, shuffled) in prop::collection::vec(prop::collection::vec(arb_exact(), 0..8), 1..5)
            .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
    ) {
        let single = vec![vec![Datum::Array(shards.iter().flatten().cloned().collect())]];
        let split: Vec<Vec<Datum>> = shuffled.into_iter().map(|s| vec![Datum::Array(s)]).collect();
        let a = fold(&AggregationType::Avg, true, &single);
        let b = fold(&AggregationType::Avg, true, &split);
        prop_assert!(same_value(&a, &b), "{} vs {}", a, b);
    }

    #[test]
    fn distinct_float_sum_and_avg_split_match_single_shard(
        (shards, shuffled) in prop::collection::vec(
            prop::collection::vec(prop::num::f64::ANY.prop_map(Datum::Float64), 0..8), 1..5)
            .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
    ) {
        let single = vec![vec![Datum::Array(shards.iter().flatten().cloned().collect())]];
        let split: Vec<Vec<Datum>> = shuffled.into_iter().map(|s| vec![Datum::Array(s)]).collect();
        for kind in [AggregationType::Sum, AggregationType::Avg] {
            let a = fold(&kind, true, &single);
            let b = fold(&kind, true, &split);
            prop_assert!(same_value(&a, &b), "{}: {} vs {}", kind, a, b);
        }
    }
}

fn shard(name: &str, rows: Vec<Vec<Datum>>) -> Box<dyn QueryResult> {
    Box::new(MemoryQueryResult::from_rows(
        name,
        rows.into_iter().map(OwnedRow::new).collect(),
    ))
}

fn text(s: &str) -> Datum {
    Datum::Text(s.into())
}

#[test]
fn test_distinct_union_across_shards() {
    // Each shard ships its local distinct set: {1,2} and {2,3}.
    let results = vec![
        shard("ds_0", vec![vec![
            Datum::Array(vec![Datum::Int64(1), Datum::Int64(2)]),
            Datum::Array(vec![Datum::Int64(1), Datum::Int64(2)]),
        ]]),
        shard("ds_1", vec![vec![
            Datum::Array(vec![Datum::Int64(2), Datum::Int64(3)]),
            Datum::Array(vec![Datum::Int64(2), Datum::Int64(3)]),
        ]]),
    ];
    let ctx = MergeContext::new()
        .aggregate(AggregationProjection::new(AggregationType::Sum, 0).distinct())
        .aggregate(AggregationProjection::new(AggregationType::Count, 1).distinct());
    let rows = MergeEngine::default().merge(results, &ctx).unwrap().collect_rows().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].values, vec![Datum::Int64(6), Datum::Int64(3)]);
}

#[test]
fn test_avg_from_sum_and_count() {
    // [AVG, SUM, COUNT]
    let results = vec![
        shard("ds_0", vec![vec![Datum::Int64(5), Datum::Int64(10), Datum::Int64(2)]]),
        shard("ds_1", vec![vec![Datum::Int64(7), Datum::Int64(20), Datum::Int64(3)]]),
    ];
    let ctx = MergeContext::new().aggregate(AggregationProjection::avg(0, 1, 2));
    let rows = MergeEngine::default().merge(results, &ctx).unwrap().collect_rows().unwrap();
    assert_eq!(rows[0].values[0], Datum::Int64(6));
}

#[test]
fn test_group_concat_follows_shard_order() {
    let ctx = MergeContext::new()
        .aggregate(AggregationProjection::new(AggregationType::GroupConcat, 0).with_separator(","));

    let forward = vec![
        shard("ds_0", vec![vec![text("a")], vec![text("b")]]),
        shard("ds_1", vec![vec![text("c")]]),
    ];
    let rows = MergeEngine::default().merge(forward, &ctx).unwrap().collect_rows().unwrap();
    assert_eq!(rows[0].values[0], text("a,b,c"));

    let reversed = vec![
        shard("ds_1", vec![vec![text("c")]]),
        shard("ds_0", vec![vec![text("a")], vec![text("b")]]),
    ];
    let rows = MergeEngine::default().merge(reversed, &ctx).unwrap().collect_rows().unwrap();
    assert_eq!(rows[0].values[0], text("c,a,b"));
}

#[test]
fn test_unknown_function_is_rejected_by_name() {
    let ctx = MergeContext::new()
        .aggregate(AggregationProjection::new(AggregationType::from_name("PERCENTILE_CONT"), 0));
    match MergeEngine::default().merge(vec![shard("ds_0", vec![])], &ctx) {
        Err(ShardlineError::Merge(MergeError::UnsupportedAggregation(name))) => {
            assert_eq!(name, "PERCENTILE_CONT");
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("unsupported function was accepted"),
    }
}
