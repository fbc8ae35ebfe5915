//! Broadcast routing against live metadata.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use shardline_common::config::ShardingAutoTableRuleConfiguration;
use shardline_metadata::{DatabaseMetaData, MetaDataStore, StorageUnit};
use shardline_route::{ConnectionContext, QueryContext, RouteEngine};

fn units(n: usize) -> Vec<StorageUnit> {
    (0..n)
        .map(|i| StorageUnit { name: format!("ds_{}", i), url: String::new() })
        .collect()
}

fn broadcast_query() -> QueryContext {
    QueryContext::new("SELECT * FROM t_dict", ConnectionContext::new("logic_db"))
        .with_tables(["t_dict"])
}

#[test]
fn test_one_unit_per_storage_unit() {
    for n in 0..6 {
        let store = MetaDataStore::new();
        store.add_database(DatabaseMetaData::new("logic_db", units(n))).unwrap();
        let ctx = RouteEngine::new().route_current(&broadcast_query(), &store).unwrap();
        assert_eq!(ctx.len(), n, "unit count for {} storage units", n);
        for (i, unit) in ctx.route_units().iter().enumerate() {
            let expected = format!("ds_{}", i);
            assert_eq!(unit.data_source_mapper.logic_name, expected);
            assert_eq!(unit.data_source_mapper.actual_name, expected);
            assert!(unit.table_mappers.is_empty());
        }
    }
}

#[test]
fn test_routing_sees_whole_rule_changes() {
    let store = Arc::new(MetaDataStore::new());
    store.add_database(DatabaseMetaData::new("logic_db", units(4))).unwrap();
    let stop = Arc::new(AtomicBool::new(false));

    let writer = {
        let store = Arc::clone(&store);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut version = 0;
            while !stop.load(Ordering::Relaxed) && version < 2_000 {
                version += 1;
                let units = if version % 2 == 0 {
                    vec!["ds_0".to_string(), "ds_1".to_string()]
                } else {
                    vec!["ds_2".to_string(), "ds_3".to_string()]
                };
                store
                    .alter_database("logic_db", |db| {
                        db.alter_auto_table(
                            ShardingAutoTableRuleConfiguration {
                                logic_table: "t_order".into(),
                                storage_units: units,
                                sharding_column: "order_id".into(),
                                sharding_count: 4,
                            },
                            version,
                        )
                    })
                    .unwrap();
            }
        })
    };

    let engine = RouteEngine::new();
    let query = QueryContext::new("SELECT * FROM t_order", ConnectionContext::new("logic_db"))
        .with_tables(["t_order"]);
    for _ in 0..2_000 {
        let ctx = match engine.route_current(&query, &store) {
            Ok(ctx) => ctx,
            Err(e) => panic!("route failed: {}", e),
        };
        if ctx.is_empty() {
            continue;
        }
        // Broadcast before the first rule, or one whole rule afterwards.
        let used = ctx.actual_storage_units();
        let ok = used == ["ds_0", "ds_1", "ds_2", "ds_3"]
            || used == ["ds_0", "ds_1"]
            || used == ["ds_2", "ds_3"];
        assert!(ok, "mixed snapshot observed: {:?}", used);
    }
    stop.store(true, Ordering::Relaxed);
    writer.join().unwrap();
}
