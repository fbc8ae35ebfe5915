//! Shard key hashing for auto tables.
//!
//! A sharding value is hashed with xxHash3-64 over its canonical,
//! type-tagged encoding, so numerically equal values of different integer
//! widths (`Int32(7)`, `Int64(7)`, `Decimal(700, 2)`) land on the same shard.

use xxhash_rust::xxh3::xxh3_64;

use shardline_common::datum::Datum;
use shardline_metadata::{DataNode, ShardingAutoTableRule};

/// Hash one sharding value. `None` for values that cannot select a shard.
pub fn compute_shard_hash(datum: &Datum) -> Option<u64> {
    match datum {
        // `col = NULL` matches no row; arrays are not valid sharding keys.
        Datum::Null | Datum::Array(_) => None,
        _ => Some(xxh3_64(&datum.canonical_key())),
    }
}

/// Shard index in `0..sharding_count` for one value.
pub fn shard_index(datum: &Datum, sharding_count: u32) -> Option<u64> {
    if sharding_count == 0 {
        return None;
    }
    compute_shard_hash(datum).map(|h| h % u64::from(sharding_count))
}

/// Target data node of `rule` for one sharding value.
pub fn target_data_node<'a>(rule: &'a ShardingAutoTableRule, datum: &Datum) -> Option<&'a DataNode> {
    shard_index(datum, rule.sharding_count()).and_then(|idx| rule.data_node(idx))
}
