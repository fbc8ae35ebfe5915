//! Rule metadata: per-database storage units and sharding rules, held in a
//! versioned store that publishes immutable snapshots.

pub mod database;
pub mod rule;
pub mod store;

pub use database::{DatabaseMetaData, RuleChange, StorageUnit};
pub use rule::{DataNode, RuleKey, ShardingAutoTableRule, ShardingRuleMetaData};
pub use store::{ClusterMetaData, MetaDataStore};
