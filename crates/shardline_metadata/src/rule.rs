//! Sharding rule metadata: the compiled form of `ShardingRuleConfiguration`
//! that routing reads.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use shardline_common::config::{ShardingAutoTableRuleConfiguration, ShardingRuleConfiguration};

/// Identity of one rule entry, used for version tracking.
/// Table names are stored lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RuleKey {
    AutoTable(String),
    BroadcastTable(String),
}

impl RuleKey {
    pub fn auto_table(name: &str) -> Self {
        RuleKey::AutoTable(name.to_ascii_lowercase())
    }

    pub fn broadcast_table(name: &str) -> Self {
        RuleKey::BroadcastTable(name.to_ascii_lowercase())
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKey::AutoTable(t) => write!(f, "auto_table:{}", t),
            RuleKey::BroadcastTable(t) => write!(f, "broadcast_table:{}", t),
        }
    }
}

/// One physical table placement: `storage_unit.table`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DataNode {
    pub storage_unit: String,
    pub table: String,
}

impl fmt::Display for DataNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.storage_unit, self.table)
    }
}

/// A compiled auto table rule.
///
/// Data node `i` is `<logic_table>_<i>` on `storage_units[i % storage_units.len()]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardingAutoTableRule {
    config: ShardingAutoTableRuleConfiguration,
    data_nodes: Vec<DataNode>,
}

impl ShardingAutoTableRule {
    /// Compile a validated configuration. `storage_units` must already be
    /// resolved to their registered spelling.
    pub fn new(config: ShardingAutoTableRuleConfiguration) -> Self {
        let data_nodes = (0..config.sharding_count as usize)
            .map(|i| DataNode {
                storage_unit: config.storage_units[i % config.storage_units.len()].clone(),
                table: format!("{}_{}", config.logic_table, i),
            })
            .collect();
        Self { config, data_nodes }
    }

    pub fn logic_table(&self) -> &str {
        &self.config.logic_table
    }

    pub fn sharding_column(&self) -> &str {
        &self.config.sharding_column
    }

    pub fn sharding_count(&self) -> u32 {
        self.config.sharding_count
    }

    pub fn config(&self) -> &ShardingAutoTableRuleConfiguration {
        &self.config
    }

    pub fn data_nodes(&self) -> &[DataNode] {
        &self.data_nodes
    }

    /// Data node for a shard index (already reduced modulo `sharding_count`).
    pub fn data_node(&self, shard_index: u64) -> Option<&DataNode> {
        self.data_nodes.get(shard_index as usize)
    }
}

/// All sharding rules of one database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShardingRuleMetaData {
    auto_tables: BTreeMap<String, ShardingAutoTableRule>,
    broadcast_tables: BTreeSet<String>,
}

impl ShardingRuleMetaData {
    pub fn auto_table(&self, logic_table: &str) -> Option<&ShardingAutoTableRule> {
        self.auto_tables.get(&logic_table.to_ascii_lowercase())
    }

    pub fn auto_tables(&self) -> impl Iterator<Item = &ShardingAutoTableRule> {
        self.auto_tables.values()
    }

    pub fn is_broadcast_table(&self, table: &str) -> bool {
        self.broadcast_tables.contains(&table.to_ascii_lowercase())
    }

    pub fn broadcast_tables(&self) -> impl Iterator<Item = &str> {
        self.broadcast_tables.iter().map(String::as_str)
    }

    /// True if `table` is governed by any sharding rule.
    pub fn is_sharded_table(&self, table: &str) -> bool {
        self.auto_table(table).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.auto_tables.is_empty() && self.broadcast_tables.is_empty()
    }

    pub(crate) fn put_auto_table(&mut self, rule: ShardingAutoTableRule) -> Option<ShardingAutoTableRule> {
        self.auto_tables
            .insert(rule.logic_table().to_ascii_lowercase(), rule)
    }

    pub(crate) fn remove_auto_table(&mut self, logic_table: &str) -> Option<ShardingAutoTableRule> {
        self.auto_tables.remove(&logic_table.to_ascii_lowercase())
    }

    pub(crate) fn put_broadcast_table(&mut self, table: &str) -> bool {
        self.broadcast_tables.insert(table.to_ascii_lowercase())
    }

    pub(crate) fn remove_broadcast_table(&mut self, table: &str) -> bool {
        self.broadcast_tables.remove(&table.to_ascii_lowercase())
    }

    /// Export back to the configuration form.
    pub fn to_configuration(&self) -> ShardingRuleConfiguration {
        ShardingRuleConfiguration {
            broadcast_tables: self.broadcast_tables.clone(),
            auto_tables: self.auto_tables.values().map(|r| r.config.clone()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_rule(count: u32) -> ShardingAutoTableRule {
        ShardingAutoTableRule::new(ShardingAutoTableRuleConfiguration {
            logic_table: "t_order".into(),
            storage_units: vec!["ds_0".into(), "ds_1".into()],
            sharding_column: "order_id".into(),
            sharding_count: count,
        })
    }

    #[test]
    fn test_data_nodes_round_robin() {
        let rule = order_rule(4);
        let nodes: Vec<String> = rule.data_nodes().iter().map(|n| n.to_string()).collect();
        assert_eq!(
            nodes,
            vec!["ds_0.t_order_0", "ds_1.t_order_1", "ds_0.t_order_2", "ds_1.t_order_3"]
        );
        assert_eq!(rule.data_node(3).unwrap().storage_unit, "ds_1");
        assert!(rule.data_node(4).is_none());
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mut rules = ShardingRuleMetaData::default();
        rules.put_auto_table(order_rule(2));
        rules.put_broadcast_table("T_Dict");
        assert!(rules.auto_table("T_ORDER").is_some());
        assert!(rules.is_broadcast_table("t_dict"));
        assert!(!rules.is_sharded_table("t_dict"));
        assert_eq!(rules.to_configuration().auto_tables.len(), 1);
    }
}
