use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use shardline_common::config::{DatabaseConfig, ShardingAutoTableRuleConfiguration, StorageUnitConfig};
use shardline_common::error::MetaDataError;
use shardline_common::names::find_ignore_case;

use crate::rule::{RuleKey, ShardingAutoTableRule, ShardingRuleMetaData};

/// A physical storage unit known to a database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageUnit {
    pub name: String,
    pub url: String,
}

impl From<&StorageUnitConfig> for StorageUnit {
    fn from(config: &StorageUnitConfig) -> Self {
        Self {
            name: config.name.clone(),
            url: config.url.clone(),
        }
    }
}

/// Effect of one rule mutation on a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleChange {
    /// No previous entry existed; one was created.
    Created,
    /// An existing entry was replaced.
    Replaced,
    /// An existing entry was removed.
    Removed,
    /// Drop of an entry that did not exist. Only the version was recorded.
    Absent,
}

impl RuleChange {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleChange::Created => "created",
            RuleChange::Replaced => "replaced",
            RuleChange::Removed => "removed",
            RuleChange::Absent => "absent",
        }
    }
}

/// Metadata of one logical database as of one store version.
///
/// Instances are immutable once published through the `MetaDataStore`;
/// mutation happens on a private clone that is swapped in atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseMetaData {
    name: String,
    /// Declaration order is the broadcast routing order.
    storage_units: Vec<StorageUnit>,
    rules: ShardingRuleMetaData,
    /// Last applied event version per rule key, kept after drops.
    applied_versions: BTreeMap<RuleKey, u64>,
    version: u64,
}

impl DatabaseMetaData {
    pub fn new(name: impl Into<String>, storage_units: Vec<StorageUnit>) -> Self {
        Self {
            name: name.into(),
            storage_units,
            rules: ShardingRuleMetaData::default(),
            applied_versions: BTreeMap::new(),
            version: 0,
        }
    }

    /// Build from bootstrap configuration. Bootstrap rules carry version 0,
    /// so any published event (version >= 1) supersedes them.
    pub fn from_config(config: &DatabaseConfig) -> Result<Self, MetaDataError> {
        let units = config.storage_units.iter().map(StorageUnit::from).collect();
        let mut db = Self::new(config.name.clone(), units);
        for table in &config.rules.broadcast_tables {
            db.rules.put_broadcast_table(table);
        }
        for rule in &config.rules.auto_tables {
            let resolved = db.resolve_auto_table(rule.clone())?;
            db.rules.put_auto_table(ShardingAutoTableRule::new(resolved));
        }
        Ok(db)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn storage_units(&self) -> &[StorageUnit] {
        &self.storage_units
    }

    pub fn storage_unit_names(&self) -> impl Iterator<Item = &str> {
        self.storage_units.iter().map(|u| u.name.as_str())
    }

    pub fn rules(&self) -> &ShardingRuleMetaData {
        &self.rules
    }

    /// Number of rule mutations applied since bootstrap.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn applied_version(&self, key: &RuleKey) -> Option<u64> {
        self.applied_versions.get(key).copied()
    }

    /// Create or replace an auto table rule.
    pub fn alter_auto_table(
        &mut self,
        config: ShardingAutoTableRuleConfiguration,
        version: u64,
    ) -> Result<RuleChange, MetaDataError> {
        let key = RuleKey::auto_table(&config.logic_table);
        self.check_version(&key, version)?;
        let resolved = self.resolve_auto_table(config)?;
        let previous = self.rules.put_auto_table(ShardingAutoTableRule::new(resolved));
        self.record(key, version);
        Ok(if previous.is_some() {
            RuleChange::Replaced
        } else {
            RuleChange::Created
        })
    }

    pub fn drop_auto_table(&mut self, logic_table: &str, version: u64) -> Result<RuleChange, MetaDataError> {
        let key = RuleKey::auto_table(logic_table);
        self.check_version(&key, version)?;
        let removed = self.rules.remove_auto_table(logic_table).is_some();
        self.record(key, version);
        Ok(if removed {
            RuleChange::Removed
        } else {
            RuleChange::Absent
        })
    }

    pub fn alter_broadcast_table(&mut self, table: &str, version: u64) -> Result<RuleChange, MetaDataError> {
        if table.is_empty() {
            return Err(MetaDataError::InvalidRule {
                rule: "broadcast_table".into(),
                reason: "table name must not be empty".into(),
            });
        }
        let key = RuleKey::broadcast_table(table);
        self.check_version(&key, version)?;
        let created = self.rules.put_broadcast_table(table);
        self.record(key, version);
        Ok(if created {
            RuleChange::Created
        } else {
            RuleChange::Replaced
        })
    }

    pub fn drop_broadcast_table(&mut self, table: &str, version: u64) -> Result<RuleChange, MetaDataError> {
        let key = RuleKey::broadcast_table(table);
        self.check_version(&key, version)?;
        let removed = self.rules.remove_broadcast_table(table);
        self.record(key, version);
        Ok(if removed {
            RuleChange::Removed
        } else {
            RuleChange::Absent
        })
    }

    fn check_version(&self, key: &RuleKey, version: u64) -> Result<(), MetaDataError> {
        match self.applied_versions.get(key) {
            Some(&applied) if version <= applied => Err(MetaDataError::StaleVersion {
                rule: key.to_string(),
                version,
                applied,
            }),
            _ => Ok(()),
        }
    }

    fn record(&mut self, key: RuleKey, version: u64) {
        self.applied_versions.insert(key, version);
        self.version += 1;
    }

    /// Validate a rule and rewrite its storage-unit references to the
    /// registered spelling.
    fn resolve_auto_table(
        &self,
        mut config: ShardingAutoTableRuleConfiguration,
    ) -> Result<ShardingAutoTableRuleConfiguration, MetaDataError> {
        config.validate().map_err(|reason| MetaDataError::InvalidRule {
            rule: config.logic_table.clone(),
            reason,
        })?;
        let known: Vec<&str> = self.storage_unit_names().collect();
        for unit in config.storage_units.iter_mut() {
            match find_ignore_case(&known, unit) {
                Some(registered) => *unit = registered.to_string(),
                None => {
                    return Err(MetaDataError::UnknownStorageUnit {
                        database: self.name.clone(),
                        storage_unit: unit.clone(),
                    })
                }
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sharding_db() -> DatabaseMetaData {
        DatabaseMetaData::new(
            "sharding_db",
            vec![
                StorageUnit { name: "ds_0".into(), url: String::new() },
                StorageUnit { name: "ds_1".into(), url: String::new() },
            ],
        )
    }

    fn order_config(units: &[&str]) -> ShardingAutoTableRuleConfiguration {
        ShardingAutoTableRuleConfiguration {
            logic_table: "t_order".into(),
            storage_units: units.iter().map(|u| u.to_string()).collect(),
            sharding_column: "order_id".into(),
            sharding_count: 2,
        }
    }

    #[test]
    fn test_alter_of_absent_creates_then_replaces() {
        let mut db = sharding_db();
        assert_eq!(db.alter_auto_table(order_config(&["ds_0"]), 1).unwrap(), RuleChange::Created);
        assert_eq!(db.alter_auto_table(order_config(&["ds_1"]), 2).unwrap(), RuleChange::Replaced);
        let rule = db.rules().auto_table("t_order").unwrap();
        assert_eq!(rule.config().storage_units, vec!["ds_1".to_string()]);
        assert_eq!(db.version(), 2);
    }

    #[test]
    fn test_drop_of_absent_is_noop() {
        let mut db = sharding_db();
        assert_eq!(db.drop_auto_table("t_order", 1).unwrap(), RuleChange::Absent);
        assert!(db.rules().is_empty());
        assert_eq!(db.applied_version(&RuleKey::auto_table("t_order")), Some(1));
    }

    #[test]
    fn test_stale_alter_cannot_resurrect_dropped_rule() {
        let mut db = sharding_db();
        db.alter_auto_table(order_config(&["ds_0"]), 1).unwrap();
        db.drop_auto_table("t_order", 3).unwrap();
        let err = db.alter_auto_table(order_config(&["ds_0"]), 2).unwrap_err();
        assert!(matches!(err, MetaDataError::StaleVersion { version: 2, applied: 3, .. }));
        assert!(db.rules().auto_table("t_order").is_none());
    }

    #[test]
    fn test_duplicate_version_is_rejected() {
        let mut db = sharding_db();
        db.alter_broadcast_table("t_dict", 5).unwrap();
        assert!(db.alter_broadcast_table("t_dict", 5).is_err());
    }

    #[test]
    fn test_storage_units_resolved_case_insensitively() {
        let mut db = sharding_db();
        db.alter_auto_table(order_config(&["DS_0", "Ds_1"]), 1).unwrap();
        let rule = db.rules().auto_table("t_order").unwrap();
        assert_eq!(rule.config().storage_units, vec!["ds_0".to_string(), "ds_1".to_string()]);
    }

    #[test]
    fn test_unknown_storage_unit_rejected() {
        let mut db = sharding_db();
        let err = db.alter_auto_table(order_config(&["ds_7"]), 1).unwrap_err();
        assert!(matches!(err, MetaDataError::UnknownStorageUnit { .. }));
        assert!(db.rules().is_empty());
        assert_eq!(db.version(), 0);
    }
}
