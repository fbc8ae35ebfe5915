use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::names::contains_ignore_case;

/// Top-level configuration (shardline.toml).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShardlineConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub event_bus: EventBusConfig,
    #[serde(default)]
    pub merge: MergeConfig,
    /// Databases registered at bootstrap.
    #[serde(default)]
    pub databases: Vec<DatabaseConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default tracing filter; `RUST_LOG` takes precedence when set.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,shardline=debug".to_string(),
        }
    }
}

/// Rule-change event delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventBusConfig {
    /// Bounded capacity of the channel between publishers and the dispatcher thread.
    pub channel_capacity: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
        }
    }
}

/// Gather-phase resource limits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Maximum number of groups buffered by the group-by merger (0 = unlimited).
    pub max_groups: usize,
}

/// One logical database and its storage units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub name: String,
    #[serde(default)]
    pub storage_units: Vec<StorageUnitConfig>,
    #[serde(default)]
    pub rules: ShardingRuleConfiguration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageUnitConfig {
    pub name: String,
    /// Connection URL, opaque to routing.
    #[serde(default)]
    pub url: String,
}

/// Sharding rules of one logical database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardingRuleConfiguration {
    /// Tables replicated on every storage unit.
    #[serde(default)]
    pub broadcast_tables: BTreeSet<String>,
    /// Hash-mod sharded tables.
    #[serde(default)]
    pub auto_tables: Vec<ShardingAutoTableRuleConfiguration>,
}

/// An auto table: `sharding_count` physical tables `<logic_table>_<i>`,
/// spread round-robin over `storage_units`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardingAutoTableRuleConfiguration {
    pub logic_table: String,
    pub storage_units: Vec<String>,
    pub sharding_column: String,
    pub sharding_count: u32,
}

impl ShardingAutoTableRuleConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.logic_table.is_empty() {
            return Err("logic_table must not be empty".into());
        }
        if self.sharding_column.is_empty() {
            return Err(format!("{}: sharding_column must not be empty", self.logic_table));
        }
        if self.storage_units.is_empty() {
            return Err(format!("{}: storage_units must not be empty", self.logic_table));
        }
        if self.sharding_count == 0 {
            return Err(format!("{}: sharding_count must be >= 1", self.logic_table));
        }
        Ok(())
    }
}

impl ShardlineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: ShardlineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!(
            path = %path.display(),
            databases = config.databases.len(),
            "loaded configuration"
        );
        Ok(config)
    }

    /// Check cross-field invariants not expressible in the serde schema.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_bus.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "event_bus.channel_capacity must be >= 1".into(),
            ));
        }
        let mut seen: Vec<String> = Vec::with_capacity(self.databases.len());
        for db in &self.databases {
            if db.name.is_empty() {
                return Err(ConfigError::Invalid("database name must not be empty".into()));
            }
            if contains_ignore_case(&seen, &db.name) {
                return Err(ConfigError::Invalid(format!(
                    "database '{}' declared twice",
                    db.name
                )));
            }
            seen.push(db.name.clone());

            let units: Vec<String> = db.storage_units.iter().map(|u| u.name.clone()).collect();
            for rule in &db.rules.auto_tables {
                rule.validate().map_err(ConfigError::Invalid)?;
                for unit in &rule.storage_units {
                    if !contains_ignore_case(&units, unit) {
                        return Err(ConfigError::Invalid(format!(
                            "{}.{}: unknown storage unit '{}'",
                            db.name, rule.logic_table, unit
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}
