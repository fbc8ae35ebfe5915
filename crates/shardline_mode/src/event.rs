//! Cluster-wide rule-change events.

use std::fmt;

use serde::{Deserialize, Serialize};

use shardline_common::config::ShardingAutoTableRuleConfiguration;

/// Handler-table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RuleEventType {
    AlterAutoTable,
    DropAutoTable,
    AlterBroadcastTable,
    DropBroadcastTable,
}

impl RuleEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleEventType::AlterAutoTable => "alter_auto_table",
            RuleEventType::DropAutoTable => "drop_auto_table",
            RuleEventType::AlterBroadcastTable => "alter_broadcast_table",
            RuleEventType::DropBroadcastTable => "drop_broadcast_table",
        }
    }
}

impl fmt::Display for RuleEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// New or replacement definition of one rule entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlterRuleEvent<R> {
    pub database: String,
    /// Monotonic per rule entry; stale or repeated versions are skipped.
    pub version: u64,
    pub rule: R,
}

/// Removal of one rule entry, identified by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropRuleEvent {
    pub database: String,
    pub version: u64,
    pub rule_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleChangedEvent {
    AlterAutoTable(AlterRuleEvent<ShardingAutoTableRuleConfiguration>),
    DropAutoTable(DropRuleEvent),
    /// `rule` is the broadcast table name.
    AlterBroadcastTable(AlterRuleEvent<String>),
    DropBroadcastTable(DropRuleEvent),
}

impl RuleChangedEvent {
    pub fn alter_auto_table(
        database: impl Into<String>,
        version: u64,
        rule: ShardingAutoTableRuleConfiguration,
    ) -> Self {
        RuleChangedEvent::AlterAutoTable(AlterRuleEvent {
            database: database.into(),
            version,
            rule,
        })
    }

    pub fn drop_auto_table(database: impl Into<String>, version: u64, logic_table: impl Into<String>) -> Self {
        RuleChangedEvent::DropAutoTable(DropRuleEvent {
            database: database.into(),
            version,
            rule_name: logic_table.into(),
        })
    }

    pub fn alter_broadcast_table(database: impl Into<String>, version: u64, table: impl Into<String>) -> Self {
        RuleChangedEvent::AlterBroadcastTable(AlterRuleEvent {
            database: database.into(),
            version,
            rule: table.into(),
        })
    }

    pub fn drop_broadcast_table(database: impl Into<String>, version: u64, table: impl Into<String>) -> Self {
        RuleChangedEvent::DropBroadcastTable(DropRuleEvent {
            database: database.into(),
            version,
            rule_name: table.into(),
        })
    }

    pub fn event_type(&self) -> RuleEventType {
        match self {
            RuleChangedEvent::AlterAutoTable(_) => RuleEventType::AlterAutoTable,
            RuleChangedEvent::DropAutoTable(_) => RuleEventType::DropAutoTable,
            RuleChangedEvent::AlterBroadcastTable(_) => RuleEventType::AlterBroadcastTable,
            RuleChangedEvent::DropBroadcastTable(_) => RuleEventType::DropBroadcastTable,
        }
    }

    pub fn database(&self) -> &str {
        match self {
            RuleChangedEvent::AlterAutoTable(e) => &e.database,
            RuleChangedEvent::AlterBroadcastTable(e) => &e.database,
            RuleChangedEvent::DropAutoTable(e) | RuleChangedEvent::DropBroadcastTable(e) => &e.database,
        }
    }

    pub fn version(&self) -> u64 {
        match self {
            RuleChangedEvent::AlterAutoTable(e) => e.version,
            RuleChangedEvent::AlterBroadcastTable(e) => e.version,
            RuleChangedEvent::DropAutoTable(e) | RuleChangedEvent::DropBroadcastTable(e) => e.version,
        }
    }

    /// Name of the rule entry the event targets.
    pub fn rule_name(&self) -> &str {
        match self {
            RuleChangedEvent::AlterAutoTable(e) => &e.rule.logic_table,
            RuleChangedEvent::AlterBroadcastTable(e) => &e.rule,
            RuleChangedEvent::DropAutoTable(e) | RuleChangedEvent::DropBroadcastTable(e) => &e.rule_name,
        }
    }
}
