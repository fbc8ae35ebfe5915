//! Route context types and the query context handed to route executors.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use shardline_common::datum::Datum;

/// Logical name → actual name mapping, for a storage unit or a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouteMapper {
    pub logic_name: String,
    pub actual_name: String,
}

impl RouteMapper {
    pub fn new(logic_name: impl Into<String>, actual_name: impl Into<String>) -> Self {
        Self {
            logic_name: logic_name.into(),
            actual_name: actual_name.into(),
        }
    }

    /// Mapper whose actual name equals its logical name.
    pub fn identity(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            logic_name: name.clone(),
            actual_name: name,
        }
    }
}

/// One shard target: a storage unit plus the table renames needed there.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteUnit {
    pub data_source_mapper: RouteMapper,
    /// Empty when no table is renamed on this unit.
    pub table_mappers: BTreeSet<RouteMapper>,
}

impl RouteUnit {
    pub fn new(data_source_mapper: RouteMapper, table_mappers: BTreeSet<RouteMapper>) -> Self {
        Self {
            data_source_mapper,
            table_mappers,
        }
    }

    /// Actual table name for `logic_table` on this unit, if it is renamed.
    pub fn actual_table(&self, logic_table: &str) -> Option<&str> {
        self.table_mappers
            .iter()
            .find(|m| m.logic_name.eq_ignore_ascii_case(logic_table))
            .map(|m| m.actual_name.as_str())
    }
}

impl fmt::Display for RouteUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.data_source_mapper.actual_name)?;
        if !self.table_mappers.is_empty() {
            let tables: Vec<&str> = self.table_mappers.iter().map(|m| m.actual_name.as_str()).collect();
            write!(f, "[{}]", tables.join(","))?;
        }
        Ok(())
    }
}

/// Outcome of one routing decision.
///
/// Units are unique by (storage unit, table mappers) and kept in insertion
/// order, so iteration order is stable for one decision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteContext {
    route_units: Vec<RouteUnit>,
}

impl RouteContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit; returns false if an equal unit is already present.
    pub fn put_route_unit(&mut self, unit: RouteUnit) -> bool {
        if self.route_units.contains(&unit) {
            return false;
        }
        self.route_units.push(unit);
        true
    }

    pub fn route_units(&self) -> &[RouteUnit] {
        &self.route_units
    }

    pub fn len(&self) -> usize {
        self.route_units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.route_units.is_empty()
    }

    /// Distinct actual storage-unit names, in route order.
    pub fn actual_storage_units(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::with_capacity(self.route_units.len());
        for unit in &self.route_units {
            let name = unit.data_source_mapper.actual_name.as_str();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

impl IntoIterator for RouteContext {
    type Item = RouteUnit;
    type IntoIter = std::vec::IntoIter<RouteUnit>;

    fn into_iter(self) -> Self::IntoIter {
        self.route_units.into_iter()
    }
}

/// Equality/IN values extracted for one sharding column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardingCondition {
    pub table: String,
    pub column: String,
    pub values: Vec<Datum>,
}

/// Sharding conditions computed by the SQL front end. Opaque to the
/// broadcast executor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShardingConditions {
    conditions: Vec<ShardingCondition>,
}

impl ShardingConditions {
    pub fn new(conditions: Vec<ShardingCondition>) -> Self {
        Self { conditions }
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// All values bound to `table.column`, across conditions.
    pub fn values_for(&self, table: &str, column: &str) -> Vec<&Datum> {
        self.conditions
            .iter()
            .filter(|c| c.table.eq_ignore_ascii_case(table) && c.column.eq_ignore_ascii_case(column))
            .flat_map(|c| c.values.iter())
            .collect()
    }
}

/// Session state visible to routing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionContext {
    database: Option<String>,
}

impl ConnectionContext {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: Some(database.into()),
        }
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }
}

/// Everything a route executor may look at for one query.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    sql: String,
    tables: Vec<String>,
    sharding_conditions: ShardingConditions,
    connection_context: ConnectionContext,
}

impl QueryContext {
    pub fn new(sql: impl Into<String>, connection_context: ConnectionContext) -> Self {
        Self {
            sql: sql.into(),
            tables: Vec::new(),
            sharding_conditions: ShardingConditions::default(),
            connection_context,
        }
    }

    pub fn with_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tables = tables.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sharding_conditions(mut self, conditions: ShardingConditions) -> Self {
        self.sharding_conditions = conditions;
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn sharding_conditions(&self) -> &ShardingConditions {
        &self.sharding_conditions
    }

    pub fn connection_context(&self) -> &ConnectionContext {
        &self.connection_context
    }
}
