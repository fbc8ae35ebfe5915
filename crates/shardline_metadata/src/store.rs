//! Process-wide rule metadata store.
//!
//! Readers take an `Arc` snapshot of the whole cluster metadata and keep it
//! for the duration of one routing decision. Writers build a complete new
//! snapshot off to the side and publish it with a single pointer swap, so a
//! reader observes either the state before a change or the state after it,
//! never a mix.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use shardline_common::config::DatabaseConfig;
use shardline_common::error::{MetaDataError, ShardlineError, ShardlineResult};

use crate::database::DatabaseMetaData;

/// Immutable view of every database at one store version.
#[derive(Debug, Clone, Default)]
pub struct ClusterMetaData {
    databases: BTreeMap<String, Arc<DatabaseMetaData>>,
    version: u64,
}

impl ClusterMetaData {
    pub fn database(&self, name: &str) -> Option<&Arc<DatabaseMetaData>> {
        self.databases.get(&name.to_ascii_lowercase())
    }

    pub fn databases(&self) -> impl Iterator<Item = &Arc<DatabaseMetaData>> {
        self.databases.values()
    }

    pub fn version(&self) -> u64 {
        self.version
    }
}

/// The rule metadata store. Shared by reference (`Arc<MetaDataStore>`);
/// never a global.
pub struct MetaDataStore {
    current: RwLock<Arc<ClusterMetaData>>,
    /// Serializes writers so concurrent read-modify-write cycles never lose
    /// each other's updates. Readers never take it.
    write_lock: Mutex<()>,
    closed: AtomicBool,
}

impl Default for MetaDataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MetaDataStore {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(ClusterMetaData::default())),
            write_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
        }
    }

    /// Bootstrap from configured databases.
    pub fn from_config(databases: &[DatabaseConfig]) -> ShardlineResult<Self> {
        let store = Self::new();
        for config in databases {
            store.add_database(DatabaseMetaData::from_config(config)?)?;
        }
        Ok(store)
    }

    /// Current snapshot. Cheap: one `Arc` clone under a read lock held for
    /// the duration of the clone only.
    pub fn snapshot(&self) -> Arc<ClusterMetaData> {
        self.current.read().clone()
    }

    pub fn database(&self, name: &str) -> Option<Arc<DatabaseMetaData>> {
        self.snapshot().database(name).cloned()
    }

    pub fn version(&self) -> u64 {
        self.current.read().version
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn add_database(&self, database: DatabaseMetaData) -> ShardlineResult<()> {
        let key = database.name().to_ascii_lowercase();
        self.publish(|cluster| {
            if cluster.databases.contains_key(&key) {
                return Err(MetaDataError::DatabaseAlreadyExists(database.name().to_string()).into());
            }
            tracing::info!(
                database = %database.name(),
                storage_units = database.storage_units().len(),
                "database registered"
            );
            cluster.databases.insert(key.clone(), Arc::new(database.clone()));
            Ok(true)
        })
        .map(|_| ())
    }

    pub fn drop_database(&self, name: &str) -> ShardlineResult<bool> {
        let key = name.to_ascii_lowercase();
        self.publish(|cluster| Ok(cluster.databases.remove(&key).is_some()))
    }

    /// Apply `mutate` to a private copy of one database and publish the result.
    ///
    /// `mutate` returns `Ok(value)` to publish or `Err` to abandon the change;
    /// on error the published snapshot is untouched.
    pub fn alter_database<T, F>(&self, name: &str, mutate: F) -> ShardlineResult<T>
    where
        F: FnOnce(&mut DatabaseMetaData) -> Result<T, MetaDataError>,
    {
        let key = name.to_ascii_lowercase();
        let mut outcome = None;
        self.publish(|cluster| {
            let current = cluster
                .databases
                .get(&key)
                .ok_or_else(|| MetaDataError::DatabaseNotFound(name.to_string()))?;
            let mut next = DatabaseMetaData::clone(current);
            outcome = Some(mutate(&mut next)?);
            cluster.databases.insert(key.clone(), Arc::new(next));
            Ok(true)
        })?;
        outcome.ok_or_else(|| ShardlineError::internal_bug("E-META-001", "alter produced no outcome"))
    }

    /// Detach: publish an empty snapshot and reject further writes.
    /// Snapshots already handed out stay valid.
    pub fn close(&self) {
        let _guard = self.write_lock.lock();
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let version = self.current.read().version + 1;
        *self.current.write() = Arc::new(ClusterMetaData {
            databases: BTreeMap::new(),
            version,
        });
        tracing::info!(version, "metadata store closed");
    }

    /// Copy-on-write publish. `f` returns whether it changed anything.
    fn publish<F>(&self, f: F) -> ShardlineResult<bool>
    where
        F: FnOnce(&mut ClusterMetaData) -> ShardlineResult<bool>,
    {
        let _guard = self.write_lock.lock();
        if self.is_closed() {
            return Err(ShardlineError::Transient("metadata store is closed".into()));
        }
        let mut next = ClusterMetaData::clone(&self.current.read());
        let changed = f(&mut next)?;
        if changed {
            next.version += 1;
            *self.current.write() = Arc::new(next);
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::StorageUnit;
    use shardline_common::config::ShardingAutoTableRuleConfiguration;

    fn store_with_db() -> MetaDataStore {
        let store = MetaDataStore::new();
        store
            .add_database(DatabaseMetaData::new(
                "sharding_db",
                vec![StorageUnit { name: "ds_0".into(), url: String::new() }],
            ))
            .unwrap();
        store
    }

    fn rule() -> ShardingAutoTableRuleConfiguration {
        ShardingAutoTableRuleConfiguration {
            logic_table: "t_order".into(),
            storage_units: vec!["ds_0".into()],
            sharding_column: "order_id".into(),
            sharding_count: 2,
        }
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_writes() {
        let store = store_with_db();
        let before = store.snapshot();
        store
            .alter_database("sharding_db", |db| db.alter_auto_table(rule(), 1))
            .unwrap();
        let after = store.snapshot();

        assert!(before.database("sharding_db").unwrap().rules().is_empty());
        assert!(after.database("SHARDING_DB").unwrap().rules().auto_table("t_order").is_some());
        assert_eq!(after.version(), before.version() + 1);
    }

    #[test]
    fn test_failed_mutation_publishes_nothing() {
        let store = store_with_db();
        let version = store.version();
        let mut bad = rule();
        bad.storage_units = vec!["ds_9".into()];
        let err = store
            .alter_database("sharding_db", |db| db.alter_auto_table(bad, 1))
            .unwrap_err();
        assert!(matches!(err, ShardlineError::MetaData(MetaDataError::UnknownStorageUnit { .. })));
        assert_eq!(store.version(), version);
    }

    #[test]
    fn test_unknown_database() {
        let store = store_with_db();
        let err = store
            .alter_database("nope", |db| db.drop_auto_table("t_order", 1))
            .unwrap_err();
        assert!(matches!(err, ShardlineError::MetaData(MetaDataError::DatabaseNotFound(_))));
    }

    #[test]
    fn test_duplicate_database_rejected() {
        let store = store_with_db();
        let err = store
            .add_database(DatabaseMetaData::new("Sharding_DB", vec![]))
            .unwrap_err();
        assert!(matches!(err, ShardlineError::MetaData(MetaDataError::DatabaseAlreadyExists(_))));
    }

    #[test]
    fn test_close_rejects_writes_but_keeps_old_snapshots() {
        let store = store_with_db();
        let held = store.snapshot();
        store.close();
        assert!(store.is_closed());
        assert!(store.snapshot().database("sharding_db").is_none());
        assert!(held.database("sharding_db").is_some());
        let err = store
            .alter_database("sharding_db", |db| db.drop_auto_table("t_order", 1))
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn test_from_config() {
        let config: shardline_common::ShardlineConfig = toml::from_str(
            r#"
[[databases]]
name = "sharding_db"
storage_units = [{ name = "ds_0" }, { name = "ds_1" }]
[databases.rules]
broadcast_tables = ["t_dict"]
"#,
        )
        .unwrap();
        let store = MetaDataStore::from_config(&config.databases).unwrap();
        let db = store.database("sharding_db").unwrap();
        assert_eq!(db.storage_unit_names().collect::<Vec<_>>(), vec!["ds_0", "ds_1"]);
        assert!(db.rules().is_broadcast_table("T_DICT"));
    }
}
