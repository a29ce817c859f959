use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;

use crate::config::StoreConfig;
use crate::context::RequestContext;
use crate::error::{RecordFoldError, RecordFoldResult};
use crate::records::EntityKind;

/// sled-backed document store: one tree per entity kind plus the schema,
/// sequence and workflow trees.
#[derive(Clone)]
pub struct DbOperations {
    /// The underlying sled database instance
    db: sled::Db,
    /// Cached per-kind record trees
    pub(crate) record_trees: HashMap<EntityKind, sled::Tree>,
    pub(crate) schemas_tree: sled::Tree,
    /// Next sequential id per table, keyed by table name
    pub(crate) sequences_tree: sled::Tree,
    pub(crate) workflows_tree: sled::Tree,
    /// Graph rows keyed by workflow id, `/` and the row's position
    pub(crate) workflow_nodes_tree: sled::Tree,
    pub(crate) workflow_edges_tree: sled::Tree,
    pub(crate) editor_configs_tree: sled::Tree,
    flush_on_write: bool,
}

impl DbOperations {
    /// Opens every tree the store needs on an already opened database.
    pub fn new(db: sled::Db) -> Result<Self, sled::Error> {
        let mut record_trees = HashMap::new();
        for kind in EntityKind::ALL {
            record_trees.insert(kind, db.open_tree(kind.table_name())?);
        }
        let schemas_tree = db.open_tree("table_schemas")?;
        let sequences_tree = db.open_tree("record_sequences")?;
        let workflows_tree = db.open_tree("workflows")?;
        let workflow_nodes_tree = db.open_tree("workflow_nodes")?;
        let workflow_edges_tree = db.open_tree("workflow_edges")?;
        let editor_configs_tree = db.open_tree("editor_configs")?;

        Ok(Self {
            db,
            record_trees,
            schemas_tree,
            sequences_tree,
            workflows_tree,
            workflow_nodes_tree,
            workflow_edges_tree,
            editor_configs_tree,
            flush_on_write: true,
        })
    }

    /// Opens (or creates) the database described by `config`.
    pub fn open(config: &StoreConfig) -> RecordFoldResult<Self> {
        config.validate()?;
        let db = sled::Config::new()
            .path(&config.storage_path)
            .temporary(config.temporary)
            .open()?;
        log::info!(
            "Opened record store at {} (temporary: {})",
            config.storage_path.display(),
            config.temporary
        );
        let mut ops = Self::new(db)?;
        ops.flush_on_write = config.flush_on_write;
        Ok(ops)
    }

    /// Gets a reference to the underlying database
    pub fn db(&self) -> &sled::Db {
        &self.db
    }

    pub(crate) fn tree(&self, kind: EntityKind) -> RecordFoldResult<&sled::Tree> {
        self.record_trees
            .get(&kind)
            .ok_or_else(|| RecordFoldError::StorePersistence(format!("no tree opened for {}", kind)))
    }

    /// Fails once the caller's deadline has passed.
    pub(crate) fn check_context(&self, ctx: &RequestContext, operation: &str) -> RecordFoldResult<()> {
        if ctx.is_expired() {
            return Err(RecordFoldError::StorePersistence(format!(
                "deadline exceeded before {} (request {})",
                operation,
                ctx.label()
            )));
        }
        Ok(())
    }

    pub(crate) fn flush_tree(&self, tree: &sled::Tree) -> RecordFoldResult<()> {
        if self.flush_on_write {
            tree.flush()?;
        }
        Ok(())
    }

    // ========== GENERIC TREE OPERATIONS ==========

    /// Store any serializable item in a specific tree
    pub fn store_in_tree<T: Serialize>(
        &self,
        tree: &sled::Tree,
        key: &[u8],
        item: &T,
    ) -> RecordFoldResult<()> {
        let bytes = serde_json::to_vec(item)?;
        tree.insert(key, bytes)?;
        self.flush_tree(tree)
    }

    /// Retrieve any deserializable item from a specific tree
    pub fn get_from_tree<T: DeserializeOwned>(
        &self,
        tree: &sled::Tree,
        key: &[u8],
    ) -> RecordFoldResult<Option<T>> {
        match tree.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Deserialize every value in a tree, in key order
    pub fn list_items_in_tree<T: DeserializeOwned>(&self, tree: &sled::Tree) -> RecordFoldResult<Vec<T>> {
        let mut items = Vec::new();
        for result in tree.iter() {
            let (key, value) = result?;
            let item = serde_json::from_slice(&value).map_err(|e| {
                RecordFoldError::StorePersistence(format!(
                    "deserialization failed for key '{}': {}",
                    String::from_utf8_lossy(&key),
                    e
                ))
            })?;
            items.push(item);
        }
        Ok(items)
    }
}
