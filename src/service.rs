//! `RecordFold` ties the schema registry, the field mutator, the search
//! dispatcher, the workflow manager and plain record CRUD to one document store.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::StoreConfig;
use crate::context::RequestContext;
use crate::db_operations::{DbOperations, RecordStore, SchemaStore, WorkflowStore};
use crate::document::{self, Document};
use crate::error::{RecordFoldError, RecordFoldResult};
use crate::fields::{FieldMutator, FieldPath, FieldSearchDispatcher};
use crate::records::{Capability, EntityKind, KindRegistry, NewRecord, Record, RecordId};
use crate::schema::{FieldDefinition, SchemaRegistry, TableSchemaDefinition};
use crate::workflows::WorkflowManager;

/// Per-kind record counts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSummary {
    pub generated_at: DateTime<Utc>,
    pub counts: BTreeMap<EntityKind, usize>,
    pub total: usize,
}

#[derive(Clone)]
pub struct RecordFold {
    records: Arc<dyn RecordStore>,
    kinds: Arc<KindRegistry>,
    schemas: SchemaRegistry,
    mutator: FieldMutator,
    search: FieldSearchDispatcher,
    workflows: WorkflowManager,
}

impl RecordFold {
    /// Open the sled store described by `config` with the built-in kinds.
    pub fn open(config: &StoreConfig) -> RecordFoldResult<Self> {
        let store = Arc::new(DbOperations::open(config)?);
        Ok(Self::from_store(store, KindRegistry::with_defaults()))
    }

    pub fn from_store<S>(store: Arc<S>, kinds: KindRegistry) -> Self
    where
        S: RecordStore + SchemaStore + WorkflowStore + 'static,
    {
        let records: Arc<dyn RecordStore> = store.clone();
        let schema_store: Arc<dyn SchemaStore> = store.clone();
        let workflow_store: Arc<dyn WorkflowStore> = store;
        let kinds = Arc::new(kinds);
        Self {
            schemas: SchemaRegistry::new(schema_store),
            workflows: WorkflowManager::new(workflow_store),
            mutator: FieldMutator::new(Arc::clone(&records), Arc::clone(&kinds)),
            search: FieldSearchDispatcher::new(Arc::clone(&records), Arc::clone(&kinds)),
            records,
            kinds,
        }
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    pub fn mutator(&self) -> &FieldMutator {
        &self.mutator
    }

    pub fn search(&self) -> &FieldSearchDispatcher {
        &self.search
    }

    pub fn workflows(&self) -> &WorkflowManager {
        &self.workflows
    }

    // ========== SCHEMA REGISTRY ==========

    pub fn get_active_schema(
        &self,
        ctx: &RequestContext,
        table_name: &str,
    ) -> RecordFoldResult<TableSchemaDefinition> {
        self.schemas.get_active_schema(ctx, table_name)
    }

    pub fn create_schema_version(
        &self,
        ctx: &RequestContext,
        table_name: &str,
        version: i32,
        fields: Vec<FieldDefinition>,
    ) -> RecordFoldResult<TableSchemaDefinition> {
        self.schemas.create_schema_version(ctx, table_name, version, fields)
    }

    pub fn list_schema_versions(
        &self,
        ctx: &RequestContext,
        table_name: &str,
    ) -> RecordFoldResult<Vec<TableSchemaDefinition>> {
        self.schemas.list_schema_versions(ctx, table_name)
    }

    // ========== FIELD MUTATION & SEARCH ==========

    pub fn set_field(
        &self,
        ctx: &RequestContext,
        kind: EntityKind,
        id: &RecordId,
        path: &FieldPath,
        value: Value,
        is_custom: bool,
    ) -> RecordFoldResult<Record> {
        self.mutator.set_field(ctx, kind, id, path, value, is_custom)
    }

    pub fn remove_field(
        &self,
        ctx: &RequestContext,
        kind: EntityKind,
        id: &RecordId,
        field_name: &str,
    ) -> RecordFoldResult<Record> {
        self.mutator.remove_field(ctx, kind, id, field_name)
    }

    pub fn search_by_field(
        &self,
        ctx: &RequestContext,
        kind: EntityKind,
        criteria: &Document,
    ) -> RecordFoldResult<Vec<Record>> {
        self.search.search_by_field(ctx, kind, criteria)
    }

    // ========== RECORDS ==========

    pub fn create_record(
        &self,
        ctx: &RequestContext,
        kind: EntityKind,
        new: NewRecord,
    ) -> RecordFoldResult<Record> {
        new.validate(kind)?;
        let record = self.records.insert_record(ctx, kind, new)?;
        log::info!("[{}] Created {} {}", ctx.label(), kind, record.id);
        Ok(record)
    }

    pub fn get_record(
        &self,
        ctx: &RequestContext,
        kind: EntityKind,
        id: &RecordId,
    ) -> RecordFoldResult<Record> {
        self.records
            .get_record(ctx, kind, id)?
            .ok_or_else(|| RecordFoldError::not_found(kind, id))
    }

    /// Records of `kind`, oldest first, keeping those whose attributes
    /// contain every `filter` entry (e.g. `{"technology": "redis"}`).
    pub fn list_records(
        &self,
        ctx: &RequestContext,
        kind: EntityKind,
        filter: &Document,
    ) -> RecordFoldResult<Vec<Record>> {
        let records = self.records.list_records(ctx, kind)?;
        if filter.is_empty() {
            return Ok(records);
        }
        let filter = Value::Object(filter.clone());
        Ok(records
            .into_iter()
            .filter(|r| document::contains(&Value::Object(r.attributes.clone()), &filter))
            .collect())
    }

    /// Full update of a record's attributes and documents.
    pub fn replace_record(
        &self,
        ctx: &RequestContext,
        kind: EntityKind,
        id: &RecordId,
        new: NewRecord,
    ) -> RecordFoldResult<Record> {
        self.kinds.require(kind, Capability::Replaceable)?;
        new.validate(kind)?;
        let record = self
            .records
            .replace_record(ctx, kind, id, new)?
            .ok_or_else(|| RecordFoldError::not_found(kind, id))?;
        log::info!("[{}] Replaced {} {}", ctx.label(), kind, id);
        Ok(record)
    }

    pub fn summary(&self, ctx: &RequestContext) -> RecordFoldResult<RecordSummary> {
        let mut counts = BTreeMap::new();
        for kind in EntityKind::ALL {
            counts.insert(kind, self.records.count_records(ctx, kind)?);
        }
        Ok(RecordSummary {
            generated_at: Utc::now(),
            total: counts.values().sum(),
            counts,
        })
    }
}
