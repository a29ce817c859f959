//! Structured Document Store.
//!
//! The core talks to storage only through [`RecordStore`], [`SchemaStore`]
//! and [`WorkflowStore`]; [`DbOperations`] implements all of them on top of sled.

pub mod core;
mod record_operations;
mod schema_operations;
mod workflow_operations;

pub use core::DbOperations;

use serde_json::Value;

use crate::context::RequestContext;
use crate::document::Document;
use crate::error::RecordFoldResult;
use crate::records::{DocumentTarget, EntityKind, NewRecord, Record, RecordId};
use crate::schema::TableSchemaDefinition;
use crate::workflows::{EditorConfig, Workflow, WorkflowEdge, WorkflowNode};

/// Row-level access to the per-kind record tables.
///
/// Mutating methods return `Ok(None)` when the id does not resolve; each
/// mutation is one atomic write.
pub trait RecordStore: Send + Sync {
    fn insert_record(
        &self,
        ctx: &RequestContext,
        kind: EntityKind,
        new: NewRecord,
    ) -> RecordFoldResult<Record>;

    fn get_record(
        &self,
        ctx: &RequestContext,
        kind: EntityKind,
        id: &RecordId,
    ) -> RecordFoldResult<Option<Record>>;

    /// Every record of a kind, oldest first.
    fn list_records(&self, ctx: &RequestContext, kind: EntityKind) -> RecordFoldResult<Vec<Record>>;

    fn count_records(&self, ctx: &RequestContext, kind: EntityKind) -> RecordFoldResult<usize>;

    /// Overwrite attributes and both documents, resetting the schema version.
    fn replace_record(
        &self,
        ctx: &RequestContext,
        kind: EntityKind,
        id: &RecordId,
        new: NewRecord,
    ) -> RecordFoldResult<Option<Record>>;

    /// Deep-set `value` at `segments` inside one of the record's documents.
    fn set_document_path(
        &self,
        ctx: &RequestContext,
        kind: EntityKind,
        id: &RecordId,
        target: DocumentTarget,
        segments: &[String],
        value: &Value,
    ) -> RecordFoldResult<Option<Record>>;

    /// Drop a top-level key from one of the record's documents.
    fn remove_document_key(
        &self,
        ctx: &RequestContext,
        kind: EntityKind,
        id: &RecordId,
        target: DocumentTarget,
        key: &str,
    ) -> RecordFoldResult<Option<Record>>;

    /// Records whose documents contain every criteria entry.
    fn search_containment(
        &self,
        ctx: &RequestContext,
        kind: EntityKind,
        criteria: &Document,
    ) -> RecordFoldResult<Vec<Record>>;
}

/// Versioned table schema definitions.
pub trait SchemaStore: Send + Sync {
    /// All stored versions of a table, in storage order.
    fn load_table_schemas(
        &self,
        ctx: &RequestContext,
        table_name: &str,
    ) -> RecordFoldResult<Vec<TableSchemaDefinition>>;

    /// Deactivate every version of the definition's table and store the
    /// definition as the active one, in a single transaction.
    fn activate_schema_version(
        &self,
        ctx: &RequestContext,
        definition: TableSchemaDefinition,
    ) -> RecordFoldResult<TableSchemaDefinition>;
}

/// Workflows, their graph rows and editor configurations.
pub trait WorkflowStore: Send + Sync {
    /// Store a workflow and its graph rows in one transaction.
    fn insert_workflow(
        &self,
        ctx: &RequestContext,
        workflow: Workflow,
        nodes: Vec<WorkflowNode>,
        edges: Vec<WorkflowEdge>,
    ) -> RecordFoldResult<Workflow>;

    fn get_workflow(&self, ctx: &RequestContext, id: &str) -> RecordFoldResult<Option<Workflow>>;

    fn list_workflows(&self, ctx: &RequestContext) -> RecordFoldResult<Vec<Workflow>>;

    /// Graph rows of a workflow, in document order.
    fn workflow_nodes(&self, ctx: &RequestContext, workflow_id: &str) -> RecordFoldResult<Vec<WorkflowNode>>;

    fn workflow_edges(&self, ctx: &RequestContext, workflow_id: &str) -> RecordFoldResult<Vec<WorkflowEdge>>;

    fn insert_editor_config(&self, ctx: &RequestContext, config: EditorConfig) -> RecordFoldResult<EditorConfig>;

    fn get_editor_config(&self, ctx: &RequestContext, id: &str) -> RecordFoldResult<Option<EditorConfig>>;

    fn list_editor_configs(&self, ctx: &RequestContext) -> RecordFoldResult<Vec<EditorConfig>>;
}
