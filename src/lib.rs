//! recordfold: a record store for heterogeneous, evolving entities.
//!
//! Every record keeps kind-intrinsic attributes, a `coreData` document, a
//! `customFields` document and the schema version it was written against.
//! On top of that sit three pieces:
//!
//! - [`SchemaRegistry`]: versioned field definitions per table, exactly one active
//! - [`FieldMutator`]: path-addressed set and core field removal on single records
//! - [`FieldSearchDispatcher`]: document containment search across all entity kinds
//!
//! [`WorkflowManager`] keeps workflow graphs and editor configurations next to the records.
//!
//! [`RecordFold`] wires them to a sled-backed [`DbOperations`] store.

pub mod config;
pub mod context;
pub mod db_operations;
pub mod document;
pub mod error;
pub mod fields;
pub mod logging;
pub mod records;
pub mod schema;
pub mod service;
pub mod workflows;

pub use config::{load_store_config, StoreConfig};
pub use context::RequestContext;
pub use db_operations::{DbOperations, RecordStore, SchemaStore, WorkflowStore};
pub use document::Document;
pub use error::{RecordFoldError, RecordFoldResult};
pub use fields::{FieldMutator, FieldPath, FieldSearchDispatcher};
pub use records::{EntityKind, KindRegistry, NewRecord, Record, RecordId};
pub use schema::{FieldDefinition, SchemaRegistry, TableSchemaDefinition};
pub use service::{RecordFold, RecordSummary};
pub use workflows::{
    EditorConfig, ImportedWorkflow, NewEditorConfig, NewWorkflow, Workflow, WorkflowDetail,
    WorkflowManager,
};
