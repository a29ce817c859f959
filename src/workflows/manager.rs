use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::{
    extract_graph, import_name, EditorConfig, ImportedWorkflow, NewEditorConfig, NewWorkflow,
    Workflow, WorkflowDetail,
};
use crate::context::RequestContext;
use crate::db_operations::WorkflowStore;
use crate::document::{self, Document};
use crate::error::{RecordFoldError, RecordFoldResult};

fn require_name(name: &str, what: &str) -> RecordFoldResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RecordFoldError::Validation(format!("{} name must not be empty", what)));
    }
    Ok(name.to_string())
}

fn require_id(id: &str, what: &str) -> RecordFoldResult<()> {
    if id.trim().is_empty() {
        return Err(RecordFoldError::Validation(format!("{} id must not be empty", what)));
    }
    Ok(())
}

/// Creates, loads and imports workflows and editor configurations.
#[derive(Clone)]
pub struct WorkflowManager {
    store: Arc<dyn WorkflowStore>,
}

impl WorkflowManager {
    pub fn new(store: Arc<dyn WorkflowStore>) -> Self {
        Self { store }
    }

    /// Store a workflow along with the nodes and edges of its `workflowData`.
    pub fn create_workflow(&self, ctx: &RequestContext, new: NewWorkflow) -> RecordFoldResult<Workflow> {
        let name = require_name(&new.name, "workflow")?;
        document::check_depth(&new.workflow_data, "workflowData")?;

        let id = Uuid::new_v4().to_string();
        let (nodes, edges) = extract_graph(&id, &new.workflow_data)?;
        let now = Utc::now();
        let workflow = Workflow {
            id,
            name,
            description: new.description,
            workflow_data: new.workflow_data,
            created_at: now,
            updated_at: now,
        };
        let (node_count, edge_count) = (nodes.len(), edges.len());
        let workflow = self.store.insert_workflow(ctx, workflow, nodes, edges)?;
        log::info!(
            "[{}] Created workflow '{}' {} ({} nodes, {} edges)",
            ctx.label(),
            workflow.name,
            workflow.id,
            node_count,
            edge_count
        );
        Ok(workflow)
    }

    pub fn get_workflow(&self, ctx: &RequestContext, id: &str) -> RecordFoldResult<WorkflowDetail> {
        require_id(id, "workflow")?;
        let workflow = self
            .store
            .get_workflow(ctx, id)?
            .ok_or_else(|| RecordFoldError::EntryNotFound {
                collection: "workflow",
                id: id.to_string(),
            })?;
        Ok(WorkflowDetail {
            nodes: self.store.workflow_nodes(ctx, id)?,
            edges: self.store.workflow_edges(ctx, id)?,
            workflow,
        })
    }

    /// Newest first.
    pub fn list_workflows(&self, ctx: &RequestContext) -> RecordFoldResult<Vec<Workflow>> {
        self.store.list_workflows(ctx)
    }

    /// Store an exported workflow document as a new workflow, named after
    /// its `metadata.version`.
    pub fn import_workflow(&self, ctx: &RequestContext, data: Document) -> RecordFoldResult<ImportedWorkflow> {
        let new = NewWorkflow {
            name: import_name(&data),
            description: None,
            workflow_data: data,
        };
        let workflow = self.create_workflow(ctx, new)?;
        Ok(ImportedWorkflow {
            message: "Workflow imported successfully".to_string(),
            workflow,
        })
    }

    pub fn create_editor_config(
        &self,
        ctx: &RequestContext,
        new: NewEditorConfig,
    ) -> RecordFoldResult<EditorConfig> {
        let name = require_name(&new.name, "editor config")?;
        document::check_depth(&new.config, "config")?;

        let now = Utc::now();
        let config = EditorConfig {
            id: Uuid::new_v4().to_string(),
            name,
            config: new.config,
            created_at: now,
            updated_at: now,
        };
        let config = self.store.insert_editor_config(ctx, config)?;
        log::info!("[{}] Created editor config '{}' {}", ctx.label(), config.name, config.id);
        Ok(config)
    }

    pub fn get_editor_config(&self, ctx: &RequestContext, id: &str) -> RecordFoldResult<EditorConfig> {
        require_id(id, "editor config")?;
        self.store
            .get_editor_config(ctx, id)?
            .ok_or_else(|| RecordFoldError::EntryNotFound {
                collection: "editor config",
                id: id.to_string(),
            })
    }

    /// Newest first.
    pub fn list_editor_configs(&self, ctx: &RequestContext) -> RecordFoldResult<Vec<EditorConfig>> {
        self.store.list_editor_configs(ctx)
    }
}
