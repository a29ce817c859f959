use serde::de::DeserializeOwned;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::Transactional;

use super::core::DbOperations;
use super::WorkflowStore;
use crate::context::RequestContext;
use crate::error::{RecordFoldError, RecordFoldResult};
use crate::workflows::{EditorConfig, Workflow, WorkflowEdge, WorkflowNode};

/// Graph row key: workflow id, `/`, then the row's position so a prefix scan
/// returns rows in document order.
fn graph_key(workflow_id: &str, position: usize) -> Vec<u8> {
    let mut key = graph_prefix(workflow_id);
    key.extend_from_slice(&(position as u64).to_be_bytes());
    key
}

fn graph_prefix(workflow_id: &str) -> Vec<u8> {
    let mut key = workflow_id.as_bytes().to_vec();
    key.push(b'/');
    key
}

impl DbOperations {
    fn scan_graph_rows<T: DeserializeOwned>(&self, tree: &sled::Tree, workflow_id: &str) -> RecordFoldResult<Vec<T>> {
        let mut rows = Vec::new();
        for entry in tree.scan_prefix(graph_prefix(workflow_id)) {
            let (_, bytes) = entry?;
            rows.push(serde_json::from_slice(&bytes)?);
        }
        Ok(rows)
    }
}

impl WorkflowStore for DbOperations {
    fn insert_workflow(
        &self,
        ctx: &RequestContext,
        workflow: Workflow,
        nodes: Vec<WorkflowNode>,
        edges: Vec<WorkflowEdge>,
    ) -> RecordFoldResult<Workflow> {
        self.check_context(ctx, "insert workflow")?;
        let workflow_bytes = serde_json::to_vec(&workflow)?;
        let node_rows = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| Ok((graph_key(&workflow.id, i), serde_json::to_vec(n)?)))
            .collect::<RecordFoldResult<Vec<_>>>()?;
        let edge_rows = edges
            .iter()
            .enumerate()
            .map(|(i, e)| Ok((graph_key(&workflow.id, i), serde_json::to_vec(e)?)))
            .collect::<RecordFoldResult<Vec<_>>>()?;

        let trees = (
            &self.workflows_tree,
            &self.workflow_nodes_tree,
            &self.workflow_edges_tree,
        );
        let result: Result<(), TransactionError<RecordFoldError>> =
            trees.transaction(|(workflows, node_tree, edge_tree)| {
                if workflows.get(workflow.id.as_bytes())?.is_some() {
                    return Err(ConflictableTransactionError::Abort(RecordFoldError::Validation(
                        format!("workflow '{}' already exists", workflow.id),
                    )));
                }
                workflows.insert(workflow.id.as_bytes(), workflow_bytes.as_slice())?;
                for (key, bytes) in &node_rows {
                    node_tree.insert(key.as_slice(), bytes.as_slice())?;
                }
                for (key, bytes) in &edge_rows {
                    edge_tree.insert(key.as_slice(), bytes.as_slice())?;
                }
                Ok(())
            });
        result.map_err(|e| match e {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => e.into(),
        })?;

        self.flush_tree(&self.workflows_tree)?;
        self.flush_tree(&self.workflow_nodes_tree)?;
        self.flush_tree(&self.workflow_edges_tree)?;
        Ok(workflow)
    }

    fn get_workflow(&self, ctx: &RequestContext, id: &str) -> RecordFoldResult<Option<Workflow>> {
        self.check_context(ctx, "get workflow")?;
        self.get_from_tree(&self.workflows_tree, id.as_bytes())
    }

    fn list_workflows(&self, ctx: &RequestContext) -> RecordFoldResult<Vec<Workflow>> {
        self.check_context(ctx, "list workflows")?;
        let mut workflows: Vec<Workflow> = self.list_items_in_tree(&self.workflows_tree)?;
        workflows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(workflows)
    }

    fn workflow_nodes(&self, ctx: &RequestContext, workflow_id: &str) -> RecordFoldResult<Vec<WorkflowNode>> {
        self.check_context(ctx, "load workflow nodes")?;
        self.scan_graph_rows(&self.workflow_nodes_tree, workflow_id)
    }

    fn workflow_edges(&self, ctx: &RequestContext, workflow_id: &str) -> RecordFoldResult<Vec<WorkflowEdge>> {
        self.check_context(ctx, "load workflow edges")?;
        self.scan_graph_rows(&self.workflow_edges_tree, workflow_id)
    }

    fn insert_editor_config(&self, ctx: &RequestContext, config: EditorConfig) -> RecordFoldResult<EditorConfig> {
        self.check_context(ctx, "insert editor config")?;
        self.store_in_tree(&self.editor_configs_tree, config.id.as_bytes(), &config)?;
        Ok(config)
    }

    fn get_editor_config(&self, ctx: &RequestContext, id: &str) -> RecordFoldResult<Option<EditorConfig>> {
        self.check_context(ctx, "get editor config")?;
        self.get_from_tree(&self.editor_configs_tree, id.as_bytes())
    }

    fn list_editor_configs(&self, ctx: &RequestContext) -> RecordFoldResult<Vec<EditorConfig>> {
        self.check_context(ctx, "list editor configs")?;
        let mut configs: Vec<EditorConfig> = self.list_items_in_tree(&self.editor_configs_tree)?;
        configs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(configs)
    }
}
