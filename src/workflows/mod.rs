//! Workflow definitions and editor configurations.
//!
//! A workflow keeps the graph document it was created from (`workflowData`).
//! The `nodes` and `edges` arrays of that document are also stored as rows
//! of their own so a workflow can be served together with its graph.

pub mod manager;

pub use manager::WorkflowManager;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::document::Document;
use crate::error::{RecordFoldError, RecordFoldResult};

/// Name given to imports whose metadata carries no version.
pub const DEFAULT_IMPORT_NAME: &str = "Imported Workflow";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub workflow_data: Document,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowNode {
    pub workflow_id: String,
    pub id: String,
    #[serde(rename = "type", default)]
    pub node_type: Option<String>,
    #[serde(default)]
    pub position: Option<Value>,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowEdge {
    pub workflow_id: String,
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub data: Value,
}

/// A workflow together with its stored graph rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowDetail {
    pub workflow: Workflow,
    pub nodes: Vec<WorkflowNode>,
    pub edges: Vec<WorkflowEdge>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkflow {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub workflow_data: Document,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub config: Document,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEditorConfig {
    pub name: String,
    #[serde(default)]
    pub config: Document,
}

/// Result of a bulk import.
#[derive(Debug, Clone, Serialize)]
pub struct ImportedWorkflow {
    pub message: String,
    pub workflow: Workflow,
}

/// `Workflow v<metadata.version>` when the export names its version.
pub fn import_name(data: &Document) -> String {
    data.get("metadata")
        .and_then(|m| m.get("version"))
        .and_then(Value::as_str)
        .map(|version| format!("Workflow v{}", version))
        .unwrap_or_else(|| DEFAULT_IMPORT_NAME.to_string())
}

fn graph_array<'a>(data: &'a Document, key: &str) -> RecordFoldResult<&'a [Value]> {
    match data.get(key) {
        None | Some(Value::Null) => Ok(&[][..]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(_) => Err(RecordFoldError::Validation(format!(
            "workflowData.{} must be an array",
            key
        ))),
    }
}

fn required_str<'a>(item: &'a Value, key: &str, what: &str) -> RecordFoldResult<&'a str> {
    item.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| RecordFoldError::Validation(format!("{} needs a string '{}'", what, key)))
}

/// Split `workflowData.nodes` / `workflowData.edges` into rows.
///
/// Nodes need a unique `id`. Edges need `source` and `target` naming known
/// nodes; an edge without an `id` gets `source->target`.
pub fn extract_graph(
    workflow_id: &str,
    data: &Document,
) -> RecordFoldResult<(Vec<WorkflowNode>, Vec<WorkflowEdge>)> {
    let mut node_ids = HashSet::new();
    let mut nodes = Vec::new();
    for (index, item) in graph_array(data, "nodes")?.iter().enumerate() {
        let what = format!("node #{}", index);
        let id = required_str(item, "id", &what)?;
        if !node_ids.insert(id.to_string()) {
            return Err(RecordFoldError::Validation(format!("node id '{}' is used twice", id)));
        }
        nodes.push(WorkflowNode {
            workflow_id: workflow_id.to_string(),
            id: id.to_string(),
            node_type: item.get("type").and_then(Value::as_str).map(str::to_string),
            position: item.get("position").cloned(),
            data: item.get("data").cloned().unwrap_or(Value::Null),
        });
    }

    let mut edges = Vec::new();
    for (index, item) in graph_array(data, "edges")?.iter().enumerate() {
        let what = format!("edge #{}", index);
        let source = required_str(item, "source", &what)?;
        let target = required_str(item, "target", &what)?;
        for end in [source, target] {
            if !node_ids.contains(end) {
                return Err(RecordFoldError::Validation(format!(
                    "{} references unknown node '{}'",
                    what, end
                )));
            }
        }
        edges.push(WorkflowEdge {
            workflow_id: workflow_id.to_string(),
            id: item
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("{}->{}", source, target)),
            source: source.to_string(),
            target: target.to_string(),
            label: item.get("label").and_then(Value::as_str).map(str::to_string),
            data: item.get("data").cloned().unwrap_or(Value::Null),
        });
    }
    Ok((nodes, edges))
}
