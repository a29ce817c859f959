
use recordfold::workflows::DEFAULT_IMPORT_NAME;
use recordfold::{NewEditorConfig, NewWorkflow, RecordFold, RequestContext, StoreConfig};
use serde_json::{json, Value};
use std::thread;
use std::time::Duration;
use test_utils::{counting_fixture, doc, TestFixture};

fn pipeline(name: &str) -> NewWorkflow {
    NewWorkflow {
        name: name.to_string(),
        description: Some("build then deploy".to_string()),
        workflow_data: doc(json!({
            "nodes": [
                {"id": "build", "type": "task", "position": {"x": 0, "y": 0}, "data": {"cmd": "make"}},
                {"id": "test", "type": "task", "data": {"cmd": "make test"}},
                {"id": "deploy", "type": "task"}
            ],
            "edges": [
                {"id": "e1", "source": "build", "target": "test"},
                {"source": "test", "target": "deploy", "label": "on success"}
            ]
        })),
    }
}

#[test]
fn created_workflows_come_back_with_their_graph() {
    let fixture = TestFixture::new();
    let ctx = &fixture.ctx;
    let workflows = fixture.app.workflows();

    let created = workflows.create_workflow(ctx, pipeline("  release  ")).unwrap();
    assert_eq!(created.name, "release");
    assert_eq!(created.created_at, created.updated_at);

    let detail = workflows.get_workflow(ctx, &created.id).unwrap();
    assert_eq!(detail.workflow, created);
    let node_ids: Vec<_> = detail.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(node_ids, vec!["build", "test", "deploy"]);
    assert_eq!(detail.nodes[0].data, json!({"cmd": "make"}));
    assert_eq!(detail.nodes[2].data, Value::Null);

    assert_eq!(detail.edges.len(), 2);
    assert_eq!(detail.edges[0].id, "e1");
    assert_eq!(detail.edges[1].id, "test->deploy");
    assert_eq!(detail.edges[1].label.as_deref(), Some("on success"));
    assert!(detail.edges.iter().all(|e| e.workflow_id == created.id));
}

#[test]
fn graphs_of_different_workflows_stay_apart() {
    let fixture = TestFixture::new();
    let ctx = &fixture.ctx;
    let workflows = fixture.app.workflows();

    let first = workflows.create_workflow(ctx, pipeline("first")).unwrap();
    let empty = workflows
        .create_workflow(
            ctx,
            NewWorkflow {
                name: "empty".to_string(),
                description: None,
                workflow_data: doc(json!({"metadata": {"author": "ops"}})),
            },
        )
        .unwrap();

    let detail = workflows.get_workflow(ctx, &empty.id).unwrap();
    assert!(detail.nodes.is_empty());
    assert!(detail.edges.is_empty());
    assert_eq!(workflows.get_workflow(ctx, &first.id).unwrap().nodes.len(), 3);
}

#[test]
fn workflows_are_listed_newest_first() {
    let fixture = TestFixture::new();
    let ctx = &fixture.ctx;
    let workflows = fixture.app.workflows();

    let older = workflows.create_workflow(ctx, pipeline("older")).unwrap();
    thread::sleep(Duration::from_millis(5));
    let newer = workflows.create_workflow(ctx, pipeline("newer")).unwrap();

    let listed: Vec<_> = workflows
        .list_workflows(ctx)
        .unwrap()
        .into_iter()
        .map(|w| w.id)
        .collect();
    assert_eq!(listed, vec![newer.id, older.id]);
}

#[test]
fn imports_are_named_after_the_export_version() {
    let fixture = TestFixture::new();
    let ctx = &fixture.ctx;
    let workflows = fixture.app.workflows();

    let versioned = workflows
        .import_workflow(
            ctx,
            doc(json!({
                "metadata": {"version": "3.2"},
                "nodes": [{"id": "a"}, {"id": "b"}],
                "edges": [{"source": "a", "target": "b"}]
            })),
        )
        .unwrap();
    assert_eq!(versioned.message, "Workflow imported successfully");
    assert_eq!(versioned.workflow.name, "Workflow v3.2");
    assert_eq!(versioned.workflow.description, None);
    assert_eq!(workflows.get_workflow(ctx, &versioned.workflow.id).unwrap().edges.len(), 1);

    let unversioned = workflows
        .import_workflow(ctx, doc(json!({"metadata": {"version": 3}})))
        .unwrap();
    assert_eq!(unversioned.workflow.name, DEFAULT_IMPORT_NAME);
}

#[test]
fn malformed_graphs_store_nothing() {
    let (fixture, store, app) = counting_fixture();
    let ctx = &fixture.ctx;

    let err = app
        .workflows()
        .create_workflow(
            ctx,
            NewWorkflow {
                name: "broken".to_string(),
                description: None,
                workflow_data: doc(json!({
                    "nodes": [{"id": "a"}],
                    "edges": [{"source": "a", "target": "missing"}]
                })),
            },
        )
        .unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");

    let err = app
        .workflows()
        .create_workflow(
            ctx,
            NewWorkflow {
                name: "   ".to_string(),
                description: None,
                workflow_data: Default::default(),
            },
        )
        .unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");

    assert_eq!(store.calls(), 0);
    assert!(fixture.app.workflows().list_workflows(ctx).unwrap().is_empty());
}

#[test]
fn overly_deep_workflow_data_is_rejected() {
    let fixture = TestFixture::new();
    let mut data = json!("leaf");
    for _ in 0..recordfold::document::MAX_DOCUMENT_DEPTH + 1 {
        data = json!({ "inner": data });
    }

    let err = fixture
        .app
        .workflows()
        .create_workflow(
            &fixture.ctx,
            NewWorkflow {
                name: "deep".to_string(),
                description: None,
                workflow_data: doc(data),
            },
        )
        .unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
}

#[test]
fn editor_configs_round_trip_and_list_newest_first() {
    let fixture = TestFixture::new();
    let ctx = &fixture.ctx;
    let workflows = fixture.app.workflows();

    let light = workflows
        .create_editor_config(
            ctx,
            NewEditorConfig {
                name: "light".to_string(),
                config: doc(json!({"theme": "light", "grid": {"snap": true}})),
            },
        )
        .unwrap();
    thread::sleep(Duration::from_millis(5));
    let dark = workflows
        .create_editor_config(
            ctx,
            NewEditorConfig {
                name: "dark".to_string(),
                config: doc(json!({"theme": "dark"})),
            },
        )
        .unwrap();

    assert_eq!(workflows.get_editor_config(ctx, &light.id).unwrap(), light);
    let names: Vec<_> = workflows
        .list_editor_configs(ctx)
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec![dark.name, light.name]);
}

#[test]
fn unknown_ids_report_not_found() {
    let fixture = TestFixture::new();
    let ctx = &fixture.ctx;
    let workflows = fixture.app.workflows();

    let err = workflows.get_workflow(ctx, "5b0e7c1a-0000-4000-8000-000000000000").unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
    assert_eq!(err.status(), 404);

    let err = workflows.get_editor_config(ctx, "nope").unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");

    let err = workflows.get_workflow(ctx, " ").unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
}

#[test]
fn workflows_survive_reopening_the_store() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::new(temp_dir.path().join("db"));
    let ctx = RequestContext::background();

    let id = {
        let app = RecordFold::open(&config).unwrap();
        app.workflows().create_workflow(&ctx, pipeline("kept")).unwrap().id
    };

    let app = RecordFold::open(&config).unwrap();
    let detail = app.workflows().get_workflow(&ctx, &id).unwrap();
    assert_eq!(detail.workflow.name, "kept");
    assert_eq!(detail.nodes.len(), 3);
    assert_eq!(detail.edges.len(), 2);
}
