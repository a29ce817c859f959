
use recordfold::{DbOperations, FieldDefinition, RecordFold, KindRegistry, StoreConfig};
use serde_json::json;
use std::sync::Arc;
use test_utils::{counting_fixture, TestFixture};

fn fields(names: &[&str]) -> Vec<FieldDefinition> {
    names.iter().map(|n| FieldDefinition::new(*n, "string")).collect()
}

fn active_versions(fixture: &TestFixture, table: &str) -> Vec<i32> {
    fixture
        .app
        .list_schema_versions(&fixture.ctx, table)
        .unwrap()
        .into_iter()
        .filter(|s| s.is_active)
        .map(|s| s.version)
        .collect()
}

#[test]
fn exactly_one_version_is_active_after_each_create() {
    let fixture = TestFixture::new();
    let ctx = &fixture.ctx;

    for version in [1, 3, 2] {
        fixture
            .app
            .create_schema_version(ctx, "docker_container", version, fields(&["image"]))
            .unwrap();
        assert_eq!(active_versions(&fixture, "docker_container"), vec![version]);
        assert_eq!(
            fixture.app.get_active_schema(ctx, "docker_container").unwrap().version,
            version
        );
    }
}

#[test]
fn get_active_schema_is_stable_between_writes() {
    let fixture = TestFixture::new();
    let ctx = &fixture.ctx;
    fixture
        .app
        .create_schema_version(ctx, "git_repo", 4, fields(&["branch", "remote"]))
        .unwrap();

    let first = fixture.app.get_active_schema(ctx, "git_repo").unwrap();
    let second = fixture.app.get_active_schema(ctx, "git_repo").unwrap();
    assert_eq!(first, second);
    assert_eq!(first.fields.len(), 2);
    assert!(first.field("branch").is_some());
}

#[test]
fn versions_are_listed_newest_first() {
    let fixture = TestFixture::new();
    let ctx = &fixture.ctx;
    for version in [2, 1, 3] {
        fixture
            .app
            .create_schema_version(ctx, "cache_data", version, fields(&["ttl"]))
            .unwrap();
    }

    let versions: Vec<i32> = fixture
        .app
        .list_schema_versions(ctx, "cache_data")
        .unwrap()
        .iter()
        .map(|s| s.version)
        .collect();
    assert_eq!(versions, vec![3, 2, 1]);
}

#[test]
fn tables_do_not_share_active_versions() {
    let fixture = TestFixture::new();
    let ctx = &fixture.ctx;
    fixture.app.create_schema_version(ctx, "secret", 1, fields(&["vault"])).unwrap();
    fixture.app.create_schema_version(ctx, "log_entry", 5, fields(&["source"])).unwrap();

    assert_eq!(fixture.app.get_active_schema(ctx, "secret").unwrap().version, 1);
    assert_eq!(fixture.app.get_active_schema(ctx, "log_entry").unwrap().version, 5);
}

#[test]
fn missing_table_reports_schema_not_found() {
    let fixture = TestFixture::new();
    let err = fixture.app.get_active_schema(&fixture.ctx, "plist_data").unwrap_err();
    assert_eq!(err.code(), "SCHEMA_NOT_FOUND");
    assert_eq!(err.status(), 404);
    assert!(fixture
        .app
        .list_schema_versions(&fixture.ctx, "plist_data")
        .unwrap()
        .is_empty());
}

#[test]
fn invalid_definitions_never_reach_the_store() {
    let (fixture, store, app) = counting_fixture();
    let ctx = &fixture.ctx;

    let cases = vec![
        Vec::new(),
        vec![FieldDefinition::new("", "string")],
        vec![FieldDefinition::new("port", "")],
        vec![FieldDefinition::new("port", "integer"), FieldDefinition::new(" port ", "string")],
    ];
    for bad in cases {
        let err = app.create_schema_version(ctx, "docker_container", 1, bad).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
    let err = app.create_schema_version(ctx, "", 1, fields(&["a"])).unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");

    assert_eq!(store.calls(), 0);
}

#[test]
fn failed_create_keeps_previous_active_version() {
    let fixture = TestFixture::new();
    let ctx = &fixture.ctx;
    fixture
        .app
        .create_schema_version(ctx, "registry_data", 1, fields(&["hive"]))
        .unwrap();

    assert!(fixture
        .app
        .create_schema_version(ctx, "registry_data", 2, Vec::new())
        .is_err());
    assert_eq!(fixture.app.get_active_schema(ctx, "registry_data").unwrap().version, 1);
}

#[test]
fn reusing_a_version_number_replaces_the_stored_definition() {
    let fixture = TestFixture::new();
    let ctx = &fixture.ctx;
    fixture.app.create_schema_version(ctx, "git_repo", 1, fields(&["old"])).unwrap();
    fixture.app.create_schema_version(ctx, "git_repo", 2, fields(&["mid"])).unwrap();
    fixture.app.create_schema_version(ctx, "git_repo", 1, fields(&["new"])).unwrap();

    let versions = fixture.app.list_schema_versions(ctx, "git_repo").unwrap();
    assert_eq!(versions.len(), 2);
    let active = fixture.app.get_active_schema(ctx, "git_repo").unwrap();
    assert_eq!(active.version, 1);
    assert!(active.field("new").is_some());
    assert!(active.field("old").is_none());
}

#[test]
fn field_attributes_and_description_are_kept() {
    let fixture = TestFixture::new();
    let ctx = &fixture.ctx;
    let defs = vec![
        FieldDefinition::new("port", "integer")
            .required()
            .with_default(json!(8080))
            .with_description("exposed port"),
        FieldDefinition::new("labels", "object"),
    ];
    fixture
        .app
        .schemas()
        .create_described_version(ctx, "docker_container", 2, defs, Some("ports".into()))
        .unwrap();

    let active = fixture.app.get_active_schema(ctx, "docker_container").unwrap();
    assert_eq!(active.description.as_deref(), Some("ports"));
    let port = active.field("port").unwrap();
    assert!(port.required);
    assert_eq!(port.default_value, Some(json!(8080)));
    assert_eq!(port.description.as_deref(), Some("exposed port"));
    assert!(!active.field("labels").unwrap().required);
}

#[test]
fn schemas_survive_reopening_the_store() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::new(temp_dir.path().join("db"));
    let ctx = recordfold::RequestContext::background();

    {
        let app = RecordFold::open(&config).unwrap();
        app.create_schema_version(&ctx, "log_entry", 1, fields(&["source"])).unwrap();
        app.create_schema_version(&ctx, "log_entry", 2, fields(&["source", "host"])).unwrap();
    }

    let store = Arc::new(DbOperations::open(&config).unwrap());
    let app = RecordFold::from_store(store, KindRegistry::with_defaults());
    let active = app.get_active_schema(&ctx, "log_entry").unwrap();
    assert_eq!(active.version, 2);
    assert_eq!(app.list_schema_versions(&ctx, "log_entry").unwrap().len(), 2);
}
