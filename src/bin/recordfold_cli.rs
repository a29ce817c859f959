use clap::{Parser, Subcommand};
use log::info;
use recordfold::{
    load_store_config, Document, EntityKind, FieldPath, NewEditorConfig, NewRecord, NewWorkflow, RecordFold,
    RecordFoldError, RecordId, RequestContext, TableSchemaDefinition,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the store configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Abort store round trips after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the active schema of a table
    SchemaGet {
        #[arg(long, short, required = true)]
        table: String,
    },
    /// Create a schema version from a JSON file ({tableName, version, fields, description?})
    SchemaCreate {
        #[arg(required = true)]
        path: PathBuf,
    },
    /// List every schema version of a table, newest first
    SchemaVersions {
        #[arg(long, short, required = true)]
        table: String,
    },
    /// Create a record from a JSON file
    CreateRecord {
        #[arg(long, short, required = true)]
        kind: String,
        #[arg(required = true)]
        path: PathBuf,
    },
    /// Show one record
    GetRecord {
        #[arg(long, short, required = true)]
        kind: String,
        #[arg(long, required = true)]
        id: String,
    },
    /// List records of a kind, optionally filtered by attributes (JSON object)
    ListRecords {
        #[arg(long, short, required = true)]
        kind: String,
        #[arg(long)]
        filter: Option<String>,
    },
    /// Set a field at a path (dotted or JSON array) to a JSON value
    SetField {
        #[arg(long, short, required = true)]
        kind: String,
        #[arg(long, required = true)]
        id: String,
        #[arg(long, short, required = true)]
        path: String,
        #[arg(long, short, required = true)]
        value: String,
        /// Write into customFields instead of coreData
        #[arg(long)]
        custom: bool,
    },
    /// Remove a top-level core field
    RemoveField {
        #[arg(long, short, required = true)]
        kind: String,
        #[arg(long, required = true)]
        id: String,
        #[arg(long, short, required = true)]
        field: String,
    },
    /// Search records by field values (JSON object)
    Search {
        #[arg(long, short, required = true)]
        kind: String,
        #[arg(long, required = true)]
        criteria: String,
    },
    /// Record counts per kind
    Summary {},
    /// Create a workflow from a JSON file ({name, description?, workflowData})
    WorkflowCreate {
        #[arg(required = true)]
        path: PathBuf,
    },
    /// Show a workflow with its nodes and edges
    WorkflowGet {
        #[arg(long, required = true)]
        id: String,
    },
    /// List workflows, newest first
    WorkflowList {},
    /// Import an exported workflow document
    WorkflowImport {
        #[arg(required = true)]
        path: PathBuf,
    },
    /// Create an editor configuration from a JSON file ({name, config})
    EditorConfigCreate {
        #[arg(required = true)]
        path: PathBuf,
    },
    /// Show one editor configuration
    EditorConfigGet {
        #[arg(long, required = true)]
        id: String,
    },
    /// List editor configurations, newest first
    EditorConfigList {},
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchemaFile {
    table_name: String,
    version: i32,
    fields: Vec<recordfold::FieldDefinition>,
    #[serde(default)]
    description: Option<String>,
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_object(raw: &str, what: &str) -> Result<Document, Box<dyn std::error::Error>> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        _ => Err(format!("{} must be a JSON object", what).into()),
    }
}

fn parse_path(raw: &str) -> Result<FieldPath, Box<dyn std::error::Error>> {
    if raw.trim_start().starts_with('[') {
        Ok(serde_json::from_str(raw)?)
    } else {
        Ok(FieldPath::parse(raw)?)
    }
}

fn handle_schema_create(
    app: &RecordFold,
    ctx: &RequestContext,
    path: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let file: SchemaFile = serde_json::from_str(&fs::read_to_string(&path)?)?;
    let schema: TableSchemaDefinition = app.schemas().create_described_version(
        ctx,
        &file.table_name,
        file.version,
        file.fields,
        file.description,
    )?;
    print_json(&schema)
}

fn handle_create_record(
    app: &RecordFold,
    ctx: &RequestContext,
    kind: EntityKind,
    path: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let body: Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
    let new = NewRecord::from_json(kind, body)?;
    print_json(&app.create_record(ctx, kind, new)?)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, Box<dyn std::error::Error>> {
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_store_config(cli.config.as_deref())?;
    recordfold::logging::init(config.log_level_filter()?, config.recent_log_capacity)
        .map_err(|e| RecordFoldError::Config(format!("logger already installed: {}", e)))?;
    info!("Opening record store at {}", config.storage_path.display());
    let app = RecordFold::open(&config)?;

    let mut ctx = RequestContext::background().with_request_id("cli");
    if let Some(ms) = cli.timeout_ms {
        ctx = ctx.with_timeout(Duration::from_millis(ms));
    }

    match cli.command {
        Commands::SchemaGet { table } => print_json(&app.get_active_schema(&ctx, &table)?)?,
        Commands::SchemaCreate { path } => handle_schema_create(&app, &ctx, path)?,
        Commands::SchemaVersions { table } => print_json(&app.list_schema_versions(&ctx, &table)?)?,
        Commands::CreateRecord { kind, path } => handle_create_record(&app, &ctx, kind.parse()?, path)?,
        Commands::GetRecord { kind, id } => {
            let kind: EntityKind = kind.parse()?;
            let id = RecordId::parse_for(kind, &id)?;
            print_json(&app.get_record(&ctx, kind, &id)?)?
        }
        Commands::ListRecords { kind, filter } => {
            let filter = match filter {
                Some(raw) => parse_object(&raw, "filter")?,
                None => Document::new(),
            };
            print_json(&app.list_records(&ctx, kind.parse()?, &filter)?)?
        }
        Commands::SetField {
            kind,
            id,
            path,
            value,
            custom,
        } => {
            let kind: EntityKind = kind.parse()?;
            let id = RecordId::parse_for(kind, &id)?;
            let path = parse_path(&path)?;
            let value: Value = serde_json::from_str(&value)?;
            print_json(&app.set_field(&ctx, kind, &id, &path, value, custom)?)?
        }
        Commands::RemoveField { kind, id, field } => {
            let kind: EntityKind = kind.parse()?;
            let id = RecordId::parse_for(kind, &id)?;
            print_json(&app.remove_field(&ctx, kind, &id, &field)?)?
        }
        Commands::Search { kind, criteria } => {
            let criteria = parse_object(&criteria, "criteria")?;
            print_json(&app.search().search_by_kind_name(&ctx, &kind, &criteria)?)?
        }
        Commands::Summary {} => print_json(&app.summary(&ctx)?)?,
        Commands::WorkflowCreate { path } => {
            let new: NewWorkflow = read_json(&path)?;
            print_json(&app.workflows().create_workflow(&ctx, new)?)?
        }
        Commands::WorkflowGet { id } => print_json(&app.workflows().get_workflow(&ctx, &id)?)?,
        Commands::WorkflowList {} => print_json(&app.workflows().list_workflows(&ctx)?)?,
        Commands::WorkflowImport { path } => {
            let raw: Value = read_json(&path)?;
            let data = match raw {
                Value::Object(map) => map,
                _ => return Err("workflow export must be a JSON object".into()),
            };
            print_json(&app.workflows().import_workflow(&ctx, data)?)?
        }
        Commands::EditorConfigCreate { path } => {
            let new: NewEditorConfig = read_json(&path)?;
            print_json(&app.workflows().create_editor_config(&ctx, new)?)?
        }
        Commands::EditorConfigGet { id } => print_json(&app.workflows().get_editor_config(&ctx, &id)?)?,
        Commands::EditorConfigList {} => print_json(&app.workflows().list_editor_configs(&ctx)?)?,
    }

    Ok(())
}
