//! Schema Registry: owns the versioned definitions of every logical table and
//! keeps exactly one of them active per table.

use chrono::Utc;
use std::sync::Arc;

use super::types::{FieldDefinition, TableSchemaDefinition};
use super::validation::{validate_fields, validate_table_name};
use crate::context::RequestContext;
use crate::db_operations::SchemaStore;
use crate::error::{RecordFoldError, RecordFoldResult};

#[derive(Clone)]
pub struct SchemaRegistry {
    store: Arc<dyn SchemaStore>,
}

impl SchemaRegistry {
    pub fn new(store: Arc<dyn SchemaStore>) -> Self {
        Self { store }
    }

    /// The single active definition for `table_name`.
    pub fn get_active_schema(
        &self,
        ctx: &RequestContext,
        table_name: &str,
    ) -> RecordFoldResult<TableSchemaDefinition> {
        validate_table_name(table_name)?;
        log::debug!("[{}] Loading active schema for '{}'", ctx.label(), table_name);
        self.store
            .load_table_schemas(ctx, table_name)?
            .into_iter()
            .find(|s| s.is_active)
            .ok_or_else(|| RecordFoldError::SchemaNotFound {
                table: table_name.to_string(),
            })
    }

    /// Store `fields` as version `version` of `table_name` and make it the
    /// only active version.
    ///
    /// Version numbers are taken as given: gaps and non-monotonic numbers are
    /// accepted, and reusing a number replaces the stored definition.
    pub fn create_schema_version(
        &self,
        ctx: &RequestContext,
        table_name: &str,
        version: i32,
        fields: Vec<FieldDefinition>,
    ) -> RecordFoldResult<TableSchemaDefinition> {
        self.create_described_version(ctx, table_name, version, fields, None)
    }

    pub fn create_described_version(
        &self,
        ctx: &RequestContext,
        table_name: &str,
        version: i32,
        fields: Vec<FieldDefinition>,
        description: Option<String>,
    ) -> RecordFoldResult<TableSchemaDefinition> {
        validate_table_name(table_name)?;
        validate_fields(table_name, &fields)?;

        let definition = TableSchemaDefinition {
            table_name: table_name.to_string(),
            version,
            fields,
            is_active: true,
            description,
            created_at: Utc::now(),
        };
        let active = self.store.activate_schema_version(ctx, definition)?;
        log::info!(
            "[{}] Activated schema '{}' version {} ({} fields)",
            ctx.label(),
            active.table_name,
            active.version,
            active.fields.len()
        );
        Ok(active)
    }

    /// Every version of `table_name`, highest version first.
    pub fn list_schema_versions(
        &self,
        ctx: &RequestContext,
        table_name: &str,
    ) -> RecordFoldResult<Vec<TableSchemaDefinition>> {
        validate_table_name(table_name)?;
        let mut versions = self.store.load_table_schemas(ctx, table_name)?;
        versions.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(versions)
    }
}
