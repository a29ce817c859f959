use sled::transaction::{ConflictableTransactionError, TransactionError};

use super::core::DbOperations;
use super::SchemaStore;
use crate::context::RequestContext;
use crate::error::{RecordFoldError, RecordFoldResult};
use crate::schema::TableSchemaDefinition;

// All versions of a table share one key, so deactivate-then-insert is a
// single-key transaction.
impl SchemaStore for DbOperations {
    fn load_table_schemas(
        &self,
        ctx: &RequestContext,
        table_name: &str,
    ) -> RecordFoldResult<Vec<TableSchemaDefinition>> {
        self.check_context(ctx, "load schemas")?;
        Ok(self
            .get_from_tree(&self.schemas_tree, table_name.as_bytes())?
            .unwrap_or_default())
    }

    fn activate_schema_version(
        &self,
        ctx: &RequestContext,
        definition: TableSchemaDefinition,
    ) -> RecordFoldResult<TableSchemaDefinition> {
        self.check_context(ctx, "activate schema")?;
        let key = definition.table_name.as_bytes().to_vec();

        let result: Result<TableSchemaDefinition, TransactionError<RecordFoldError>> =
            self.schemas_tree.transaction(|tx| {
                let mut versions: Vec<TableSchemaDefinition> = match tx.get(key.as_slice())? {
                    Some(bytes) => serde_json::from_slice(&bytes)
                        .map_err(|e| ConflictableTransactionError::Abort(RecordFoldError::from(e)))?,
                    None => Vec::new(),
                };
                versions.retain(|v| v.version != definition.version);
                for v in versions.iter_mut() {
                    v.is_active = false;
                }
                let mut active = definition.clone();
                active.is_active = true;
                versions.push(active.clone());

                let bytes = serde_json::to_vec(&versions)
                    .map_err(|e| ConflictableTransactionError::Abort(RecordFoldError::from(e)))?;
                tx.insert(key.as_slice(), bytes)?;
                Ok(active)
            });

        let active = result.map_err(|e| match e {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => e.into(),
        })?;
        self.flush_tree(&self.schemas_tree)?;
        Ok(active)
    }
}
