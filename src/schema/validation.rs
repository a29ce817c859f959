use std::collections::HashSet;

use super::types::FieldDefinition;
use crate::error::{RecordFoldError, RecordFoldResult};

pub fn validate_table_name(table_name: &str) -> RecordFoldResult<()> {
    if table_name.trim().is_empty() {
        return Err(RecordFoldError::Validation("table name is required".into()));
    }
    Ok(())
}

/// Fields must be non-empty, every entry needs a name and a type, and names are unique.
pub fn validate_fields(table_name: &str, fields: &[FieldDefinition]) -> RecordFoldResult<()> {
    if fields.is_empty() {
        return Err(RecordFoldError::Validation(format!(
            "schema for '{}' must define at least one field",
            table_name
        )));
    }

    let mut seen = HashSet::new();
    for (index, field) in fields.iter().enumerate() {
        let name = field.name.trim();
        if name.is_empty() {
            return Err(RecordFoldError::Validation(format!(
                "field #{} of '{}' is missing a name",
                index, table_name
            )));
        }
        if field.field_type.trim().is_empty() {
            return Err(RecordFoldError::Validation(format!(
                "field '{}' of '{}' is missing a type",
                name, table_name
            )));
        }
        if !seen.insert(name) {
            return Err(RecordFoldError::Validation(format!(
                "field '{}' is defined more than once in '{}'",
                name, table_name
            )));
        }
    }
    Ok(())
}
