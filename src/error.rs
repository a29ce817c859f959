use crate::records::{EntityKind, RecordId};

/// Unified error type for the record store.
///
/// Every variant maps to a stable [`code`](RecordFoldError::code) and an
/// HTTP-style [`status`](RecordFoldError::status) so a transport layer can
/// translate failures consistently.
#[derive(Debug, thiserror::Error)]
pub enum RecordFoldError {
    /// Malformed input: empty or duplicate field names, missing sub-fields, bad paths.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The entity kind is not wired for the requested operation.
    #[error("Unsupported entity kind '{kind}' for {operation}")]
    UnsupportedEntityKind { kind: String, operation: String },

    /// The record id did not resolve inside the kind's table.
    #[error("Record '{id}' not found in {kind}")]
    RecordNotFound { kind: EntityKind, id: RecordId },

    /// A workflow or editor config id did not resolve.
    #[error("{collection} '{id}' not found")]
    EntryNotFound { collection: &'static str, id: String },

    /// No active schema definition exists for the table.
    #[error("No active schema for table '{table}'")]
    SchemaNotFound { table: String },

    /// Any failure reported by the document store, surfaced verbatim.
    #[error("Store persistence error: {0}")]
    StorePersistence(String),

    /// Configuration could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type RecordFoldResult<T> = Result<T, RecordFoldError>;

impl RecordFoldError {
    pub fn unsupported(kind: impl ToString, operation: &str) -> Self {
        Self::UnsupportedEntityKind {
            kind: kind.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn not_found(kind: EntityKind, id: &RecordId) -> Self {
        Self::RecordNotFound {
            kind,
            id: id.clone(),
        }
    }

    /// Stable machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::UnsupportedEntityKind { .. } => "UNSUPPORTED_ENTITY_KIND",
            Self::RecordNotFound { .. } => "RECORD_NOT_FOUND",
            Self::EntryNotFound { .. } => "NOT_FOUND",
            Self::SchemaNotFound { .. } => "SCHEMA_NOT_FOUND",
            Self::StorePersistence(_) => "STORE_PERSISTENCE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }

    /// HTTP-style status for this error kind.
    pub fn status(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::UnsupportedEntityKind { .. } => 400,
            Self::RecordNotFound { .. } | Self::EntryNotFound { .. } | Self::SchemaNotFound { .. } => 404,
            Self::StorePersistence(_) | Self::Config(_) => 500,
        }
    }
}

impl From<sled::Error> for RecordFoldError {
    fn from(error: sled::Error) -> Self {
        RecordFoldError::StorePersistence(error.to_string())
    }
}

impl From<serde_json::Error> for RecordFoldError {
    fn from(error: serde_json::Error) -> Self {
        RecordFoldError::StorePersistence(format!("serialization failed: {}", error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_distinct_code() {
        let errors = [
            RecordFoldError::Validation("x".into()),
            RecordFoldError::unsupported(EntityKind::Secret, "set_field"),
            RecordFoldError::not_found(EntityKind::Container, &RecordId::Int(3)),
            RecordFoldError::SchemaNotFound {
                table: "container".into(),
            },
            RecordFoldError::EntryNotFound {
                collection: "workflow",
                id: "w1".into(),
            },
            RecordFoldError::StorePersistence("disk".into()),
            RecordFoldError::Config("bad".into()),
        ];
        let mut codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn messages_name_the_failing_entity() {
        let err = RecordFoldError::not_found(EntityKind::Container, &RecordId::Int(42));
        let msg = err.to_string();
        assert!(msg.contains("42"));
        assert!(msg.contains("docker_container"));
        assert_eq!(err.status(), 404);

        let err = RecordFoldError::unsupported(EntityKind::Secret, "set_field");
        assert!(err.to_string().contains("secret"));
        assert_eq!(err.status(), 400);
    }
}
