//! Versioned table schema definitions.

pub mod registry;
pub mod types;
pub mod validation;

pub use registry::SchemaRegistry;
pub use types::{FieldDefinition, TableSchemaDefinition};
pub use validation::validate_fields;
