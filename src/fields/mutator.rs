//! Field Mutator: path-addressed writes into a record's `coreData` or
//! `customFields`, and core field removal.
//!
//! Writes are not checked against the table's active schema.

use serde_json::Value;
use std::sync::Arc;

use super::FieldPath;
use crate::context::RequestContext;
use crate::db_operations::RecordStore;
use crate::error::{RecordFoldError, RecordFoldResult};
use crate::records::{Capability, DocumentTarget, EntityKind, KindRegistry, Record, RecordId};

#[derive(Clone)]
pub struct FieldMutator {
    store: Arc<dyn RecordStore>,
    kinds: Arc<KindRegistry>,
}

impl FieldMutator {
    pub fn new(store: Arc<dyn RecordStore>, kinds: Arc<KindRegistry>) -> Self {
        Self { store, kinds }
    }

    /// Deep-set `value` at `path` in the record's custom fields (`is_custom`)
    /// or core data.
    pub fn set_field(
        &self,
        ctx: &RequestContext,
        kind: EntityKind,
        id: &RecordId,
        path: &FieldPath,
        value: Value,
        is_custom: bool,
    ) -> RecordFoldResult<Record> {
        let target = DocumentTarget::from_custom_flag(is_custom);
        let capability = if is_custom {
            Capability::MutableCustom
        } else {
            Capability::MutableCore
        };
        self.kinds.require(kind, capability)?;
        if path.is_empty() {
            return Err(RecordFoldError::Validation("field path must not be empty".into()));
        }

        let record = self
            .store
            .set_document_path(ctx, kind, id, target, path.segments(), &value)?
            .ok_or_else(|| RecordFoldError::not_found(kind, id))?;
        log::info!(
            "[{}] Set {}.{} on {} {}",
            ctx.label(),
            target,
            path,
            kind,
            id
        );
        Ok(record)
    }

    /// Remove the top-level key `field_name` from the record's core data.
    /// Removing an absent key succeeds and leaves the record unchanged.
    pub fn remove_field(
        &self,
        ctx: &RequestContext,
        kind: EntityKind,
        id: &RecordId,
        field_name: &str,
    ) -> RecordFoldResult<Record> {
        self.kinds.require(kind, Capability::RemovableCore)?;
        if field_name.is_empty() {
            return Err(RecordFoldError::Validation("field name must not be empty".into()));
        }

        let record = self
            .store
            .remove_document_key(ctx, kind, id, DocumentTarget::CoreData, field_name)?
            .ok_or_else(|| RecordFoldError::not_found(kind, id))?;
        log::info!("[{}] Removed coreData.{} from {} {}", ctx.label(), field_name, kind, id);
        Ok(record)
    }
}
