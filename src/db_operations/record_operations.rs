use chrono::Utc;
use serde_json::Value;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::Transactional;
use uuid::Uuid;

use super::core::DbOperations;
use super::RecordStore;
use crate::context::RequestContext;
use crate::document::{self, Document};
use crate::error::{RecordFoldError, RecordFoldResult};
use crate::records::{
    DocumentTarget, EntityKind, IdStrategy, NewRecord, Record, RecordId, INITIAL_SCHEMA_VERSION,
};

impl DbOperations {
    /// Insert under the next number of the kind's own sequence. The counter
    /// bump and the row write share one transaction, so ids are gap-free
    /// per table and never collide.
    fn insert_sequential(&self, kind: EntityKind, new: NewRecord) -> RecordFoldResult<Record> {
        let tree = self.tree(kind)?;
        let counter_key = kind.table_name().as_bytes();

        let result: Result<Record, TransactionError<RecordFoldError>> =
            (tree, &self.sequences_tree).transaction(|(records, sequences)| {
                let last = match sequences.get(counter_key)? {
                    Some(bytes) => decode_counter(&bytes).map_err(ConflictableTransactionError::Abort)?,
                    None => 0,
                };
                let next = last + 1;
                let record = Record::from_new(kind, RecordId::Int(next as i64), new.clone());
                let bytes = serde_json::to_vec(&record)
                    .map_err(|e| ConflictableTransactionError::Abort(RecordFoldError::from(e)))?;
                records.insert(record.id.storage_key(), bytes)?;
                sequences.insert(counter_key, &next.to_be_bytes()[..])?;
                Ok(record)
            });

        let record = result.map_err(|e| match e {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => e.into(),
        })?;
        self.flush_tree(tree)?;
        self.flush_tree(&self.sequences_tree)?;
        Ok(record)
    }

    /// Read-modify-write of one record inside a single sled transaction.
    fn update_record<F>(
        &self,
        ctx: &RequestContext,
        kind: EntityKind,
        id: &RecordId,
        operation: &str,
        apply: F,
    ) -> RecordFoldResult<Option<Record>>
    where
        F: Fn(&mut Record) -> RecordFoldResult<()>,
    {
        self.check_context(ctx, operation)?;
        let tree = self.tree(kind)?;
        let key = id.storage_key();

        let result: Result<Option<Record>, TransactionError<RecordFoldError>> =
            tree.transaction(|tx| {
                let bytes = match tx.get(key.as_slice())? {
                    Some(bytes) => bytes,
                    None => return Ok(None),
                };
                let mut record: Record = serde_json::from_slice(&bytes)
                    .map_err(|e| ConflictableTransactionError::Abort(RecordFoldError::from(e)))?;
                apply(&mut record).map_err(ConflictableTransactionError::Abort)?;
                record.updated_at = Utc::now();
                let bytes = serde_json::to_vec(&record)
                    .map_err(|e| ConflictableTransactionError::Abort(RecordFoldError::from(e)))?;
                tx.insert(key.as_slice(), bytes)?;
                Ok(Some(record))
            });

        let record = result.map_err(|e| match e {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => e.into(),
        })?;
        if record.is_some() {
            self.flush_tree(tree)?;
        }
        Ok(record)
    }
}

fn decode_counter(bytes: &[u8]) -> RecordFoldResult<u64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| RecordFoldError::StorePersistence("corrupt record sequence".into()))?;
    Ok(u64::from_be_bytes(raw))
}

fn sort_by_creation(records: &mut [Record]) {
    records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}

impl RecordStore for DbOperations {
    fn insert_record(
        &self,
        ctx: &RequestContext,
        kind: EntityKind,
        new: NewRecord,
    ) -> RecordFoldResult<Record> {
        self.check_context(ctx, "insert")?;
        match kind.id_strategy() {
            IdStrategy::Sequential => self.insert_sequential(kind, new),
            IdStrategy::Uuid => {
                let record = Record::from_new(kind, RecordId::Text(Uuid::new_v4().to_string()), new);
                let tree = self.tree(kind)?;
                self.store_in_tree(tree, &record.id.storage_key(), &record)?;
                Ok(record)
            }
        }
    }

    fn get_record(
        &self,
        ctx: &RequestContext,
        kind: EntityKind,
        id: &RecordId,
    ) -> RecordFoldResult<Option<Record>> {
        self.check_context(ctx, "get")?;
        self.get_from_tree(self.tree(kind)?, &id.storage_key())
    }

    fn list_records(&self, ctx: &RequestContext, kind: EntityKind) -> RecordFoldResult<Vec<Record>> {
        self.check_context(ctx, "list")?;
        let mut records: Vec<Record> = self.list_items_in_tree(self.tree(kind)?)?;
        sort_by_creation(&mut records);
        Ok(records)
    }

    fn count_records(&self, ctx: &RequestContext, kind: EntityKind) -> RecordFoldResult<usize> {
        self.check_context(ctx, "count")?;
        Ok(self.tree(kind)?.len())
    }

    fn replace_record(
        &self,
        ctx: &RequestContext,
        kind: EntityKind,
        id: &RecordId,
        new: NewRecord,
    ) -> RecordFoldResult<Option<Record>> {
        self.update_record(ctx, kind, id, "replace", |record| {
            record.attributes = new.attributes.clone();
            record.core_data = new.core_data.clone();
            record.custom_fields = new.custom_fields.clone();
            record.schema_version = INITIAL_SCHEMA_VERSION;
            Ok(())
        })
    }

    fn set_document_path(
        &self,
        ctx: &RequestContext,
        kind: EntityKind,
        id: &RecordId,
        target: DocumentTarget,
        segments: &[String],
        value: &Value,
    ) -> RecordFoldResult<Option<Record>> {
        self.update_record(ctx, kind, id, "set field", |record| {
            document::deep_set(record.document_mut(target), segments, value.clone())
        })
    }

    fn remove_document_key(
        &self,
        ctx: &RequestContext,
        kind: EntityKind,
        id: &RecordId,
        target: DocumentTarget,
        key: &str,
    ) -> RecordFoldResult<Option<Record>> {
        self.update_record(ctx, kind, id, "remove field", |record| {
            document::remove_key(record.document_mut(target), key);
            Ok(())
        })
    }

    fn search_containment(
        &self,
        ctx: &RequestContext,
        kind: EntityKind,
        criteria: &Document,
    ) -> RecordFoldResult<Vec<Record>> {
        self.check_context(ctx, "search")?;
        let mut matches: Vec<Record> = self
            .list_items_in_tree::<Record>(self.tree(kind)?)?
            .into_iter()
            .filter(|r| document::matches_criteria(&r.core_data, &r.custom_fields, criteria))
            .collect();
        sort_by_creation(&mut matches);
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_ops() -> DbOperations {
        let db = sled::Config::new().temporary(true).open().unwrap();
        DbOperations::new(db).unwrap()
    }

    fn container(name: &str, core: Value) -> NewRecord {
        let mut attributes = Document::new();
        attributes.insert("name".into(), json!(name));
        attributes.insert("status".into(), json!("running"));
        NewRecord {
            attributes,
            core_data: core.as_object().cloned().unwrap_or_default(),
            custom_fields: Document::new(),
        }
    }

    #[test]
    fn sequential_ids_start_at_one() {
        let ops = temp_ops();
        let ctx = RequestContext::background();
        let first = ops.insert_record(&ctx, EntityKind::Container, container("a", json!({}))).unwrap();
        let second = ops.insert_record(&ctx, EntityKind::Container, container("b", json!({}))).unwrap();
        assert_eq!(first.id, RecordId::Int(1));
        assert_eq!(second.id, RecordId::Int(2));
        assert_eq!(first.schema_version, INITIAL_SCHEMA_VERSION);
    }

    #[test]
    fn each_sequential_kind_counts_on_its_own() {
        let ops = temp_ops();
        let ctx = RequestContext::background();
        let mut repo = NewRecord::default();
        repo.attributes.insert("name".into(), json!("api"));

        let c1 = ops.insert_record(&ctx, EntityKind::Container, container("a", json!({}))).unwrap();
        let r1 = ops.insert_record(&ctx, EntityKind::Repository, repo.clone()).unwrap();
        let c2 = ops.insert_record(&ctx, EntityKind::Container, container("b", json!({}))).unwrap();
        let r2 = ops.insert_record(&ctx, EntityKind::Repository, repo).unwrap();

        assert_eq!((c1.id, c2.id), (RecordId::Int(1), RecordId::Int(2)));
        assert_eq!((r1.id, r2.id), (RecordId::Int(1), RecordId::Int(2)));
    }

    #[test]
    fn failed_update_leaves_record_untouched() {
        let ops = temp_ops();
        let ctx = RequestContext::background();
        let rec = ops
            .insert_record(&ctx, EntityKind::Container, container("a", json!({"status": "up"})))
            .unwrap();
        let err = ops
            .set_document_path(
                &ctx,
                EntityKind::Container,
                &rec.id,
                DocumentTarget::CoreData,
                &["status".to_string(), "code".to_string()],
                &json!(1),
            )
            .unwrap_err();
        assert!(matches!(err, RecordFoldError::Validation(_)));

        let stored = ops.get_record(&ctx, EntityKind::Container, &rec.id).unwrap().unwrap();
        assert_eq!(stored, rec);
    }

    #[test]
    fn update_of_missing_record_is_none() {
        let ops = temp_ops();
        let ctx = RequestContext::background();
        let result = ops
            .remove_document_key(&ctx, EntityKind::Container, &RecordId::Int(99), DocumentTarget::CoreData, "x")
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn count_matches_inserts() {
        let ops = temp_ops();
        let ctx = RequestContext::background();
        ops.insert_record(&ctx, EntityKind::Container, container("a", json!({}))).unwrap();
        assert_eq!(ops.count_records(&ctx, EntityKind::Container).unwrap(), 1);
        assert_eq!(ops.count_records(&ctx, EntityKind::Secret).unwrap(), 0);
    }
}
