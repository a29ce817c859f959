//! Field Search Dispatcher: one entry point for containment search over every
//! entity kind, routed through the kind's registered handler.

use std::sync::Arc;

use crate::context::RequestContext;
use crate::db_operations::RecordStore;
use crate::document::Document;
use crate::error::RecordFoldResult;
use crate::records::{Capability, EntityKind, KindRegistry, Record};

#[derive(Clone)]
pub struct FieldSearchDispatcher {
    store: Arc<dyn RecordStore>,
    kinds: Arc<KindRegistry>,
}

impl FieldSearchDispatcher {
    pub fn new(store: Arc<dyn RecordStore>, kinds: Arc<KindRegistry>) -> Self {
        Self { store, kinds }
    }

    /// Records of `kind` whose documents contain every `criteria` entry.
    /// No match is an empty result, not an error.
    pub fn search_by_field(
        &self,
        ctx: &RequestContext,
        kind: EntityKind,
        criteria: &Document,
    ) -> RecordFoldResult<Vec<Record>> {
        let handler = self.kinds.require(kind, Capability::Searchable)?;
        let results = handler.search(self.store.as_ref(), ctx, criteria)?;
        log::debug!(
            "[{}] Search on {} with {} criteria matched {} records",
            ctx.label(),
            kind,
            criteria.len(),
            results.len()
        );
        Ok(results)
    }

    /// Same as [`search_by_field`](Self::search_by_field) for a kind given by
    /// name; unknown names are an unsupported entity kind.
    pub fn search_by_kind_name(
        &self,
        ctx: &RequestContext,
        kind_name: &str,
        criteria: &Document,
    ) -> RecordFoldResult<Vec<Record>> {
        let kind: EntityKind = kind_name.parse()?;
        self.search_by_field(ctx, kind, criteria)
    }
}
