//! Entity kind handlers and the capability sets the dispatchers consult.
//!
//! Adding a kind means adding a handler and registering it; the mutator and
//! the search dispatcher never branch on concrete kinds.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::{EntityKind, Record};
use crate::context::RequestContext;
use crate::db_operations::RecordStore;
use crate::document::Document;
use crate::error::{RecordFoldError, RecordFoldResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    MutableCore,
    MutableCustom,
    RemovableCore,
    Replaceable,
    Searchable,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::MutableCore => "core field update",
            Capability::MutableCustom => "custom field update",
            Capability::RemovableCore => "core field removal",
            Capability::Replaceable => "record replacement",
            Capability::Searchable => "field search",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub mutable_core: bool,
    pub mutable_custom: bool,
    pub removable_core: bool,
    pub replaceable: bool,
    pub searchable: bool,
}

impl Capabilities {
    pub const SEARCH_ONLY: Capabilities = Capabilities {
        mutable_core: false,
        mutable_custom: false,
        removable_core: false,
        replaceable: false,
        searchable: true,
    };

    pub const MUTABLE: Capabilities = Capabilities {
        mutable_core: true,
        mutable_custom: true,
        removable_core: false,
        replaceable: false,
        searchable: true,
    };

    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::MutableCore => self.mutable_core,
            Capability::MutableCustom => self.mutable_custom,
            Capability::RemovableCore => self.removable_core,
            Capability::Replaceable => self.replaceable,
            Capability::Searchable => self.searchable,
        }
    }
}

pub trait EntityKindHandler: Send + Sync {
    fn kind(&self) -> EntityKind;

    fn capabilities(&self) -> Capabilities;

    /// Containment search over this kind's table.
    fn search(
        &self,
        store: &dyn RecordStore,
        ctx: &RequestContext,
        criteria: &Document,
    ) -> RecordFoldResult<Vec<Record>> {
        store.search_containment(ctx, self.kind(), criteria)
    }
}

macro_rules! kind_handler {
    ($name:ident, $kind:expr, $caps:expr) => {
        pub struct $name;

        impl EntityKindHandler for $name {
            fn kind(&self) -> EntityKind {
                $kind
            }

            fn capabilities(&self) -> Capabilities {
                $caps
            }
        }
    };
}

kind_handler!(
    ContainerHandler,
    EntityKind::Container,
    Capabilities {
        removable_core: true,
        replaceable: true,
        ..Capabilities::MUTABLE
    }
);
kind_handler!(RepositoryHandler, EntityKind::Repository, Capabilities::MUTABLE);
kind_handler!(CacheEntryHandler, EntityKind::CacheEntry, Capabilities::SEARCH_ONLY);
kind_handler!(LogEntryHandler, EntityKind::LogEntry, Capabilities::SEARCH_ONLY);
kind_handler!(SecretHandler, EntityKind::Secret, Capabilities::SEARCH_ONLY);
kind_handler!(RegistryValueHandler, EntityKind::RegistryValue, Capabilities::SEARCH_ONLY);
kind_handler!(PlistValueHandler, EntityKind::PlistValue, Capabilities::SEARCH_ONLY);

/// Lookup table from entity kind to its handler.
#[derive(Clone, Default)]
pub struct KindRegistry {
    handlers: HashMap<EntityKind, Arc<dyn EntityKindHandler>>,
}

impl KindRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// All seven built-in kinds.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(ContainerHandler));
        registry.register(Arc::new(RepositoryHandler));
        registry.register(Arc::new(CacheEntryHandler));
        registry.register(Arc::new(LogEntryHandler));
        registry.register(Arc::new(SecretHandler));
        registry.register(Arc::new(RegistryValueHandler));
        registry.register(Arc::new(PlistValueHandler));
        registry
    }

    /// Register a handler, replacing any previous one for the same kind.
    pub fn register(&mut self, handler: Arc<dyn EntityKindHandler>) {
        self.handlers.insert(handler.kind(), handler);
    }

    pub fn handler(&self, kind: EntityKind) -> Option<&Arc<dyn EntityKindHandler>> {
        self.handlers.get(&kind)
    }

    /// The handler for `kind`, provided it supports `capability`.
    pub fn require(
        &self,
        kind: EntityKind,
        capability: Capability,
    ) -> RecordFoldResult<&Arc<dyn EntityKindHandler>> {
        match self.handlers.get(&kind) {
            Some(handler) if handler.capabilities().allows(capability) => Ok(handler),
            _ => {
                log::warn!("Rejected {} on {}: capability not supported", capability, kind);
                Err(RecordFoldError::unsupported(kind, &capability.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_container_and_repository_are_mutable() {
        let registry = KindRegistry::with_defaults();
        for kind in EntityKind::ALL {
            let mutable = matches!(kind, EntityKind::Container | EntityKind::Repository);
            assert_eq!(registry.require(kind, Capability::MutableCustom).is_ok(), mutable);
            assert_eq!(registry.require(kind, Capability::MutableCore).is_ok(), mutable);
            assert!(registry.require(kind, Capability::Searchable).is_ok());
        }
    }

    #[test]
    fn only_container_supports_removal() {
        let registry = KindRegistry::with_defaults();
        assert!(registry.require(EntityKind::Container, Capability::RemovableCore).is_ok());
        let err = registry
            .require(EntityKind::Repository, Capability::RemovableCore)
            .err()
            .unwrap();
        assert_eq!(err.code(), "UNSUPPORTED_ENTITY_KIND");
    }

    #[test]
    fn unregistered_kind_is_unsupported() {
        let registry = KindRegistry::empty();
        assert!(registry.require(EntityKind::Secret, Capability::Searchable).is_err());
        assert!(registry.handler(EntityKind::Secret).is_none());
    }

    struct WritableSecrets;

    impl EntityKindHandler for WritableSecrets {
        fn kind(&self) -> EntityKind {
            EntityKind::Secret
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities::MUTABLE
        }
    }

    #[test]
    fn registering_replaces_the_default_handler() {
        let mut registry = KindRegistry::with_defaults();
        assert_eq!(
            registry.handler(EntityKind::Secret).map(|h| h.capabilities()),
            Some(Capabilities::SEARCH_ONLY)
        );

        registry.register(Arc::new(WritableSecrets));
        assert_eq!(
            registry.handler(EntityKind::Secret).map(|h| h.capabilities()),
            Some(Capabilities::MUTABLE)
        );
        assert!(registry.require(EntityKind::Secret, Capability::MutableCustom).is_ok());
        assert!(registry.require(EntityKind::Secret, Capability::RemovableCore).is_err());
    }
}
