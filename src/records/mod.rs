//! Record model shared by every entity kind.
//!
//! Each kind keeps its own tree and its own kind-intrinsic attributes, but all
//! of them share the `coreData` / `customFields` / `schemaVersion` shape.

pub mod kinds;
pub mod requests;

pub use kinds::{Capabilities, Capability, EntityKindHandler, KindRegistry};
pub use requests::{
    CacheEntryRequest, ContainerRequest, LogEntryRequest, NewRecord, PlistValueRequest,
    RecordRequest, RegistryValueRequest, RepositoryRequest, SecretRequest,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::document::Document;
use crate::error::{RecordFoldError, RecordFoldResult};

/// Schema version stamped on newly created records.
pub const INITIAL_SCHEMA_VERSION: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    #[serde(rename = "docker_container", alias = "container")]
    Container,
    #[serde(rename = "git_repo", alias = "repository")]
    Repository,
    #[serde(rename = "cache_data", alias = "cache_entry")]
    CacheEntry,
    #[serde(rename = "log_entry")]
    LogEntry,
    #[serde(rename = "secret")]
    Secret,
    #[serde(rename = "registry_data", alias = "registry_value")]
    RegistryValue,
    #[serde(rename = "plist_data", alias = "plist_value")]
    PlistValue,
}

/// How a kind's tree allocates record identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdStrategy {
    Sequential,
    Uuid,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Container,
        EntityKind::Repository,
        EntityKind::CacheEntry,
        EntityKind::LogEntry,
        EntityKind::Secret,
        EntityKind::RegistryValue,
        EntityKind::PlistValue,
    ];

    /// Storage table (sled tree) name.
    pub fn table_name(&self) -> &'static str {
        match self {
            EntityKind::Container => "docker_container",
            EntityKind::Repository => "git_repo",
            EntityKind::CacheEntry => "cache_data",
            EntityKind::LogEntry => "log_entry",
            EntityKind::Secret => "secret",
            EntityKind::RegistryValue => "registry_data",
            EntityKind::PlistValue => "plist_data",
        }
    }

    pub fn short_name(&self) -> &'static str {
        match self {
            EntityKind::Container => "container",
            EntityKind::Repository => "repository",
            EntityKind::CacheEntry => "cache_entry",
            EntityKind::LogEntry => "log_entry",
            EntityKind::Secret => "secret",
            EntityKind::RegistryValue => "registry_value",
            EntityKind::PlistValue => "plist_value",
        }
    }

    pub fn id_strategy(&self) -> IdStrategy {
        match self {
            EntityKind::Container | EntityKind::Repository => IdStrategy::Sequential,
            _ => IdStrategy::Uuid,
        }
    }

    /// Attributes a create request must carry as non-empty strings.
    pub fn required_attributes(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Container => &["name", "status"],
            EntityKind::Repository => &["name"],
            EntityKind::CacheEntry => &["technology", "cacheType"],
            EntityKind::LogEntry => &["level", "message"],
            EntityKind::Secret => &["description"],
            EntityKind::RegistryValue => &["subkey", "valueName"],
            EntityKind::PlistValue => &["key"],
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

impl FromStr for EntityKind {
    type Err = RecordFoldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        EntityKind::ALL
            .into_iter()
            .find(|k| k.table_name() == name || k.short_name() == name)
            .ok_or_else(|| RecordFoldError::unsupported(name, "entity kind lookup"))
    }
}

/// Opaque record identifier: sequential integer or UUID string depending on kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl RecordId {
    /// Parse a caller-supplied id in the form the kind uses.
    pub fn parse_for(kind: EntityKind, raw: &str) -> RecordFoldResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(RecordFoldError::Validation(format!("record id for {} must not be empty", kind)));
        }
        match kind.id_strategy() {
            IdStrategy::Sequential => raw.parse::<i64>().map(RecordId::Int).map_err(|_| {
                RecordFoldError::Validation(format!("'{}' is not a valid {} id", raw, kind))
            }),
            IdStrategy::Uuid => Ok(RecordId::Text(raw.to_string())),
        }
    }

    pub fn storage_key(&self) -> Vec<u8> {
        match self {
            RecordId::Int(n) => (*n as u64).to_be_bytes().to_vec(),
            RecordId::Text(s) => s.as_bytes().to_vec(),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(n) => write!(f, "{}", n),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        RecordId::Int(n)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId::Text(s.to_string())
    }
}

/// Which of a record's two documents an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentTarget {
    CoreData,
    CustomFields,
}

impl DocumentTarget {
    pub fn from_custom_flag(is_custom: bool) -> Self {
        if is_custom {
            DocumentTarget::CustomFields
        } else {
            DocumentTarget::CoreData
        }
    }
}

impl fmt::Display for DocumentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentTarget::CoreData => f.write_str("coreData"),
            DocumentTarget::CustomFields => f.write_str("customFields"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: RecordId,
    pub kind: EntityKind,
    /// Kind-intrinsic columns such as a container's `name` and `status`
    #[serde(default)]
    pub attributes: Document,
    #[serde(default)]
    pub core_data: Document,
    #[serde(default)]
    pub custom_fields: Document,
    pub schema_version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    pub fn from_new(kind: EntityKind, id: RecordId, new: NewRecord) -> Self {
        let now = Utc::now();
        Self {
            id,
            kind,
            attributes: new.attributes,
            core_data: new.core_data,
            custom_fields: new.custom_fields,
            schema_version: INITIAL_SCHEMA_VERSION,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn document_mut(&mut self, target: DocumentTarget) -> &mut Document {
        match target {
            DocumentTarget::CoreData => &mut self.core_data,
            DocumentTarget::CustomFields => &mut self.custom_fields,
        }
    }

    pub fn attribute_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_parse_from_table_and_short_names() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.table_name().parse::<EntityKind>().unwrap(), kind);
            assert_eq!(kind.short_name().parse::<EntityKind>().unwrap(), kind);
        }
        let err = "workflow".parse::<EntityKind>().unwrap_err();
        assert_eq!(err.code(), "UNSUPPORTED_ENTITY_KIND");
    }

    #[test]
    fn kind_serializes_as_table_name() {
        let json = serde_json::to_string(&EntityKind::Container).unwrap();
        assert_eq!(json, "\"docker_container\"");
        let kind: EntityKind = serde_json::from_str("\"repository\"").unwrap();
        assert_eq!(kind, EntityKind::Repository);
    }

    #[test]
    fn record_ids_follow_kind_strategy() {
        assert_eq!(RecordId::parse_for(EntityKind::Container, "12").unwrap(), RecordId::Int(12));
        assert!(RecordId::parse_for(EntityKind::Container, "abc").is_err());
        assert_eq!(
            RecordId::parse_for(EntityKind::Secret, "abc").unwrap(),
            RecordId::Text("abc".into())
        );
    }

    #[test]
    fn integer_keys_sort_numerically() {
        let a = RecordId::Int(2).storage_key();
        let b = RecordId::Int(10).storage_key();
        assert!(a < b);
    }
}
