//! Per-kind create requests.
//!
//! Every request carries its kind-intrinsic attributes plus optional `coreData`
//! and `customFields` documents; they all reduce to a [`NewRecord`].

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::EntityKind;
use crate::document::{self, Document};
use crate::error::{RecordFoldError, RecordFoldResult};

/// A record body before the store assigns it an id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewRecord {
    pub attributes: Document,
    pub core_data: Document,
    pub custom_fields: Document,
}

impl NewRecord {
    /// Check that the kind's required attributes are present and non-empty.
    pub fn validate(&self, kind: EntityKind) -> RecordFoldResult<()> {
        for name in kind.required_attributes() {
            let present = self
                .attributes
                .get(*name)
                .and_then(Value::as_str)
                .is_some_and(|s| !s.trim().is_empty());
            if !present {
                return Err(RecordFoldError::Validation(format!(
                    "{} requires a non-empty '{}' attribute",
                    kind, name
                )));
            }
        }
        document::check_depth(&self.core_data, "coreData")?;
        document::check_depth(&self.custom_fields, "customFields")?;
        Ok(())
    }

    /// Decode a raw JSON request body into the kind's typed request.
    pub fn from_json(kind: EntityKind, body: Value) -> RecordFoldResult<Self> {
        fn decode<R: RecordRequest>(body: Value) -> RecordFoldResult<NewRecord> {
            let request: R = serde_json::from_value(body).map_err(|e| {
                RecordFoldError::Validation(format!("invalid {} request: {}", R::KIND, e))
            })?;
            request.into_new_record()
        }

        match kind {
            EntityKind::Container => decode::<ContainerRequest>(body),
            EntityKind::Repository => decode::<RepositoryRequest>(body),
            EntityKind::CacheEntry => decode::<CacheEntryRequest>(body),
            EntityKind::LogEntry => decode::<LogEntryRequest>(body),
            EntityKind::Secret => decode::<SecretRequest>(body),
            EntityKind::RegistryValue => decode::<RegistryValueRequest>(body),
            EntityKind::PlistValue => decode::<PlistValueRequest>(body),
        }
    }
}

pub trait RecordRequest: Serialize + DeserializeOwned {
    const KIND: EntityKind;

    /// Split the request into attributes and the two documents.
    fn into_new_record(self) -> RecordFoldResult<NewRecord>
    where
        Self: Sized,
    {
        let mut attributes = match serde_json::to_value(&self)? {
            Value::Object(map) => map,
            _ => {
                return Err(RecordFoldError::Validation(format!(
                    "{} request must be an object",
                    Self::KIND
                )))
            }
        };
        let core_data = take_document(&mut attributes, "coreData");
        let custom_fields = take_document(&mut attributes, "customFields");
        let new = NewRecord {
            attributes,
            core_data,
            custom_fields,
        };
        new.validate(Self::KIND)?;
        Ok(new)
    }
}

fn take_document(map: &mut Document, key: &str) -> Document {
    match map.shift_remove(key) {
        Some(Value::Object(doc)) => doc,
        _ => Document::new(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerRequest {
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub core_data: Document,
    #[serde(default)]
    pub custom_fields: Document,
}

impl RecordRequest for ContainerRequest {
    const KIND: EntityKind = EntityKind::Container;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryRequest {
    pub name: String,
    #[serde(default)]
    pub core_data: Document,
    #[serde(default)]
    pub custom_fields: Document,
}

impl RecordRequest for RepositoryRequest {
    const KIND: EntityKind = EntityKind::Repository;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntryRequest {
    pub technology: String,
    pub cache_type: String,
    #[serde(default)]
    pub core_data: Document,
    #[serde(default)]
    pub custom_fields: Document,
}

impl RecordRequest for CacheEntryRequest {
    const KIND: EntityKind = EntityKind::CacheEntry;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntryRequest {
    pub level: String,
    pub message: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub core_data: Document,
    #[serde(default)]
    pub custom_fields: Document,
}

impl RecordRequest for LogEntryRequest {
    const KIND: EntityKind = EntityKind::LogEntry;

    fn into_new_record(mut self) -> RecordFoldResult<NewRecord> {
        // Entries without a timestamp are stamped on arrival.
        self.timestamp.get_or_insert_with(Utc::now);
        let mut attributes = Document::new();
        attributes.insert("level".into(), Value::String(self.level));
        attributes.insert("message".into(), Value::String(self.message));
        attributes.insert("timestamp".into(), serde_json::to_value(self.timestamp)?);
        let new = NewRecord {
            attributes,
            core_data: self.core_data,
            custom_fields: self.custom_fields,
        };
        new.validate(Self::KIND)?;
        Ok(new)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretRequest {
    pub description: String,
    #[serde(default)]
    pub core_data: Document,
    #[serde(default)]
    pub custom_fields: Document,
}

impl RecordRequest for SecretRequest {
    const KIND: EntityKind = EntityKind::Secret;
}

/// A Windows registry value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryValueRequest {
    pub subkey: String,
    pub value_name: String,
    #[serde(default)]
    pub core_data: Document,
    #[serde(default)]
    pub custom_fields: Document,
}

impl RecordRequest for RegistryValueRequest {
    const KIND: EntityKind = EntityKind::RegistryValue;
}

/// A macOS property-list value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlistValueRequest {
    pub key: String,
    #[serde(default)]
    pub core_data: Document,
    #[serde(default)]
    pub custom_fields: Document,
}

impl RecordRequest for PlistValueRequest {
    const KIND: EntityKind = EntityKind::PlistValue;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn container_request_splits_documents_from_attributes() {
        let new = ContainerRequest {
            name: "web".into(),
            status: "running".into(),
            core_data: json!({"image": "nginx"}).as_object().unwrap().clone(),
            custom_fields: Document::new(),
        }
        .into_new_record()
        .unwrap();

        assert_eq!(new.attributes.keys().collect::<Vec<_>>(), vec!["name", "status"]);
        assert_eq!(new.core_data.get("image"), Some(&json!("nginx")));
        assert!(new.custom_fields.is_empty());
    }

    #[test]
    fn empty_required_attribute_is_rejected() {
        let err = RepositoryRequest {
            name: "  ".into(),
            core_data: Document::new(),
            custom_fields: Document::new(),
        }
        .into_new_record()
        .unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn raw_body_missing_attribute_is_validation_error() {
        let err = NewRecord::from_json(EntityKind::RegistryValue, json!({"subkey": "HKLM"})).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn log_entry_gets_a_timestamp() {
        let new = NewRecord::from_json(
            EntityKind::LogEntry,
            json!({"level": "warn", "message": "disk almost full"}),
        )
        .unwrap();
        assert!(new.attributes.get("timestamp").is_some_and(|t| t.is_string()));
    }

    #[test]
    fn cache_request_uses_camel_case_keys() {
        let new = NewRecord::from_json(
            EntityKind::CacheEntry,
            json!({"technology": "redis", "cacheType": "lru", "customFields": {"ttl": 60}}),
        )
        .unwrap();
        assert_eq!(new.attributes.get("cacheType"), Some(&json!("lru")));
        assert_eq!(new.custom_fields.get("ttl"), Some(&json!(60)));
    }
}
