//! Record instances.
//!
//! # Responsibility
//! - Hold field values for one instance of a `RecordType`.
//! - Track persisted identity (key) and removal state.
//!
//! # Invariants
//! - New records start with every property default applied, so paranoid
//!   booleans begin as `false`.
//! - `set` rejects unknown fields, the key field and values of the wrong kind.
//! - The key is only assigned by the persistence layer.

use crate::model::record_type::RecordType;
use crate::model::value::Value;
use crate::property::{PropertyError, PropertyResult};
use regex::Regex;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Persisted identity of a record (SQLite rowid).
pub type RecordKey = i64;

/// One record instance. Each instance is owned by its caller.
#[derive(Debug, Clone)]
pub struct Record {
    record_type: Arc<RecordType>,
    key: Option<RecordKey>,
    removed: bool,
    values: BTreeMap<String, Value>,
}

impl Record {
    /// Builds an unsaved record with property defaults applied.
    pub fn new(record_type: &Arc<RecordType>) -> Self {
        let values = record_type
            .properties()
            .iter()
            .filter_map(|def| {
                def.property()
                    .default_value()
                    .map(|value| (def.name().to_string(), value))
            })
            .collect();

        Self {
            record_type: Arc::clone(record_type),
            key: None,
            removed: false,
            values,
        }
    }

    /// Rebuilds a record read back from storage.
    pub(crate) fn from_storage(
        record_type: &Arc<RecordType>,
        key: RecordKey,
        values: BTreeMap<String, Value>,
    ) -> Self {
        let mut record = Self {
            record_type: Arc::clone(record_type),
            key: None,
            removed: false,
            values,
        };
        record.assign_key(key);
        record
    }

    pub fn record_type(&self) -> &Arc<RecordType> {
        &self.record_type
    }

    pub fn key(&self) -> Option<RecordKey> {
        self.key
    }

    /// True until the record has been stored once.
    pub fn is_new(&self) -> bool {
        self.key.is_none()
    }

    /// True after the record's row was physically deleted.
    pub fn is_removed(&self) -> bool {
        self.removed
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_text)
    }

    pub fn get_pattern(&self, name: &str) -> Option<&Regex> {
        self.get(name).and_then(Value::as_pattern)
    }

    /// Assigns a field value, or clears it with `None`.
    ///
    /// # Errors
    /// - `UnknownField` when the type declares no such property.
    /// - `KeyAssignment` for the key property.
    /// - `KindMismatch` when the value kind differs from the property's.
    pub fn set(&mut self, name: &str, value: Option<Value>) -> PropertyResult<()> {
        let def = self
            .record_type
            .property(name)
            .ok_or_else(|| PropertyError::UnknownField {
                record_type: self.record_type.name().to_string(),
                field: name.to_string(),
            })?;
        if def.property().is_key() {
            return Err(PropertyError::KeyAssignment {
                record_type: self.record_type.name().to_string(),
                field: name.to_string(),
            });
        }

        if let Some(value) = &value {
            let expected = def.property().kind();
            if value.kind() != expected {
                return Err(PropertyError::KindMismatch {
                    property: def.property().type_name(),
                    expected,
                    actual: value.kind(),
                });
            }
        }

        self.write_value(name, value);
        Ok(())
    }

    /// Field values in name order.
    pub fn values(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub(crate) fn write_value(&mut self, name: &str, value: Option<Value>) {
        match value {
            Some(value) => {
                self.values.insert(name.to_string(), value);
            }
            None => {
                self.values.remove(name);
            }
        }
    }

    pub(crate) fn assign_key(&mut self, key: RecordKey) {
        self.key = Some(key);
        let key_name = self.record_type.key_name().to_string();
        self.values.insert(key_name, Value::Integer(key));
    }

    pub(crate) fn mark_removed(&mut self) {
        self.removed = true;
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Record", 3)?;
        state.serialize_field("type", self.record_type.name())?;
        state.serialize_field("key", &self.key)?;
        state.serialize_field("values", &self.values)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::Record;
    use crate::model::record_type::RecordTypeBuilder;
    use crate::model::value::{Value, ValueKind};
    use crate::paranoid::ParanoidBoolean;
    use crate::property::primitive::{Serial, Text};
    use crate::property::PropertyError;

    fn note_type() -> std::sync::Arc<crate::RecordType> {
        RecordTypeBuilder::new("Note")
            .property("id", Serial)
            .property("title", Text)
            .property("deleted", ParanoidBoolean)
            .build()
            .unwrap()
    }

    #[test]
    fn new_record_applies_defaults() {
        let record = Record::new(&note_type());
        assert!(record.is_new());
        assert!(!record.is_removed());
        assert_eq!(record.get_bool("deleted"), Some(false));
        assert_eq!(record.get("title"), None);
    }

    #[test]
    fn set_rejects_unknown_field_and_wrong_kind() {
        let mut record = Record::new(&note_type());

        let unknown = record.set("missing", Some(Value::from("x"))).unwrap_err();
        assert!(matches!(unknown, PropertyError::UnknownField { field, .. } if field == "missing"));

        let mismatch = record.set("title", Some(Value::Integer(1))).unwrap_err();
        assert!(matches!(
            mismatch,
            PropertyError::KindMismatch {
                expected: ValueKind::Text,
                actual: ValueKind::Integer,
                ..
            }
        ));

        record.set("title", Some(Value::from("hello"))).unwrap();
        assert_eq!(record.get_text("title"), Some("hello"));
        record.set("title", None).unwrap();
        assert_eq!(record.get_text("title"), None);
    }

    #[test]
    fn set_rejects_key_field() {
        let mut record = Record::new(&note_type());

        let err = record.set("id", Some(Value::Integer(7))).unwrap_err();
        assert!(matches!(err, PropertyError::KeyAssignment { field, .. } if field == "id"));
        assert_eq!(record.key(), None);
        assert_eq!(record.get("id"), None);
    }
}
