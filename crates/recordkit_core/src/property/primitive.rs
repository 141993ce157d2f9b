//! Built-in scalar property types.

use crate::model::value::{Value, ValueKind};
use crate::property::{
    invalid_stored, kind_mismatch, present, PropertyError, PropertyResult, PropertyType,
    StoredValue,
};
use uuid::Uuid;

/// Auto-incrementing integer key.
#[derive(Debug, Clone, Copy, Default)]
pub struct Serial;

/// Boolean stored as `0`/`1`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Boolean;

#[derive(Debug, Clone, Copy, Default)]
pub struct Integer;

#[derive(Debug, Clone, Copy, Default)]
pub struct Text;

/// Unix epoch milliseconds stored as INTEGER.
#[derive(Debug, Clone, Copy, Default)]
pub struct Timestamp;

/// UUID stored as its hyphenated text form.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidProperty;

impl PropertyType for Serial {
    fn type_name(&self) -> &'static str {
        "serial"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Integer
    }

    fn column_definition(&self) -> &'static str {
        "INTEGER PRIMARY KEY AUTOINCREMENT"
    }

    fn load(&self, stored: Option<&StoredValue>) -> PropertyResult<Option<Value>> {
        load_integer(self.type_name(), stored).map(|value| value.map(Value::Integer))
    }

    fn dump(&self, native: Option<&Value>) -> PropertyResult<Option<StoredValue>> {
        match native {
            None => Ok(None),
            Some(Value::Integer(value)) => Ok(Some(StoredValue::Integer(*value))),
            Some(other) => Err(kind_mismatch(self.type_name(), ValueKind::Integer, other)),
        }
    }

    fn is_key(&self) -> bool {
        true
    }
}

impl PropertyType for Boolean {
    fn type_name(&self) -> &'static str {
        "boolean"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Boolean
    }

    fn column_definition(&self) -> &'static str {
        "INTEGER"
    }

    fn load(&self, stored: Option<&StoredValue>) -> PropertyResult<Option<Value>> {
        load_boolean(self.type_name(), stored)
    }

    fn dump(&self, native: Option<&Value>) -> PropertyResult<Option<StoredValue>> {
        dump_boolean(self.type_name(), native)
    }
}

impl PropertyType for Integer {
    fn type_name(&self) -> &'static str {
        "integer"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Integer
    }

    fn column_definition(&self) -> &'static str {
        "INTEGER"
    }

    fn load(&self, stored: Option<&StoredValue>) -> PropertyResult<Option<Value>> {
        load_integer(self.type_name(), stored).map(|value| value.map(Value::Integer))
    }

    fn dump(&self, native: Option<&Value>) -> PropertyResult<Option<StoredValue>> {
        match native {
            None => Ok(None),
            Some(Value::Integer(value)) => Ok(Some(StoredValue::Integer(*value))),
            Some(other) => Err(kind_mismatch(self.type_name(), ValueKind::Integer, other)),
        }
    }
}

impl PropertyType for Text {
    fn type_name(&self) -> &'static str {
        "text"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Text
    }

    fn column_definition(&self) -> &'static str {
        "TEXT"
    }

    fn load(&self, stored: Option<&StoredValue>) -> PropertyResult<Option<Value>> {
        match present(stored) {
            None => Ok(None),
            Some(StoredValue::Text(value)) => Ok(Some(Value::Text(value.clone()))),
            Some(other) => Err(invalid_stored(self.type_name(), other)),
        }
    }

    fn dump(&self, native: Option<&Value>) -> PropertyResult<Option<StoredValue>> {
        match native {
            None => Ok(None),
            Some(Value::Text(value)) => Ok(Some(StoredValue::Text(value.clone()))),
            Some(other) => Err(kind_mismatch(self.type_name(), ValueKind::Text, other)),
        }
    }
}

impl PropertyType for Timestamp {
    fn type_name(&self) -> &'static str {
        "timestamp"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Timestamp
    }

    fn column_definition(&self) -> &'static str {
        "INTEGER"
    }

    fn load(&self, stored: Option<&StoredValue>) -> PropertyResult<Option<Value>> {
        load_timestamp(self.type_name(), stored)
    }

    fn dump(&self, native: Option<&Value>) -> PropertyResult<Option<StoredValue>> {
        dump_timestamp(self.type_name(), native)
    }
}

impl PropertyType for UuidProperty {
    fn type_name(&self) -> &'static str {
        "uuid"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Uuid
    }

    fn column_definition(&self) -> &'static str {
        "TEXT"
    }

    fn load(&self, stored: Option<&StoredValue>) -> PropertyResult<Option<Value>> {
        match present(stored) {
            None => Ok(None),
            Some(StoredValue::Text(text)) => Uuid::parse_str(text)
                .map(|uuid| Some(Value::Uuid(uuid)))
                .map_err(|err| PropertyError::InvalidStoredValue {
                    property: self.type_name(),
                    message: format!("`{text}` is not a uuid: {err}"),
                }),
            Some(other) => Err(invalid_stored(self.type_name(), other)),
        }
    }

    fn dump(&self, native: Option<&Value>) -> PropertyResult<Option<StoredValue>> {
        match native {
            None => Ok(None),
            Some(Value::Uuid(uuid)) => Ok(Some(StoredValue::Text(uuid.to_string()))),
            Some(other) => Err(kind_mismatch(self.type_name(), ValueKind::Uuid, other)),
        }
    }
}

fn load_integer(property: &'static str, stored: Option<&StoredValue>) -> PropertyResult<Option<i64>> {
    match present(stored) {
        None => Ok(None),
        Some(StoredValue::Integer(value)) => Ok(Some(*value)),
        Some(other) => Err(invalid_stored(property, other)),
    }
}

pub(crate) fn load_boolean(
    property: &'static str,
    stored: Option<&StoredValue>,
) -> PropertyResult<Option<Value>> {
    match load_integer(property, stored)? {
        None => Ok(None),
        Some(0) => Ok(Some(Value::Boolean(false))),
        Some(1) => Ok(Some(Value::Boolean(true))),
        Some(other) => Err(PropertyError::InvalidStoredValue {
            property,
            message: format!("expected 0 or 1, got {other}"),
        }),
    }
}

pub(crate) fn dump_boolean(
    property: &'static str,
    native: Option<&Value>,
) -> PropertyResult<Option<StoredValue>> {
    match native {
        None => Ok(None),
        Some(Value::Boolean(value)) => Ok(Some(StoredValue::Integer(i64::from(*value)))),
        Some(other) => Err(kind_mismatch(property, ValueKind::Boolean, other)),
    }
}

pub(crate) fn load_timestamp(
    property: &'static str,
    stored: Option<&StoredValue>,
) -> PropertyResult<Option<Value>> {
    load_integer(property, stored).map(|value| value.map(Value::Timestamp))
}

pub(crate) fn dump_timestamp(
    property: &'static str,
    native: Option<&Value>,
) -> PropertyResult<Option<StoredValue>> {
    match native {
        None => Ok(None),
        Some(Value::Timestamp(value)) => Ok(Some(StoredValue::Integer(*value))),
        Some(other) => Err(kind_mismatch(property, ValueKind::Timestamp, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::{Boolean, Text, Timestamp, UuidProperty};
    use crate::model::value::Value;
    use crate::property::{PropertyError, PropertyType, StoredValue};
    use uuid::Uuid;

    #[test]
    fn null_and_absent_load_as_none() {
        assert_eq!(Text.load(None).unwrap(), None);
        assert_eq!(Text.load(Some(&StoredValue::Null)).unwrap(), None);
        assert_eq!(Boolean.dump(None).unwrap(), None);
    }

    #[test]
    fn boolean_rejects_out_of_range_integers() {
        let err = Boolean.load(Some(&StoredValue::Integer(2))).unwrap_err();
        assert!(matches!(err, PropertyError::InvalidStoredValue { .. }));
        assert_eq!(
            Boolean.load(Some(&StoredValue::Integer(1))).unwrap(),
            Some(Value::Boolean(true))
        );
    }

    #[test]
    fn timestamp_dump_rejects_plain_integer() {
        let err = Timestamp.dump(Some(&Value::Integer(10))).unwrap_err();
        assert!(matches!(err, PropertyError::KindMismatch { .. }));
    }

    #[test]
    fn uuid_loads_from_text_and_rejects_garbage() {
        let id = Uuid::new_v4();
        let loaded = UuidProperty
            .load(Some(&StoredValue::Text(id.to_string())))
            .unwrap();
        assert_eq!(loaded, Some(Value::Uuid(id)));

        let err = UuidProperty
            .load(Some(&StoredValue::Text("not-a-uuid".to_string())))
            .unwrap_err();
        assert!(err.to_string().contains("not a uuid"));
    }
}
