//! Pattern property: regex values stored as their source text.
//!
//! Loading compiles the stored text verbatim; dumping returns
//! `Regex::as_str()`, the exact source the pattern was built from, so
//! `load(dump(p))` and `dump(load(s))` round-trip.

use crate::model::value::{Value, ValueKind};
use crate::property::{
    invalid_stored, kind_mismatch, present, PropertyError, PropertyResult, PropertyType,
    StoredValue,
};
use regex::Regex;

#[derive(Debug, Clone, Copy, Default)]
pub struct RegexpProperty;

/// Compiles stored pattern source. `None` passes through.
pub fn load_pattern(stored: Option<&str>) -> PropertyResult<Option<Regex>> {
    stored
        .map(|source| {
            Regex::new(source).map_err(|error| PropertyError::InvalidPattern {
                source_text: source.to_string(),
                error,
            })
        })
        .transpose()
}

/// Returns the source text of a pattern. `None` passes through.
pub fn dump_pattern(native: Option<&Regex>) -> Option<String> {
    native.map(|pattern| pattern.as_str().to_string())
}

impl PropertyType for RegexpProperty {
    fn type_name(&self) -> &'static str {
        "regexp"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Pattern
    }

    fn column_definition(&self) -> &'static str {
        "TEXT"
    }

    fn load(&self, stored: Option<&StoredValue>) -> PropertyResult<Option<Value>> {
        match present(stored) {
            None => Ok(None),
            Some(StoredValue::Text(source)) => {
                Ok(load_pattern(Some(source.as_str()))?.map(Value::Pattern))
            }
            Some(other) => Err(invalid_stored(self.type_name(), other)),
        }
    }

    fn dump(&self, native: Option<&Value>) -> PropertyResult<Option<StoredValue>> {
        match native {
            None => Ok(None),
            Some(Value::Pattern(pattern)) => Ok(dump_pattern(Some(pattern)).map(StoredValue::Text)),
            Some(other) => Err(kind_mismatch(self.type_name(), ValueKind::Pattern, other)),
        }
    }
}

/// `serde(with)` adapter encoding a `Regex` as its source text.
pub mod serde_pattern {
    use super::{dump_pattern, load_pattern};
    use regex::Regex;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(pattern: &Regex, serializer: S) -> Result<S::Ok, S::Error> {
        match dump_pattern(Some(pattern)) {
            Some(source) => serializer.serialize_str(&source),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Regex, D::Error> {
        let source = String::deserialize(deserializer)?;
        load_pattern(Some(source.as_str()))
            .map_err(D::Error::custom)?
            .ok_or_else(|| D::Error::custom("missing pattern source"))
    }
}

#[cfg(test)]
mod tests {
    use super::{dump_pattern, load_pattern};
    use crate::property::PropertyError;
    use regex::Regex;

    #[test]
    fn dump_returns_source_not_debug_form() {
        let pattern = Regex::new(r"^a/b\.c$").unwrap();
        assert_eq!(dump_pattern(Some(&pattern)).as_deref(), Some(r"^a/b\.c$"));
    }

    #[test]
    fn malformed_source_is_an_error() {
        let err = load_pattern(Some("[a-")).unwrap_err();
        assert!(matches!(err, PropertyError::InvalidPattern { source_text, .. } if source_text == "[a-"));
    }
}
