//! Property types: conversion between stored and native field values.
//!
//! # Responsibility
//! - Define the `PropertyType` contract every field type implements.
//! - Provide the built-in primitive, uuid and pattern property types.
//!
//! # Invariants
//! - `load(None)` and `dump(None)` both return `Ok(None)`; SQL `NULL` loads
//!   as `None`.
//! - Conversion failures surface as `PropertyError`, never as silent `None`.

use crate::model::value::{Value, ValueKind};
use crate::paranoid::ParanoidMarker;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod primitive;
pub mod regexp;

/// Storage-side representation of a field value.
pub type StoredValue = rusqlite::types::Value;

pub type PropertyResult<T> = Result<T, PropertyError>;

#[derive(Debug)]
pub enum PropertyError {
    UnknownField {
        record_type: String,
        field: String,
    },
    /// The key field is assigned by storage only.
    KeyAssignment {
        record_type: String,
        field: String,
    },
    KindMismatch {
        property: &'static str,
        expected: ValueKind,
        actual: ValueKind,
    },
    InvalidStoredValue {
        property: &'static str,
        message: String,
    },
    /// Pattern source text that does not compile.
    InvalidPattern {
        source_text: String,
        error: regex::Error,
    },
}

impl Display for PropertyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownField { record_type, field } => {
                write!(f, "unknown field `{field}` on `{record_type}`")
            }
            Self::KeyAssignment { record_type, field } => {
                write!(f, "key field `{record_type}.{field}` is assigned by storage")
            }
            Self::KindMismatch {
                property,
                expected,
                actual,
            } => write!(f, "{property} property expects {expected} value, got {actual}"),
            Self::InvalidStoredValue { property, message } => {
                write!(f, "invalid stored value for {property} property: {message}")
            }
            Self::InvalidPattern { source_text, error } => {
                write!(f, "invalid pattern source `{source_text}`: {error}")
            }
        }
    }
}

impl Error for PropertyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidPattern { error, .. } => Some(error),
            Self::UnknownField { .. }
            | Self::KeyAssignment { .. }
            | Self::KindMismatch { .. }
            | Self::InvalidStoredValue { .. } => None,
        }
    }
}

/// Field type contract: storage <-> native conversion plus column metadata.
pub trait PropertyType: Send + Sync {
    /// Short name used in diagnostics.
    fn type_name(&self) -> &'static str;

    /// Native kind accepted by `dump` and produced by `load`.
    fn kind(&self) -> ValueKind;

    /// Column definition used by schema auto-migration.
    fn column_definition(&self) -> &'static str;

    /// Converts a stored value into its native form.
    fn load(&self, stored: Option<&StoredValue>) -> PropertyResult<Option<Value>>;

    /// Converts a native value into its stored form.
    fn dump(&self, native: Option<&Value>) -> PropertyResult<Option<StoredValue>>;

    /// Value assigned to new records.
    fn default_value(&self) -> Option<Value> {
        None
    }

    /// Whether this property is the record key.
    fn is_key(&self) -> bool {
        false
    }

    /// Soft-delete marker behavior, for paranoid-capable types.
    fn paranoid(&self) -> Option<&dyn ParanoidMarker> {
        None
    }
}

/// Drops SQL `NULL` so every type shares the nil passthrough rule.
pub(crate) fn present(stored: Option<&StoredValue>) -> Option<&StoredValue> {
    match stored {
        None | Some(StoredValue::Null) => None,
        Some(value) => Some(value),
    }
}

pub(crate) fn kind_mismatch(property: &'static str, expected: ValueKind, actual: &Value) -> PropertyError {
    PropertyError::KindMismatch {
        property,
        expected,
        actual: actual.kind(),
    }
}

pub(crate) fn invalid_stored(property: &'static str, stored: &StoredValue) -> PropertyError {
    PropertyError::InvalidStoredValue {
        property,
        message: format!("unexpected {:?} storage value", stored.data_type()),
    }
}
