//! Record type descriptors.
//!
//! # Responsibility
//! - Describe the shape of a record: storage name, ordered properties, key.
//! - Own the paranoid-field registry and `before_destroy` hooks of a type.
//! - Derive subtypes that start from a snapshot of the parent.
//!
//! # Invariants
//! - Exactly one key (`Serial`) property per type.
//! - Every registered paranoid field names a paranoid-capable property.
//! - Built descriptors are shared read-only (`Arc<RecordType>`).

use crate::db::is_valid_identifier;
use crate::model::record::Record;
use crate::paranoid::{self, ParanoidMarker};
use crate::property::primitive::Timestamp;
use crate::property::PropertyType;
use crate::scope::ScopeCondition;
use log::debug;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";

static NEXT_TYPE_ID: AtomicU64 = AtomicU64::new(1);

pub type HookResult = Result<(), HookError>;

/// Callback run before a persisted record is destroyed.
pub type BeforeDestroyHook = Arc<dyn Fn(&Record) -> HookResult + Send + Sync>;

/// Abort signal raised by a lifecycle hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookError {
    message: String,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

impl Display for HookError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "before_destroy hook aborted: {}", self.message)
    }
}

impl Error for HookError {}

/// Record type definition failures reported by `RecordTypeBuilder::build`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    InvalidIdentifier(String),
    DuplicateProperty { record_type: String, property: String },
    MissingKey(String),
    MultipleKeys { record_type: String, keys: Vec<String> },
    NotParanoid { record_type: String, property: String },
}

impl Display for DefinitionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidIdentifier(name) => write!(f, "invalid identifier `{name}`"),
            Self::DuplicateProperty {
                record_type,
                property,
            } => write!(f, "property `{property}` declared twice on `{record_type}`"),
            Self::MissingKey(record_type) => {
                write!(f, "record type `{record_type}` has no key property")
            }
            Self::MultipleKeys { record_type, keys } => write!(
                f,
                "record type `{record_type}` declares several keys: {}",
                keys.join(", ")
            ),
            Self::NotParanoid {
                record_type,
                property,
            } => write!(
                f,
                "`{record_type}.{property}` cannot be a paranoid field: not a paranoid property"
            ),
        }
    }
}

impl Error for DefinitionError {}

/// One named property of a record type.
#[derive(Clone)]
pub struct PropertyDef {
    name: String,
    property: Arc<dyn PropertyType>,
}

impl PropertyDef {
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn property(&self) -> &dyn PropertyType {
        self.property.as_ref()
    }
}

impl Debug for PropertyDef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyDef")
            .field("name", &self.name)
            .field("type", &self.property.type_name())
            .finish()
    }
}

/// Immutable record type descriptor.
pub struct RecordType {
    id: u64,
    name: String,
    storage_name: String,
    parent: Option<String>,
    properties: Vec<PropertyDef>,
    key: String,
    timestamps: bool,
    paranoid_fields: BTreeSet<String>,
    before_destroy: Vec<BeforeDestroyHook>,
}

impl RecordType {
    /// Starts a subtype definition seeded from `parent`.
    ///
    /// The subtype receives copies of the parent's properties, storage name,
    /// timestamps flag and hooks, and a snapshot of its paranoid registry.
    pub fn derive(parent: &Arc<RecordType>, name: impl Into<String>) -> RecordTypeBuilder {
        let mut builder = RecordTypeBuilder::new(name);
        builder.storage_name = Some(parent.storage_name.clone());
        builder.parent = Some(parent.name.clone());
        builder.properties = parent.properties.clone();
        builder.timestamps = parent.timestamps;
        builder.before_destroy = parent.before_destroy.clone();
        paranoid::inherited(parent, &mut builder);

        debug!(
            "event=record_type_derive module=model status=ok parent={} child={}",
            parent.name, builder.name
        );
        builder
    }

    /// Process-unique identity of this descriptor. Types sharing a name or
    /// a table still differ here.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Table backing this type. Shared with the parent when derived.
    pub fn storage_name(&self) -> &str {
        self.storage_name.as_str()
    }

    pub fn parent_name(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn properties(&self) -> &[PropertyDef] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|def| def.name == name)
    }

    pub fn key_name(&self) -> &str {
        self.key.as_str()
    }

    pub fn has_timestamps(&self) -> bool {
        self.timestamps
    }

    /// Names registered as soft-delete markers, in name order.
    pub fn paranoid_fields(&self) -> impl Iterator<Item = &str> {
        self.paranoid_fields.iter().map(String::as_str)
    }

    pub fn is_paranoid_field(&self, name: &str) -> bool {
        self.paranoid_fields.contains(name)
    }

    pub fn is_paranoid(&self) -> bool {
        !self.paranoid_fields.is_empty()
    }

    pub fn paranoid_marker(&self, name: &str) -> Option<&dyn ParanoidMarker> {
        if !self.is_paranoid_field(name) {
            return None;
        }
        self.property(name).and_then(|def| def.property().paranoid())
    }

    /// Predicates every default query against this type must satisfy.
    pub fn default_scope(&self) -> Vec<ScopeCondition> {
        self.paranoid_fields()
            .filter_map(|name| {
                self.paranoid_marker(name)
                    .map(|marker| ScopeCondition::new(name, marker.visible_predicate()))
            })
            .collect()
    }

    pub fn before_destroy_hook_count(&self) -> usize {
        self.before_destroy.len()
    }

    /// Runs `before_destroy` hooks in declaration order, stopping at the
    /// first failure.
    pub fn run_before_destroy(&self, record: &Record) -> HookResult {
        for hook in &self.before_destroy {
            hook(record)?;
        }
        Ok(())
    }
}

impl Debug for RecordType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordType")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("storage_name", &self.storage_name)
            .field("parent", &self.parent)
            .field("properties", &self.properties)
            .field("key", &self.key)
            .field("timestamps", &self.timestamps)
            .field("paranoid_fields", &self.paranoid_fields)
            .field("before_destroy", &self.before_destroy.len())
            .finish()
    }
}

/// Builder collecting a record type definition.
pub struct RecordTypeBuilder {
    name: String,
    storage_name: Option<String>,
    parent: Option<String>,
    properties: Vec<PropertyDef>,
    timestamps: bool,
    pub(crate) paranoid_fields: BTreeSet<String>,
    before_destroy: Vec<BeforeDestroyHook>,
}

impl RecordTypeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            storage_name: None,
            parent: None,
            properties: Vec::new(),
            timestamps: false,
            paranoid_fields: BTreeSet::new(),
            before_destroy: Vec::new(),
        }
    }

    /// Overrides the default storage name (snake-cased, pluralized type name).
    pub fn storage_name(mut self, storage_name: impl Into<String>) -> Self {
        self.storage_name = Some(storage_name.into());
        self
    }

    /// Adds a property. Paranoid-capable properties are registered as
    /// soft-delete markers.
    pub fn property(mut self, name: impl Into<String>, property: impl PropertyType + 'static) -> Self {
        let name = name.into();
        let paranoid = property.paranoid().is_some();
        self.properties.push(PropertyDef {
            name: name.clone(),
            property: Arc::new(property),
        });
        if paranoid {
            self = self.declare_paranoid(name);
        }
        self
    }

    /// Registers `name` as a soft-delete marker on this type.
    pub fn declare_paranoid(mut self, name: impl Into<String>) -> Self {
        self.paranoid_fields.insert(name.into());
        self
    }

    /// Adds `created_at`/`updated_at` timestamp properties.
    pub fn timestamps(mut self) -> Self {
        self.timestamps = true;
        self
    }

    pub fn before_destroy<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Record) -> HookResult + Send + Sync + 'static,
    {
        self.before_destroy.push(Arc::new(hook));
        self
    }

    pub fn build(mut self) -> Result<Arc<RecordType>, DefinitionError> {
        if self.timestamps {
            for column in [CREATED_AT, UPDATED_AT] {
                if !self.properties.iter().any(|def| def.name == column) {
                    self.properties.push(PropertyDef {
                        name: column.to_string(),
                        property: Arc::new(Timestamp),
                    });
                }
            }
        }

        let storage_name = self
            .storage_name
            .take()
            .unwrap_or_else(|| default_storage_name(&self.name));
        if !is_valid_identifier(&storage_name) {
            return Err(DefinitionError::InvalidIdentifier(storage_name));
        }

        let mut seen = BTreeSet::new();
        for def in &self.properties {
            if !is_valid_identifier(&def.name) {
                return Err(DefinitionError::InvalidIdentifier(def.name.clone()));
            }
            if !seen.insert(def.name.as_str()) {
                return Err(DefinitionError::DuplicateProperty {
                    record_type: self.name.clone(),
                    property: def.name.clone(),
                });
            }
        }

        let keys: Vec<String> = self
            .properties
            .iter()
            .filter(|def| def.property.is_key())
            .map(|def| def.name.clone())
            .collect();
        if keys.is_empty() {
            return Err(DefinitionError::MissingKey(self.name));
        }
        if keys.len() > 1 {
            return Err(DefinitionError::MultipleKeys {
                record_type: self.name,
                keys,
            });
        }
        let key = keys[0].clone();

        for field in &self.paranoid_fields {
            let capable = self
                .properties
                .iter()
                .any(|def| &def.name == field && def.property.paranoid().is_some());
            if !capable {
                return Err(DefinitionError::NotParanoid {
                    record_type: self.name.clone(),
                    property: field.clone(),
                });
            }
        }

        debug!(
            "event=record_type_define module=model status=ok type={} storage={} paranoid_fields={}",
            self.name,
            storage_name,
            self.paranoid_fields.len()
        );

        Ok(Arc::new(RecordType {
            id: NEXT_TYPE_ID.fetch_add(1, Ordering::Relaxed),
            name: self.name,
            storage_name,
            parent: self.parent,
            properties: self.properties,
            key,
            timestamps: self.timestamps,
            paranoid_fields: self.paranoid_fields,
            before_destroy: self.before_destroy,
        }))
    }
}

fn default_storage_name(type_name: &str) -> String {
    let mut snake = String::with_capacity(type_name.len() + 1);
    for (index, ch) in type_name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if index > 0 {
                snake.push('_');
            }
            snake.push(ch.to_ascii_lowercase());
        } else {
            snake.push(ch);
        }
    }
    snake.push('s');
    snake
}

#[cfg(test)]
mod tests {
    use super::{default_storage_name, DefinitionError, RecordTypeBuilder};
    use crate::paranoid::ParanoidBoolean;
    use crate::property::primitive::{Boolean, Serial, Text};

    #[test]
    fn default_storage_name_is_snake_case_plural() {
        assert_eq!(default_storage_name("Article"), "articles");
        assert_eq!(default_storage_name("BlogPost"), "blog_posts");
    }

    #[test]
    fn build_requires_a_key() {
        let err = RecordTypeBuilder::new("Note")
            .property("body", Text)
            .build()
            .unwrap_err();
        assert_eq!(err, DefinitionError::MissingKey("Note".to_string()));
    }

    #[test]
    fn build_rejects_duplicate_properties() {
        let err = RecordTypeBuilder::new("Note")
            .property("id", Serial)
            .property("body", Text)
            .property("body", Text)
            .build()
            .unwrap_err();
        assert!(matches!(err, DefinitionError::DuplicateProperty { property, .. } if property == "body"));
    }

    #[test]
    fn declaring_plain_boolean_as_paranoid_is_rejected() {
        let err = RecordTypeBuilder::new("Note")
            .property("id", Serial)
            .property("hidden", Boolean)
            .declare_paranoid("hidden")
            .build()
            .unwrap_err();
        assert!(matches!(err, DefinitionError::NotParanoid { property, .. } if property == "hidden"));
    }

    #[test]
    fn paranoid_property_registers_itself() {
        let record_type = RecordTypeBuilder::new("Note")
            .property("id", Serial)
            .property("deleted", ParanoidBoolean)
            .build()
            .unwrap();
        assert!(record_type.is_paranoid_field("deleted"));
        assert_eq!(record_type.default_scope().len(), 1);
    }

    #[test]
    fn invalid_identifiers_are_rejected() {
        let err = RecordTypeBuilder::new("Note")
            .storage_name("notes; DROP TABLE x")
            .property("id", Serial)
            .build()
            .unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidIdentifier(_)));
    }

    #[test]
    fn each_build_gets_a_distinct_id() {
        let first = RecordTypeBuilder::new("Note")
            .property("id", Serial)
            .build()
            .unwrap();
        let second = RecordTypeBuilder::new("Note")
            .property("id", Serial)
            .build()
            .unwrap();
        assert_ne!(first.id(), second.id());
    }
}
