//! Soft-delete ("paranoid") properties and removal operations.
//!
//! # Responsibility
//! - Provide paranoid-capable property types (`ParanoidBoolean`,
//!   `ParanoidTimestamp`).
//! - Copy the paranoid registry into derived record types.
//! - Implement the two removal paths: `soft_remove` (hooks + marker update)
//!   and `hard_remove` (row delete, no hooks).
//!
//! # Invariants
//! - Unpersisted records are never touched: no hook, no write, no marker change.
//! - `soft_remove` runs `before_destroy` hooks before any write; a hook
//!   failure aborts the write.
//! - `soft_remove` updates every registered marker in one statement.
//! - `hard_remove` never runs hooks and never edits in-memory markers.

use crate::model::now_epoch_ms;
use crate::model::record::Record;
use crate::model::record_type::{RecordType, RecordTypeBuilder};
use crate::model::value::{Value, ValueKind};
use crate::property::primitive::{dump_boolean, dump_timestamp, load_boolean, load_timestamp};
use crate::property::{PropertyResult, PropertyType, StoredValue};
use crate::repo::record_repo::{RecordRepository, RepoResult};
use crate::scope::Predicate;
use log::{debug, info, warn};
use std::sync::Arc;

/// Soft-delete behavior of a paranoid-capable property.
pub trait ParanoidMarker {
    /// Value written by `soft_remove`.
    fn deleted_value(&self, now_epoch_ms: i64) -> Value;

    /// Predicate satisfied by records that are still visible.
    fn visible_predicate(&self) -> Predicate;
}

/// Boolean marker: `false` is visible, `true` is soft-deleted.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParanoidBoolean;

/// Timestamp marker: absent is visible, set to deletion time otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParanoidTimestamp;

impl PropertyType for ParanoidBoolean {
    fn type_name(&self) -> &'static str {
        "paranoid_boolean"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Boolean
    }

    fn column_definition(&self) -> &'static str {
        "INTEGER NOT NULL DEFAULT 0"
    }

    fn load(&self, stored: Option<&StoredValue>) -> PropertyResult<Option<Value>> {
        load_boolean(self.type_name(), stored)
    }

    fn dump(&self, native: Option<&Value>) -> PropertyResult<Option<StoredValue>> {
        dump_boolean(self.type_name(), native)
    }

    fn default_value(&self) -> Option<Value> {
        Some(Value::Boolean(false))
    }

    fn paranoid(&self) -> Option<&dyn ParanoidMarker> {
        Some(self)
    }
}

impl ParanoidMarker for ParanoidBoolean {
    fn deleted_value(&self, _now_epoch_ms: i64) -> Value {
        Value::Boolean(true)
    }

    fn visible_predicate(&self) -> Predicate {
        Predicate::Equals(Value::Boolean(false))
    }
}

impl PropertyType for ParanoidTimestamp {
    fn type_name(&self) -> &'static str {
        "paranoid_timestamp"
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

    fn paranoid(&self) -> Option<&dyn ParanoidMarker> {
        Some(self)
    }
}

impl ParanoidMarker for ParanoidTimestamp {
    fn deleted_value(&self, now_epoch_ms: i64) -> Value {
        Value::Timestamp(now_epoch_ms)
    }

    fn visible_predicate(&self) -> Predicate {
        Predicate::IsNull
    }
}

/// Derivation hook: seeds `child` with a copy of `parent`'s registry.
///
/// Later declarations on either side stay local to that side.
pub fn inherited(parent: &RecordType, child: &mut RecordTypeBuilder) {
    child
        .paranoid_fields
        .extend(parent.paranoid_fields().map(str::to_string));
}

/// Destroys `record`, soft-deleting it when its type has paranoid fields.
///
/// Returns `Ok(true)` without side effects for records that were never
/// persisted. For persisted records, runs `before_destroy` hooks, then sets
/// every paranoid marker in a single update; the row stays in storage.
/// Types without paranoid fields fall back to a physical delete after the
/// hooks ran.
///
/// # Errors
/// - `RepoError::Hook` when a hook aborts; nothing is written.
/// - Persistence errors from the repository.
pub fn soft_remove<R>(repo: &R, record: &mut Record) -> RepoResult<bool>
where
    R: RecordRepository + ?Sized,
{
    let record_type = Arc::clone(record.record_type());
    if !repo.is_persisted(record) {
        debug!(
            "event=soft_remove module=paranoid status=skip reason=not_persisted type={}",
            record_type.name()
        );
        return Ok(true);
    }

    if let Err(err) = record_type.run_before_destroy(record) {
        warn!(
            "event=soft_remove module=paranoid status=error error_code=hook_aborted type={} key={:?} error={}",
            record_type.name(),
            record.key(),
            err
        );
        return Err(err.into());
    }

    if !record_type.is_paranoid() {
        let deleted = repo.persist_delete(record)?;
        info!(
            "event=soft_remove module=paranoid status=ok mode=delete type={} key={:?} deleted={}",
            record_type.name(),
            record.key(),
            deleted
        );
        return Ok(deleted);
    }

    let now = now_epoch_ms();
    let changes: Vec<(String, Option<Value>)> = record_type
        .paranoid_fields()
        .filter_map(|name| {
            record_type
                .paranoid_marker(name)
                .map(|marker| (name.to_string(), Some(marker.deleted_value(now))))
        })
        .collect();

    let updated = repo.persist_update(record, &changes)?;
    info!(
        "event=soft_remove module=paranoid status=ok mode=mark type={} key={:?} fields={} updated={}",
        record_type.name(),
        record.key(),
        changes.len(),
        updated
    );
    Ok(updated)
}

/// Physically deletes `record`'s row without running hooks.
///
/// Returns `Ok(true)` without side effects for records that were never
/// persisted. In-memory field values, including markers, are left as they
/// were.
pub fn hard_remove<R>(repo: &R, record: &mut Record) -> RepoResult<bool>
where
    R: RecordRepository + ?Sized,
{
    if !repo.is_persisted(record) {
        debug!(
            "event=hard_remove module=paranoid status=skip reason=not_persisted type={}",
            record.record_type().name()
        );
        return Ok(true);
    }

    let deleted = repo.persist_delete(record)?;
    info!(
        "event=hard_remove module=paranoid status=ok type={} key={:?} deleted={}",
        record.record_type().name(),
        record.key(),
        deleted
    );
    Ok(deleted)
}
