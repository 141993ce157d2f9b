//! Query scoping for soft-deleted records.
//!
//! # Responsibility
//! - Describe default-scope predicates (`ScopeCondition`).
//! - Hold ambient, per-record-type "relaxed scope" state for `with_all`.
//!
//! # Invariants
//! - Relaxed state is thread-local; callers on other threads are unaffected.
//! - Every acquisition is paired with a release in `Drop`, so the default
//!   scope comes back after errors and panics too.
//! - Nested relaxations on the same type are counted, not overwritten.
//! - Relaxation is keyed by descriptor identity (`RecordType::id`), so
//!   distinct types never share it, even under the same name.

use crate::model::record_type::RecordType;
use crate::model::value::Value;
use log::debug;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::marker::PhantomData;

thread_local! {
    static RELAXED_SCOPES: RefCell<BTreeMap<u64, usize>> = const { RefCell::new(BTreeMap::new()) };
}

/// Predicate applied to one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Equals(Value),
    IsNull,
}

/// One conjunct of a record type's default scope.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeCondition {
    pub field: String,
    pub predicate: Predicate,
}

impl ScopeCondition {
    pub fn new(field: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            field: field.into(),
            predicate,
        }
    }
}

/// Holds the relaxed scope for one record type until dropped.
pub struct RelaxedScopeGuard {
    type_id: u64,
    type_name: String,
    // Thread-local state must be released on the thread that acquired it.
    _not_send: PhantomData<*const ()>,
}

impl RelaxedScopeGuard {
    pub fn acquire(record_type: &RecordType) -> Self {
        let type_id = record_type.id();
        let depth = RELAXED_SCOPES.with(|scopes| {
            let mut scopes = scopes.borrow_mut();
            let depth = scopes.entry(type_id).or_insert(0);
            *depth += 1;
            *depth
        });
        debug!(
            "event=scope_relax module=scope status=start type={} type_id={} depth={}",
            record_type.name(),
            type_id,
            depth
        );
        Self {
            type_id,
            type_name: record_type.name().to_string(),
            _not_send: PhantomData,
        }
    }
}

impl Drop for RelaxedScopeGuard {
    fn drop(&mut self) {
        let remaining = RELAXED_SCOPES.with(|scopes| {
            let mut scopes = scopes.borrow_mut();
            let depth = scopes.get(&self.type_id).copied().unwrap_or(0);
            if depth > 1 {
                scopes.insert(self.type_id, depth - 1);
                depth - 1
            } else {
                scopes.remove(&self.type_id);
                0
            }
        });
        debug!(
            "event=scope_relax module=scope status=end type={} type_id={} depth={}",
            self.type_name, self.type_id, remaining
        );
    }
}

/// True while a `with_all` call for `record_type` is in progress on this thread.
pub fn is_relaxed(record_type: &RecordType) -> bool {
    RELAXED_SCOPES.with(|scopes| scopes.borrow().contains_key(&record_type.id()))
}

/// Runs `body` with soft-deleted records of `record_type` visible.
pub fn with_all<T>(record_type: &RecordType, body: impl FnOnce() -> T) -> T {
    let _guard = RelaxedScopeGuard::acquire(record_type);
    body()
}

/// Conditions a query must apply, after explicit and ambient relaxation.
pub fn effective_conditions(record_type: &RecordType, include_deleted: bool) -> Vec<ScopeCondition> {
    if include_deleted || is_relaxed(record_type) {
        return Vec::new();
    }
    record_type.default_scope()
}
