//! Record use-case service.
//!
//! # Responsibility
//! - Provide stable create/save/remove/query entry points for core callers.
//! - Expose the soft-delete scoping controls (`with_all`,
//!   `all_with_deleted`).
//!
//! # Invariants
//! - Service APIs never bypass repository persistence contracts.
//! - Removal semantics live in `paranoid`; the service only delegates.

use crate::model::record::{Record, RecordKey};
use crate::model::record_type::RecordType;
use crate::paranoid;
use crate::repo::collection::RecordCollection;
use crate::repo::record_repo::{RecordQuery, RecordRepository, RepoResult};
use crate::scope;
use std::sync::Arc;

/// Use-case service wrapper for record persistence.
pub struct RecordService<R: RecordRepository> {
    repo: R,
}

impl<R: RecordRepository> RecordService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Builds a record with defaults applied and stores it.
    pub fn create(&self, record_type: &Arc<RecordType>) -> RepoResult<Record> {
        let mut record = Record::new(record_type);
        self.repo.create(&mut record)?;
        Ok(record)
    }

    /// Inserts new records; writes every non-key field of persisted ones.
    ///
    /// Returns `Ok(false)` when the record's row no longer exists.
    pub fn save(&self, record: &mut Record) -> RepoResult<bool> {
        if record.is_new() {
            self.repo.create(record)?;
            return Ok(true);
        }

        let record_type = Arc::clone(record.record_type());
        let changes: Vec<_> = record_type
            .properties()
            .iter()
            .filter(|def| !def.property().is_key())
            .map(|def| (def.name().to_string(), record.get(def.name()).cloned()))
            .collect();
        self.repo.persist_update(record, &changes)
    }

    /// Destroy-style removal: hooks run, paranoid markers are set, the row
    /// stays. See `paranoid::soft_remove`.
    pub fn soft_remove(&self, record: &mut Record) -> RepoResult<bool> {
        paranoid::soft_remove(&self.repo, record)
    }

    /// Delete-style removal: the row is deleted, no hooks run. See
    /// `paranoid::hard_remove`.
    pub fn hard_remove(&self, record: &mut Record) -> RepoResult<bool> {
        paranoid::hard_remove(&self.repo, record)
    }

    /// Gets one record by key under the current scope.
    pub fn get(&self, record_type: &Arc<RecordType>, key: RecordKey) -> RepoResult<Option<Record>> {
        self.repo.get(record_type, key, false)
    }

    /// Lists records under the current scope.
    pub fn all(&self, record_type: &Arc<RecordType>) -> RepoResult<Vec<Record>> {
        self.repo.list(record_type, &RecordQuery::default())
    }

    /// Counts records under the current scope.
    pub fn count(&self, record_type: &Arc<RecordType>) -> RepoResult<u64> {
        self.repo.count(record_type, &RecordQuery::default())
    }

    /// Runs `body` with soft-deleted records of `record_type` visible.
    ///
    /// The default scope is restored when `body` returns, fails or panics.
    pub fn with_all<T>(&self, record_type: &RecordType, body: impl FnOnce(&Self) -> T) -> T {
        scope::with_all(record_type, || body(self))
    }

    /// Collection of every record of `record_type`, soft-deleted included,
    /// read lazily under a relaxed scope.
    pub fn all_with_deleted(&self, record_type: &Arc<RecordType>) -> RecordCollection<'_, R> {
        RecordCollection::new(&self.repo, Arc::clone(record_type))
    }
}
