//! Lazily loaded record collections bound to a relaxed scope.

use crate::model::record::{Record, RecordKey};
use crate::model::record_type::RecordType;
use crate::repo::record_repo::{RecordQuery, RecordRepository, RepoResult};
use crate::scope;
use once_cell::unsync::OnceCell;
use std::sync::Arc;

/// Records of one type, soft-deleted ones included.
///
/// Nothing is read until the first member access. That read runs inside
/// `scope::with_all` for the collection's type, whatever scope the caller is
/// in at that moment, and its result is cached.
pub struct RecordCollection<'repo, R: RecordRepository + ?Sized> {
    repo: &'repo R,
    record_type: Arc<RecordType>,
    query: RecordQuery,
    loaded: OnceCell<Vec<Record>>,
}

impl<'repo, R: RecordRepository + ?Sized> RecordCollection<'repo, R> {
    pub fn new(repo: &'repo R, record_type: Arc<RecordType>) -> Self {
        Self {
            repo,
            record_type,
            query: RecordQuery::default(),
            loaded: OnceCell::new(),
        }
    }

    /// Restricts the page read on first access.
    pub fn paged(mut self, limit: Option<u32>, offset: u32) -> Self {
        self.query.limit = limit;
        self.query.offset = offset;
        self.loaded = OnceCell::new();
        self
    }

    pub fn record_type(&self) -> &Arc<RecordType> {
        &self.record_type
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.get().is_some()
    }

    pub fn records(&self) -> RepoResult<&[Record]> {
        self.loaded
            .get_or_try_init(|| load(self.repo, &self.record_type, &self.query))
            .map(Vec::as_slice)
    }

    pub fn len(&self) -> RepoResult<usize> {
        self.records().map(<[Record]>::len)
    }

    pub fn is_empty(&self) -> RepoResult<bool> {
        self.records().map(<[Record]>::is_empty)
    }

    pub fn keys(&self) -> RepoResult<Vec<RecordKey>> {
        Ok(self.records()?.iter().filter_map(Record::key).collect())
    }

    pub fn iter(&self) -> RepoResult<std::slice::Iter<'_, Record>> {
        self.records().map(<[Record]>::iter)
    }

    /// Drops cached rows so the next access reads again.
    pub fn reload(&mut self) {
        self.loaded = OnceCell::new();
    }

    pub fn into_records(self) -> RepoResult<Vec<Record>> {
        let Self {
            repo,
            record_type,
            query,
            loaded,
        } = self;
        match loaded.into_inner() {
            Some(records) => Ok(records),
            None => load(repo, &record_type, &query),
        }
    }
}

fn load<R: RecordRepository + ?Sized>(
    repo: &R,
    record_type: &Arc<RecordType>,
    query: &RecordQuery,
) -> RepoResult<Vec<Record>> {
    scope::with_all(record_type, || repo.list(record_type, query))
}
