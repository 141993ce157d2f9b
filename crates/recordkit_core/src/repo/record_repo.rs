//! Record repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/update/delete/query APIs over per-type tables.
//! - Apply each record type's default scope to reads, honoring ambient
//!   relaxation from `scope::with_all`.
//!
//! # Invariants
//! - Writes go through `PropertyType::dump`; reads through `load`.
//! - "No row matched" is `Ok(false)`, driver failures are `Err`.
//! - In-memory records only change after the matching write succeeded.

use crate::db::{auto_migrate, quote_identifier, DbError};
use crate::model::now_epoch_ms;
use crate::model::record::{Record, RecordKey};
use crate::model::record_type::{HookError, RecordType, CREATED_AT, UPDATED_AT};
use crate::model::value::Value;
use crate::property::{PropertyError, StoredValue};
use crate::scope::{self, Predicate, ScopeCondition};
use log::debug;
use rusqlite::{params_from_iter, Connection, Row};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for record persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    Property(PropertyError),
    Hook(HookError),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Property(err) => write!(f, "{err}"),
            Self::Hook(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid record data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Property(err) => Some(err),
            Self::Hook(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<PropertyError> for RepoError {
    fn from(value: PropertyError) -> Self {
        Self::Property(value)
    }
}

impl From<HookError> for RepoError {
    fn from(value: HookError) -> Self {
        Self::Hook(value)
    }
}

/// Query options for listing records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordQuery {
    /// Skip the default scope, returning soft-deleted records too.
    pub include_deleted: bool,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Persistence engine seam used by the removal operations and services.
pub trait RecordRepository {
    /// Inserts a new record and assigns its key.
    fn create(&self, record: &mut Record) -> RepoResult<RecordKey>;
    /// Writes `changes` to the record's row. `Ok(false)` when no row matched.
    fn persist_update(
        &self,
        record: &mut Record,
        changes: &[(String, Option<Value>)],
    ) -> RepoResult<bool>;
    /// Deletes the record's row. `Ok(false)` when no row matched.
    fn persist_delete(&self, record: &mut Record) -> RepoResult<bool>;
    fn get(
        &self,
        record_type: &Arc<RecordType>,
        key: RecordKey,
        include_deleted: bool,
    ) -> RepoResult<Option<Record>>;
    fn list(&self, record_type: &Arc<RecordType>, query: &RecordQuery) -> RepoResult<Vec<Record>>;
    fn count(&self, record_type: &Arc<RecordType>, query: &RecordQuery) -> RepoResult<u64>;

    /// Whether the record currently has a stored row identity.
    fn is_persisted(&self, record: &Record) -> bool {
        record.key().is_some() && !record.is_removed()
    }
}

/// SQLite-backed record repository.
pub struct SqliteRecordRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRecordRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Constructs a repository and migrates the tables of `record_types`.
    pub fn try_new(
        conn: &'conn Connection,
        record_types: &[&Arc<RecordType>],
    ) -> RepoResult<Self> {
        let repo = Self::new(conn);
        for record_type in record_types {
            repo.register(record_type)?;
        }
        Ok(repo)
    }

    /// Creates or upgrades the table backing `record_type`.
    pub fn register(&self, record_type: &RecordType) -> RepoResult<()> {
        auto_migrate(self.conn, record_type)?;
        Ok(())
    }

    fn select_sql(record_type: &RecordType) -> String {
        let columns: Vec<String> = record_type
            .properties()
            .iter()
            .map(|def| quote_identifier(def.name()))
            .collect();
        format!(
            "SELECT {} FROM {}",
            columns.join(", "),
            quote_identifier(record_type.storage_name())
        )
    }
}

impl RecordRepository for SqliteRecordRepository<'_> {
    fn create(&self, record: &mut Record) -> RepoResult<RecordKey> {
        if record.key().is_some() {
            return Err(RepoError::InvalidData(format!(
                "{} record is already persisted",
                record.record_type().name()
            )));
        }

        let record_type = Arc::clone(record.record_type());
        let now = record_type.has_timestamps().then(now_epoch_ms);

        let mut written: Vec<(String, Option<Value>)> = Vec::new();
        let mut columns = Vec::new();
        let mut binds: Vec<StoredValue> = Vec::new();
        for def in record_type.properties() {
            if def.property().is_key() {
                continue;
            }
            let value = match now {
                Some(now) if def.name() == CREATED_AT || def.name() == UPDATED_AT => {
                    let stamp = Some(Value::Timestamp(now));
                    written.push((def.name().to_string(), stamp.clone()));
                    stamp
                }
                _ => record.get(def.name()).cloned(),
            };
            columns.push(quote_identifier(def.name()));
            binds.push(def.property().dump(value.as_ref())?.unwrap_or(StoredValue::Null));
        }

        let table = quote_identifier(record_type.storage_name());
        let sql = if columns.is_empty() {
            format!("INSERT INTO {table} DEFAULT VALUES;")
        } else {
            let placeholders = vec!["?"; columns.len()].join(", ");
            format!(
                "INSERT INTO {table} ({}) VALUES ({placeholders});",
                columns.join(", ")
            )
        };

        self.conn.execute(&sql, params_from_iter(binds))?;
        let key = self.conn.last_insert_rowid();

        for (name, value) in written {
            record.write_value(&name, value);
        }
        record.assign_key(key);

        debug!(
            "event=record_create module=repo status=ok type={} key={}",
            record_type.name(),
            key
        );
        Ok(key)
    }

    fn persist_update(
        &self,
        record: &mut Record,
        changes: &[(String, Option<Value>)],
    ) -> RepoResult<bool> {
        let key = match record.key() {
            Some(key) if !record.is_removed() => key,
            _ => return Ok(false),
        };
        let record_type = Arc::clone(record.record_type());

        let mut assignments: Vec<(String, Option<Value>)> = changes.to_vec();
        if record_type.has_timestamps() && !assignments.iter().any(|(name, _)| name == UPDATED_AT) {
            assignments.push((UPDATED_AT.to_string(), Some(Value::Timestamp(now_epoch_ms()))));
        }

        let mut set_clauses = Vec::with_capacity(assignments.len());
        let mut binds: Vec<StoredValue> = Vec::with_capacity(assignments.len() + 1);
        for (name, value) in &assignments {
            let def = record_type
                .property(name)
                .filter(|def| !def.property().is_key())
                .ok_or_else(|| PropertyError::UnknownField {
                    record_type: record_type.name().to_string(),
                    field: name.clone(),
                })?;
            set_clauses.push(format!("{} = ?", quote_identifier(def.name())));
            binds.push(def.property().dump(value.as_ref())?.unwrap_or(StoredValue::Null));
        }

        if set_clauses.is_empty() {
            return Ok(true);
        }

        binds.push(StoredValue::Integer(key));
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?;",
            quote_identifier(record_type.storage_name()),
            set_clauses.join(", "),
            quote_identifier(record_type.key_name())
        );

        let changed = self.conn.execute(&sql, params_from_iter(binds))?;
        if changed == 0 {
            return Ok(false);
        }

        for (name, value) in assignments {
            record.write_value(&name, value);
        }
        Ok(true)
    }

    fn persist_delete(&self, record: &mut Record) -> RepoResult<bool> {
        let key = match record.key() {
            Some(key) if !record.is_removed() => key,
            _ => return Ok(false),
        };
        let record_type = record.record_type();

        let changed = self.conn.execute(
            &format!(
                "DELETE FROM {} WHERE {} = ?1;",
                quote_identifier(record_type.storage_name()),
                quote_identifier(record_type.key_name())
            ),
            [key],
        )?;

        if changed == 0 {
            return Ok(false);
        }

        record.mark_removed();
        Ok(true)
    }

    fn get(
        &self,
        record_type: &Arc<RecordType>,
        key: RecordKey,
        include_deleted: bool,
    ) -> RepoResult<Option<Record>> {
        let mut binds = vec![StoredValue::Integer(key)];
        let mut sql = format!(
            "{} WHERE {} = ?",
            Self::select_sql(record_type),
            quote_identifier(record_type.key_name())
        );
        push_scope(
            &mut sql,
            &mut binds,
            record_type,
            &scope::effective_conditions(record_type, include_deleted),
        )?;

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_record_row(record_type, row)?));
        }

        Ok(None)
    }

    fn list(&self, record_type: &Arc<RecordType>, query: &RecordQuery) -> RepoResult<Vec<Record>> {
        let mut sql = format!("{} WHERE 1 = 1", Self::select_sql(record_type));
        let mut binds: Vec<StoredValue> = Vec::new();
        push_scope(
            &mut sql,
            &mut binds,
            record_type,
            &scope::effective_conditions(record_type, query.include_deleted),
        )?;

        sql.push_str(&format!(
            " ORDER BY {} ASC",
            quote_identifier(record_type.key_name())
        ));

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            binds.push(StoredValue::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                binds.push(StoredValue::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            binds.push(StoredValue::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut records = Vec::new();

        while let Some(row) = rows.next()? {
            records.push(parse_record_row(record_type, row)?);
        }

        Ok(records)
    }

    fn count(&self, record_type: &Arc<RecordType>, query: &RecordQuery) -> RepoResult<u64> {
        let mut sql = format!(
            "SELECT COUNT(*) FROM {} WHERE 1 = 1",
            quote_identifier(record_type.storage_name())
        );
        let mut binds: Vec<StoredValue> = Vec::new();
        push_scope(
            &mut sql,
            &mut binds,
            record_type,
            &scope::effective_conditions(record_type, query.include_deleted),
        )?;

        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(binds), |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count {count}")))
    }
}

fn push_scope(
    sql: &mut String,
    binds: &mut Vec<StoredValue>,
    record_type: &RecordType,
    conditions: &[ScopeCondition],
) -> RepoResult<()> {
    for condition in conditions {
        let column = quote_identifier(&condition.field);
        match &condition.predicate {
            Predicate::IsNull => sql.push_str(&format!(" AND {column} IS NULL")),
            Predicate::Equals(value) => {
                let def = record_type.property(&condition.field).ok_or_else(|| {
                    PropertyError::UnknownField {
                        record_type: record_type.name().to_string(),
                        field: condition.field.clone(),
                    }
                })?;
                let stored = def
                    .property()
                    .dump(Some(value))?
                    .unwrap_or(StoredValue::Null);
                sql.push_str(&format!(" AND {column} = ?"));
                binds.push(stored);
            }
        }
    }
    Ok(())
}

fn parse_record_row(record_type: &Arc<RecordType>, row: &Row<'_>) -> RepoResult<Record> {
    let mut values = BTreeMap::new();
    let mut key = None;

    for (index, def) in record_type.properties().iter().enumerate() {
        let stored: StoredValue = row.get(index)?;
        let value = def.property().load(Some(&stored))?;
        if def.property().is_key() {
            key = value.as_ref().and_then(Value::as_i64);
            continue;
        }
        if let Some(value) = value {
            values.insert(def.name().to_string(), value);
        }
    }

    let key = key.ok_or_else(|| {
        RepoError::InvalidData(format!(
            "missing key `{}` in {}",
            record_type.key_name(),
            record_type.storage_name()
        ))
    })?;
    Ok(Record::from_storage(record_type, key, values))
}
